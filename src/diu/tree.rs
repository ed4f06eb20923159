use std::collections::HashMap;

use crate::itemset::{Item, Itemset};

pub(crate) const ROOT: usize = 0;

/// One node of the closure tree. The root carries an empty itemset; every
/// other node represents one closed itemset of the current window.
#[derive(Debug, Clone)]
pub(crate) struct Node<T: Item> {
    pub itemset: Itemset<T>,
    /// Window transactions containing this itemset.
    pub support: usize,
    /// Window transactions equal to this itemset.
    pub count: usize,
    pub parent: usize,
    /// Child ids, kept sorted by rank order of their itemsets.
    pub children: Vec<usize>,
}

/// Arena-backed closure tree. Nodes live in slots addressed by `usize` ids;
/// removed slots go on a free list and are reused by later allocations, so
/// ids are only meaningful while their node is live.
#[derive(Debug, Clone)]
pub(crate) struct ClosureTree<T: Item> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
}

impl<T: Item> ClosureTree<T> {
    pub fn new() -> Self {
        let root = Node {
            itemset: Itemset::new(),
            support: 0,
            count: 0,
            parent: ROOT,
            children: Vec::new(),
        };
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
        }
    }

    pub fn node(&self, id: usize) -> &Node<T> {
        self.slots[id].as_ref().expect("dangling node id")
    }

    pub fn node_mut(&mut self, id: usize) -> &mut Node<T> {
        self.slots[id].as_mut().expect("dangling node id")
    }

    pub fn alloc(&mut self, itemset: Itemset<T>, support: usize, count: usize) -> usize {
        let node = Node {
            itemset,
            support,
            count,
            parent: ROOT,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Number of live nodes, the root excluded.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count() - 1
    }

    /// Id of the node representing `x`, if one exists.
    pub fn find(&self, x: &Itemset<T>) -> Option<usize> {
        self.find_in(ROOT, x)
    }

    fn find_in(&self, id: usize, x: &Itemset<T>) -> Option<usize> {
        let node = self.node(id);
        if id != ROOT && node.itemset == *x {
            return Some(id);
        }
        // Children only grow the itemset, so branches that already reached
        // the target length cannot contain it.
        if node.itemset.len() < x.len() {
            for &child in &node.children {
                if let Some(found) = self.find_in(child, x) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All nodes representing strict supersets of `x`. With `early_abort`,
    /// descent stops below the first superset found on each branch, which is
    /// enough when only the immediate supersets matter.
    pub fn find_all_supersets(&self, x: &Itemset<T>, early_abort: bool) -> Vec<usize> {
        let mut found = Vec::new();
        self.supersets_in(ROOT, x, early_abort, &mut found);
        found
    }

    fn supersets_in(&self, id: usize, x: &Itemset<T>, early_abort: bool, found: &mut Vec<usize>) {
        let node = self.node(id);
        if id != ROOT && node.itemset.len() > x.len() && node.itemset.is_superset_of(x) {
            found.push(id);
            if early_abort {
                return;
            }
        }
        for &child in &node.children {
            self.supersets_in(child, x, early_abort, found);
        }
    }

    /// The subset-minimal nodes among the strict supersets of `x`. Different
    /// branches can hold subset-comparable itemsets, so the per-branch early
    /// abort is followed by a cross-branch minimality filter.
    pub fn find_immediate_supersets(&self, x: &Itemset<T>) -> Vec<usize> {
        let mut candidates = self.find_all_supersets(x, true);
        candidates.sort_by_key(|&id| self.node(id).itemset.len());
        let mut minimal: Vec<usize> = Vec::new();
        for id in candidates {
            let itemset = &self.node(id).itemset;
            if !minimal
                .iter()
                .any(|&kept| itemset.is_superset_of(&self.node(kept).itemset))
            {
                minimal.push(id);
            }
        }
        minimal
    }

    /// Support of an itemset that is not represented by any node: the sum of
    /// the supports of its immediate supersets.
    pub fn support_if_not_contained(&self, x: &Itemset<T>) -> usize {
        self.find_immediate_supersets(x)
            .iter()
            .map(|&id| self.node(id).support)
            .sum()
    }

    /// All nodes whose itemset is a subset of `x`, `x`'s own node included.
    pub fn find_all_subsets(&self, x: &Itemset<T>) -> Vec<usize> {
        let mut found = Vec::new();
        self.subsets_in(ROOT, x, &mut found);
        found
    }

    fn subsets_in(&self, id: usize, x: &Itemset<T>, found: &mut Vec<usize>) {
        let node = self.node(id);
        if id != ROOT && x.is_superset_of(&node.itemset) {
            found.push(id);
        }
        for &child in &node.children {
            if self.node(child).itemset.len() <= x.len() {
                self.subsets_in(child, x, found);
            }
        }
    }

    /// A minimum-length node whose itemset contains `x`, if any.
    pub fn find_min_superset(&self, x: &Itemset<T>) -> Option<usize> {
        self.min_superset_in(ROOT, x)
    }

    fn min_superset_in(&self, id: usize, x: &Itemset<T>) -> Option<usize> {
        let node = self.node(id);
        if id != ROOT && node.itemset.len() >= x.len() && node.itemset.is_superset_of(x) {
            // Descendants are strictly larger, so this branch is settled.
            return Some(id);
        }
        let mut best: Option<usize> = None;
        for &child in &node.children {
            if let Some(found) = self.min_superset_in(child, x) {
                let better = match best {
                    None => true,
                    Some(b) => self.node(found).itemset.len() < self.node(b).itemset.len(),
                };
                if better {
                    best = Some(found);
                }
            }
        }
        best
    }

    /// Hook a freshly allocated node into the tree: descend to the deepest
    /// node that is both a subset of and rank-below the new itemset, adopt
    /// any of its children that the new node supersedes, and insert at the
    /// rank-sorted position.
    pub fn insert_node(&mut self, id: usize, history: &HashMap<T, usize>) {
        let itemset = self.node(id).itemset.clone();
        let parent = self.descend_to_parent(ROOT, &itemset, history);

        // Children of the chosen parent that are rank-above and supersets of
        // the new itemset belong under the new node.
        let adopted: Vec<usize> = self
            .node(parent)
            .children
            .iter()
            .copied()
            .filter(|&child_id| {
                let child = &self.node(child_id).itemset;
                child.rank_cmp(&itemset, history) == std::cmp::Ordering::Greater
                    && child.is_superset_of(&itemset)
            })
            .collect();
        for &child_id in &adopted {
            let pos = self
                .node(parent)
                .children
                .iter()
                .position(|&c| c == child_id)
                .expect("adopted child missing from parent");
            self.node_mut(parent).children.remove(pos);
            self.node_mut(id).children.push(child_id);
            self.node_mut(child_id).parent = id;
        }

        self.attach_sorted(parent, id, history);
    }

    /// Re-attach a detached subtree below `start`, descending to the best
    /// parent first. Used when a removed node's children need a new home.
    pub fn restructure(&mut self, start: usize, child: usize, history: &HashMap<T, usize>) {
        let itemset = self.node(child).itemset.clone();
        let parent = self.descend_to_parent(start, &itemset, history);
        self.attach_sorted(parent, child, history);
    }

    fn descend_to_parent(
        &self,
        start: usize,
        itemset: &Itemset<T>,
        history: &HashMap<T, usize>,
    ) -> usize {
        let mut parent = start;
        'descend: loop {
            for &child in &self.node(parent).children {
                let candidate = &self.node(child).itemset;
                if candidate.rank_cmp(itemset, history) != std::cmp::Ordering::Greater
                    && itemset.is_superset_of(candidate)
                {
                    parent = child;
                    continue 'descend;
                }
            }
            return parent;
        }
    }

    fn attach_sorted(&mut self, parent: usize, id: usize, history: &HashMap<T, usize>) {
        let itemset = self.node(id).itemset.clone();
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| {
                self.node(c).itemset.rank_cmp(&itemset, history) == std::cmp::Ordering::Greater
            })
            .unwrap_or_else(|| self.node(parent).children.len());
        self.node_mut(parent).children.insert(pos, id);
        self.node_mut(id).parent = parent;

        // every child strictly refines its parent
        debug_assert!(
            itemset.len() > self.node(parent).itemset.len()
                && itemset.is_superset_of(&self.node(parent).itemset),
            "child does not refine its parent"
        );
        // siblings stay sorted by rank order
        debug_assert!(
            self.node(parent).children.windows(2).all(|pair| {
                self.node(pair[0])
                    .itemset
                    .rank_cmp(&self.node(pair[1]).itemset, history)
                    != std::cmp::Ordering::Greater
            }),
            "sibling rank order broken"
        );
    }

    /// Drop a node, re-homing its children below its former parent.
    pub fn remove_node(&mut self, id: usize, history: &HashMap<T, usize>) {
        let parent = self.node(id).parent;
        let children = std::mem::take(&mut self.node_mut(id).children);

        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == id)
            .expect("node missing from its parent");
        self.node_mut(parent).children.remove(pos);

        for child in children {
            self.restructure(parent, child, history);
        }

        self.slots[id] = None;
        self.free.push(id);
    }
}
