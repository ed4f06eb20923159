//! Direct-update closure tree: keeps one node per closed itemset of the
//! window and repairs the set in place on every add and delete.

mod tree;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::engine::{EngineError, EngineResult, SlidingWindowMiner};
use crate::itemset::{Item, Itemset};

use tree::{ClosureTree, ROOT};

/// Closed-itemset engine built on a single closure tree.
///
/// Nodes are ordered by the rank items received when first seen in the
/// stream (the `history` map), so the tree shape is stable under support
/// changes. Each node tracks both its window support and how often its
/// itemset occurred verbatim as a transaction.
#[derive(Debug, Clone)]
pub struct DirectUpdateTree<T: Item> {
    tree: ClosureTree<T>,
    /// Item -> first-seen rank. Grows monotonically; items are never evicted,
    /// which keeps the node order stable across window slides.
    history: HashMap<T, usize>,
    next_rank: usize,
}

impl<T: Item> DirectUpdateTree<T> {
    pub fn new() -> Self {
        Self {
            tree: ClosureTree::new(),
            history: HashMap::new(),
            next_rank: 0,
        }
    }

    /// Number of closed itemsets currently represented.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.len() == 0
    }

    fn register_items(&mut self, x: &Itemset<T>) {
        for item in x {
            if !self.history.contains_key(item) {
                self.history.insert(item.clone(), self.next_rank);
                self.next_rank += 1;
            }
        }
    }

    /// Itemsets that may become closed (or change support) when `x` arrives:
    /// the intersections of `x` with the relevant existing nodes, longest
    /// first. Relevance is decided by a rank-pruned walk: once a child prunes,
    /// its rank-later siblings prune too.
    fn candidates_desc_len(&self, x: &Itemset<T>) -> Vec<Itemset<T>> {
        let mut relevant = Vec::new();
        self.collect_relevant(ROOT, x, &mut relevant);

        let mut distinct: HashSet<Itemset<T>> = HashSet::new();
        for id in relevant {
            let intersection = self.tree.node(id).itemset.intersection(x);
            if !intersection.is_empty() {
                distinct.insert(intersection);
            }
        }

        let mut candidates: Vec<Itemset<T>> = distinct.into_iter().collect();
        candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        candidates
    }

    fn collect_relevant(&self, id: usize, x: &Itemset<T>, out: &mut Vec<usize>) {
        for &child in &self.tree.node(id).children {
            if self.can_prune(x, child) {
                // Siblings are rank-sorted, so everything after this child
                // is rank-larger and prunes as well.
                break;
            }
            out.push(child);
            self.collect_relevant(child, x, out);
        }
    }

    /// Rank-based pruning test: a node (and its subtree) is irrelevant for
    /// `x` when the largest rank of `x` lies below the smallest rank of the
    /// node's itemset, items shared with the node's parent discounted.
    fn can_prune(&self, x: &Itemset<T>, id: usize) -> bool {
        let parent = self.tree.node(id).parent;
        let shared = self.tree.node(parent).itemset.intersection(x);

        let max_x = x
            .iter()
            .filter(|item| !shared.contains(item))
            .map(|item| self.history[item])
            .max();
        let min_y = self
            .tree
            .node(id)
            .itemset
            .iter()
            .filter(|item| !shared.contains(item))
            .map(|item| self.history[item])
            .min();

        match (max_x, min_y) {
            (Some(max_x), Some(min_y)) => max_x < min_y,
            _ => true,
        }
    }

    /// An itemset stays closed after adding the transaction `added` iff its
    /// minimum-length superset in the tree shares no extra item with the
    /// transaction. No superset at all means not closed.
    fn closure_check_for_add(&self, x: &Itemset<T>, added: &Itemset<T>) -> bool {
        match self.tree.find_min_superset(x) {
            None => false,
            Some(id) => self
                .tree
                .node(id)
                .itemset
                .iter()
                .all(|item| x.contains(item) || !added.contains(item)),
        }
    }

    /// A node stays closed after a delete iff the intersection of its
    /// remaining strict supersets equals its itemset, or its itemset still
    /// occurs as a transaction in the window.
    fn closure_check_for_delete(&self, id: usize, obsolete: &[usize]) -> bool {
        let node = self.tree.node(id);
        if node.count > 0 {
            return true;
        }

        let mut meet: Option<Itemset<T>> = None;
        for sid in self.tree.find_all_supersets(&node.itemset, false) {
            if obsolete.contains(&sid) {
                continue;
            }
            match meet.as_mut() {
                None => meet = Some(self.tree.node(sid).itemset.clone()),
                Some(meet) => meet.retain_all(&self.tree.node(sid).itemset),
            }
        }
        meet.is_some_and(|meet| meet == node.itemset)
    }

    fn collect_closed(&self, id: usize, threshold: usize, out: &mut BTreeSet<Itemset<T>>) {
        let node = self.tree.node(id);
        if id != ROOT && node.support >= threshold {
            out.insert(node.itemset.clone());
        }
        for &child in &node.children {
            self.collect_closed(child, threshold, out);
        }
    }
}

#[cfg(test)]
impl<T: Item> DirectUpdateTree<T> {
    /// Every item of every windowed transaction must carry a first-seen rank.
    pub(crate) fn assert_history_complete(&self, window: &[Itemset<T>]) {
        for tx in window {
            for item in tx {
                assert!(
                    self.history.contains_key(item),
                    "item {item:?} from the window has no first-seen rank"
                );
            }
        }
    }
}

impl<T: Item> Default for DirectUpdateTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item> SlidingWindowMiner<T> for DirectUpdateTree<T> {
    fn support(&self, x: &Itemset<T>) -> usize {
        match self.tree.find(x) {
            Some(id) => self.tree.node(id).support,
            None => self.tree.support_if_not_contained(x),
        }
    }

    fn add(&mut self, x: &Itemset<T>) -> EngineResult<()> {
        if x.is_empty() {
            return Err(EngineError::EmptyTransaction);
        }
        self.register_items(x);

        if let Some(id) = self.tree.find(x) {
            // The transaction is already a closed itemset: bump it and every
            // candidate that has a node of its own.
            self.tree.node_mut(id).count += 1;
            self.tree.node_mut(id).support += 1;
            let mut candidates = self.candidates_desc_len(x);
            candidates.retain(|c| c != x);
            for candidate in &candidates {
                if let Some(cid) = self.tree.find(candidate) {
                    self.tree.node_mut(cid).support += 1;
                }
            }
            return Ok(());
        }

        let support = self.tree.support_if_not_contained(x);
        // (itemset, support, count) of every node this add will create.
        let mut pending = vec![(x.clone(), support + 1, 1)];

        if x.len() > 1 {
            let mut candidates = self.candidates_desc_len(x);
            candidates.retain(|c| c != x);
            for candidate in candidates {
                if let Some(cid) = self.tree.find(&candidate) {
                    self.tree.node_mut(cid).support += 1;
                    continue;
                }
                let candidate_support = self.tree.support_if_not_contained(&candidate);
                if candidate_support > 0 && self.closure_check_for_add(&candidate, x) {
                    pending.push((candidate, candidate_support + 1, 0));
                }
            }
        }

        pending.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        for (itemset, support, count) in pending {
            let id = self.tree.alloc(itemset, support, count);
            self.tree.insert_node(id, &self.history);
        }
        Ok(())
    }

    fn delete(&mut self, x: &Itemset<T>) -> EngineResult<()> {
        let id = self
            .tree
            .find(x)
            .filter(|&id| self.tree.node(id).count > 0)
            .ok_or_else(|| EngineError::TransactionNotFound(x.to_string()))?;

        if self.tree.node(id).count >= 2 {
            // The itemset still occurs as a transaction; only supports move.
            self.tree.node_mut(id).count -= 1;
            for sid in self.tree.find_all_subsets(x) {
                self.tree.node_mut(sid).support -= 1;
            }
            return Ok(());
        }

        let mut subsets = self.tree.find_all_subsets(x);
        subsets.sort_by(|&a, &b| {
            self.tree
                .node(b)
                .itemset
                .len()
                .cmp(&self.tree.node(a).itemset.len())
        });

        self.tree.node_mut(id).count -= 1;
        let mut obsolete: Vec<usize> = Vec::new();
        for sid in subsets {
            if self.tree.node(sid).count >= 2 {
                self.tree.node_mut(sid).support -= 1;
            } else if self.closure_check_for_delete(sid, &obsolete) {
                self.tree.node_mut(sid).support -= 1;
            } else {
                obsolete.push(sid);
            }
        }

        for oid in obsolete {
            self.tree.remove_node(oid, &self.history);
        }
        Ok(())
    }

    fn closed_frequent(&self, threshold: usize) -> BTreeSet<Itemset<T>> {
        let mut out = BTreeSet::new();
        self.collect_closed(ROOT, threshold, &mut out);
        out
    }
}
