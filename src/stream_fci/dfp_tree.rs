use std::collections::{BTreeSet, HashMap, HashSet};

use crate::itemset::{Item, Itemset};

const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct Node<T: Item> {
    /// `None` only for the root.
    item: Option<T>,
    count: usize,
    parent: usize,
    children: HashMap<T, usize>,
    /// Next node carrying the same item, threading the header chains
    /// through the arena.
    node_link: Option<usize>,
}

#[derive(Debug, Clone)]
struct HeaderEntry {
    /// Total count of the item across the tree: the sum over its chain.
    support: usize,
    head: Option<usize>,
}

/// Dynamic frequent-pattern tree. Transactions are stored as root paths in
/// tree order (item support descending, item value ascending on ties); after
/// every add or delete the tree is rebalanced until that order holds on every
/// edge again.
#[derive(Debug, Clone)]
pub(crate) struct DfpTree<T: Item> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    header: HashMap<T, HeaderEntry>,
}

impl<T: Item> DfpTree<T> {
    pub fn new() -> Self {
        Self {
            slots: vec![Some(Node {
                item: None,
                count: 0,
                parent: ROOT,
                children: HashMap::new(),
                node_link: None,
            })],
            free: Vec::new(),
            header: HashMap::new(),
        }
    }

    fn node(&self, id: usize) -> &Node<T> {
        self.slots[id].as_ref().expect("dangling node id")
    }

    fn node_mut(&mut self, id: usize) -> &mut Node<T> {
        self.slots[id].as_mut().expect("dangling node id")
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
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

    fn release(&mut self, id: usize) {
        self.slots[id] = None;
        self.free.push(id);
    }

    pub fn is_empty(&self) -> bool {
        self.node(ROOT).children.is_empty()
    }

    pub fn header_support(&self, item: &T) -> usize {
        self.header.get(item).map_or(0, |entry| entry.support)
    }

    /// Items of `x` in tree order: header support descending, item ascending
    /// on ties. Items without a header entry count as support zero.
    pub fn tree_order(&self, x: &Itemset<T>) -> Vec<T> {
        let mut items: Vec<T> = x.iter().cloned().collect();
        items.sort_by(|a, b| {
            self.header_support(b)
                .cmp(&self.header_support(a))
                .then_with(|| a.cmp(b))
        });
        items
    }

    /// Append a freshly created node to the tail of its item's chain,
    /// creating the header entry when the item is new.
    fn append_to_chain(&mut self, item: &T, id: usize) {
        let Some(head) = self.header.get(item).map(|entry| entry.head) else {
            self.header.insert(
                item.clone(),
                HeaderEntry {
                    support: 1,
                    head: Some(id),
                },
            );
            return;
        };
        match head {
            None => {
                let entry = self.header.get_mut(item).expect("checked above");
                entry.head = Some(id);
                entry.support = 1;
            }
            Some(head) => {
                self.header.get_mut(item).expect("checked above").support += 1;
                let mut tail = head;
                while let Some(next) = self.node(tail).node_link {
                    tail = next;
                }
                self.node_mut(tail).node_link = Some(id);
            }
        }
    }

    /// Splice a node out of its item's chain. The header entry must still
    /// exist while the node is linked.
    fn unlink_from_chain(&mut self, id: usize) {
        let item = self.node(id).item.clone().expect("root is never chained");
        let next = self.node(id).node_link;
        let entry = self.header.get_mut(&item).expect("chained node has a header");
        if entry.head == Some(id) {
            entry.head = next;
            return;
        }
        let mut link = entry.head.expect("chain cannot be empty");
        while self.node(link).node_link != Some(id) {
            link = self.node(link).node_link.expect("node missing from its chain");
        }
        self.node_mut(link).node_link = next;
    }

    pub fn add(&mut self, x: &Itemset<T>) {
        let mut current = ROOT;
        for item in self.tree_order(x) {
            if let Some(&child) = self.node(current).children.get(&item) {
                self.node_mut(child).count += 1;
                self.header
                    .get_mut(&item)
                    .expect("existing path item has a header")
                    .support += 1;
                current = child;
            } else {
                let id = self.alloc(Node {
                    item: Some(item.clone()),
                    count: 1,
                    parent: current,
                    children: HashMap::new(),
                    node_link: None,
                });
                self.node_mut(current).children.insert(item.clone(), id);
                self.append_to_chain(&item, id);
                current = id;
            }
        }
        self.adjust(false);
        debug_assert!(self.header_chains_consistent(), "header support out of sync");
    }

    /// Header invariant: each entry's support equals the total count over its
    /// node-link chain.
    fn header_chains_consistent(&self) -> bool {
        self.header.values().all(|entry| {
            let mut sum = 0;
            let mut link = entry.head;
            while let Some(id) = link {
                sum += self.node(id).count;
                link = self.node(id).node_link;
            }
            sum == entry.support
        })
    }

    /// Whether the projected path of `x` exists node by node. Holds for every
    /// transaction currently in the window.
    pub fn contains_path(&self, x: &Itemset<T>) -> bool {
        let mut current = ROOT;
        for item in self.tree_order(x) {
            match self.node(current).children.get(&item) {
                Some(&child) => current = child,
                None => return false,
            }
        }
        current != ROOT
    }

    pub fn delete(&mut self, x: &Itemset<T>) {
        let mut current = ROOT;
        for item in self.tree_order(x) {
            let Some(&child) = self.node(current).children.get(&item) else {
                break;
            };
            self.node_mut(child).count -= 1;
            let entry = self.header.get_mut(&item).expect("path item has a header");
            entry.support -= 1;
            let drop_header = entry.support == 0;

            let next = if self.node(child).count == 0 {
                self.unlink_from_chain(child);
                self.node_mut(current).children.remove(&item);
                let grandchildren: Vec<usize> =
                    self.node(child).children.values().copied().collect();
                for gc in grandchildren {
                    self.node_mut(gc).parent = current;
                    self.merge(current, gc);
                }
                self.release(child);
                current
            } else {
                child
            };

            if drop_header {
                self.header.remove(&item);
            }
            current = next;
        }
        self.adjust(true);
        debug_assert!(self.header_chains_consistent(), "header support out of sync");
    }

    /// Fold the subtree rooted at `id` into `target`'s children: counts of
    /// shared items accumulate, unshared subtrees are attached as they are.
    fn merge(&mut self, target: usize, id: usize) {
        let item = self.node(id).item.clone().expect("cannot merge the root");
        if let Some(&existing) = self.node(target).children.get(&item) {
            let folded = self.node(id).count;
            self.node_mut(existing).count += folded;
            self.unlink_from_chain(id);
            let children: Vec<usize> = self.node(id).children.values().copied().collect();
            for child in children {
                self.merge(existing, child);
            }
            self.release(id);
        } else {
            self.node_mut(target).children.insert(item, id);
            self.node_mut(id).parent = target;
        }
    }

    /// Restore the tree order: while some node sits below a parent of lower
    /// support (or equal support but larger item), rotate the two and merge
    /// the rotated branch back in.
    fn adjust(&mut self, after_delete: bool) {
        while let Some(y) = self.find_inverse_pair(after_delete) {
            let x = self.node(y).parent;
            let w = self.node(x).parent;
            let y_item = self.node(y).item.clone().expect("root has no parent");
            let x_item = self.node(x).item.clone().expect("inverse parent is not root");

            self.node_mut(x).children.remove(&y_item);
            let moved = self.node(y).count;
            self.node_mut(x).count -= moved;

            // Replacement node keeping x's item on the rotated path.
            let v = self.alloc(Node {
                item: Some(x_item.clone()),
                count: moved,
                parent: y,
                children: HashMap::new(),
                node_link: None,
            });
            // v takes x's place for y's subtree and joins the chain right
            // after x, so the item's header support is unchanged.
            let x_link = self.node(x).node_link;
            self.node_mut(v).node_link = x_link;
            self.node_mut(x).node_link = Some(v);

            let grandchildren = std::mem::take(&mut self.node_mut(y).children);
            for &gc in grandchildren.values() {
                self.node_mut(gc).parent = v;
            }
            self.node_mut(v).children = grandchildren;
            self.node_mut(y).children = HashMap::from([(x_item.clone(), v)]);
            self.node_mut(y).parent = w;

            if self.node(x).count == 0 {
                self.node_mut(w).children.remove(&x_item);
                // x sits right before v in the chain; bypassing it keeps v.
                let entry = self
                    .header
                    .get_mut(&x_item)
                    .expect("rotated item has a header");
                if entry.head == Some(x) {
                    entry.head = Some(v);
                } else {
                    let mut link = entry.head.expect("chain cannot be empty");
                    while self.node(link).node_link != Some(x) {
                        link = self.node(link).node_link.expect("node missing from its chain");
                    }
                    self.node_mut(link).node_link = Some(v);
                }
                self.release(x);
            }

            self.merge(w, y);
        }
    }

    /// Find a node whose edge to its parent violates the tree order. Items
    /// are scanned in ascending order so the search is deterministic.
    fn find_inverse_pair(&self, after_delete: bool) -> Option<usize> {
        let mut items: Vec<&T> = self.header.keys().collect();
        items.sort();

        for item in items {
            let entry = &self.header[item];
            if entry.support > 1 || (after_delete && entry.support == 1) {
                let mut link = entry.head;
                while let Some(id) = link {
                    let parent = self.node(id).parent;
                    if parent != ROOT {
                        let parent_item =
                            self.node(parent).item.as_ref().expect("non-root has an item");
                        let parent_support = self.header_support(parent_item);
                        if parent_support < entry.support
                            || (parent_support == entry.support && parent_item > item)
                        {
                            return Some(id);
                        }
                    }
                    link = self.node(id).node_link;
                }
            }
        }
        None
    }

    /// Total count of `item` within the subtree of `id`; descent stops at
    /// nodes carrying the item, since it cannot repeat below itself.
    fn count_sum(&self, id: usize, item: &T) -> usize {
        let mut sum = 0;
        for (i, &child) in &self.node(id).children {
            if i == item {
                sum += self.node(child).count;
            } else {
                sum += self.count_sum(child, item);
            }
        }
        sum
    }

    fn descendant_items(&self, id: usize) -> HashSet<T> {
        let mut items = HashSet::new();
        self.descendant_items_into(id, &mut items);
        items
    }

    fn descendant_items_into(&self, id: usize, items: &mut HashSet<T>) {
        for (item, &child) in &self.node(id).children {
            items.insert(item.clone());
            self.descendant_items_into(child, items);
        }
    }

    /// Closed itemsets held by the tree: root paths no descendant item fully
    /// covers, closed under pairwise intersection.
    pub fn closed_itemsets(&self) -> BTreeSet<Itemset<T>> {
        let mut collected: HashSet<Itemset<T>> = HashSet::new();
        let mut path: Vec<T> = Vec::new();
        self.collect_closed(ROOT, &mut path, &mut collected);

        // A descendant item covering a path's whole count only rules out that
        // one path; the itemsets shared between branches surface as pairwise
        // intersections, iterated to a fixed point.
        loop {
            let mut fresh: Vec<Itemset<T>> = Vec::new();
            for a in &collected {
                for b in &collected {
                    let shared = a.intersection(b);
                    if !shared.is_empty() && !collected.contains(&shared) {
                        fresh.push(shared);
                    }
                }
            }
            if fresh.is_empty() {
                break;
            }
            collected.extend(fresh);
        }

        collected.into_iter().collect()
    }

    fn collect_closed(&self, id: usize, path: &mut Vec<T>, out: &mut HashSet<Itemset<T>>) {
        if id != ROOT {
            let count = self.node(id).count;
            let covered = self
                .descendant_items(id)
                .into_iter()
                .any(|item| self.count_sum(id, &item) == count);
            if !covered {
                out.insert(path.iter().cloned().collect());
            }
        }
        let children: Vec<(T, usize)> = self
            .node(id)
            .children
            .iter()
            .map(|(item, &child)| (item.clone(), child))
            .collect();
        for (item, child) in children {
            path.push(item);
            self.collect_closed(child, path, out);
            path.pop();
        }
    }

    /// Support of an arbitrary itemset: walk the chain of its rank-deepest
    /// item and count every node whose root path covers the whole itemset.
    pub fn support(&self, x: &Itemset<T>) -> usize {
        let order = self.tree_order(x);
        let Some(deepest) = order.last() else {
            return 0;
        };
        let Some(entry) = self.header.get(deepest) else {
            return 0;
        };

        let mut sum = 0;
        let mut link = entry.head;
        while let Some(id) = link {
            let mut missing: HashSet<&T> = x.iter().collect();
            let mut current = id;
            while current != ROOT {
                if let Some(item) = self.node(current).item.as_ref() {
                    missing.remove(item);
                }
                current = self.node(current).parent;
            }
            if missing.is_empty() {
                sum += self.node(id).count;
            }
            link = self.node(id).node_link;
        }
        sum
    }
}
