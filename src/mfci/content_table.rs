use std::collections::BTreeSet;

use crate::itemset::{Item, Itemset};

/// Content-table identifier. Assigned in ascending order and never reused, so
/// iterating slots by index visits entries in insertion order.
pub(crate) type Cid = usize;

#[derive(Debug, Clone)]
pub(crate) struct Entry<T: Item> {
    pub itemset: Itemset<T>,
    pub support: usize,
    /// Immediate closed subsets: direct edges downward in the closed-itemset
    /// lattice (no closed set strictly in between).
    pub subsets: Vec<Cid>,
    /// Immediate closed supersets: the mirror edges upward.
    pub supersets: Vec<Cid>,
}

/// Table of all closed itemsets of the current window, cross-linked into a
/// DAG by the immediate sub-/superset edges. Deleted entries leave tombstoned
/// slots behind; cids stay stable for the table's lifetime.
#[derive(Debug, Clone)]
pub(crate) struct ContentTable<T: Item> {
    slots: Vec<Option<Entry<T>>>,
}

impl<T: Item> ContentTable<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn new_entry(&mut self, itemset: Itemset<T>) -> Cid {
        self.slots.push(Some(Entry {
            itemset,
            support: 0,
            subsets: Vec::new(),
            supersets: Vec::new(),
        }));
        self.slots.len() - 1
    }

    pub fn get(&self, cid: Cid) -> &Entry<T> {
        self.slots[cid].as_ref().expect("dangling content id")
    }

    pub fn get_mut(&mut self, cid: Cid) -> &mut Entry<T> {
        self.slots[cid].as_mut().expect("dangling content id")
    }

    /// Live entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (Cid, &Entry<T>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(cid, slot)| slot.as_ref().map(|entry| (cid, entry)))
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn contains(&self, x: &Itemset<T>) -> bool {
        self.get_by_itemset(x).is_some()
    }

    pub fn get_by_itemset(&self, x: &Itemset<T>) -> Option<Cid> {
        self.entries()
            .find(|(_, entry)| entry.itemset == *x)
            .map(|(cid, _)| cid)
    }

    /// Unlink and tombstone an entry. The mirror edges of its neighbours are
    /// cleaned up; the slot is never reused.
    pub fn delete(&mut self, cid: Cid) {
        let entry = self.slots[cid].take().expect("dangling content id");
        for sub in entry.subsets {
            if let Some(e) = self.slots[sub].as_mut() {
                e.supersets.retain(|&c| c != cid);
            }
        }
        for sup in entry.supersets {
            if let Some(e) = self.slots[sup].as_mut() {
                e.subsets.retain(|&c| c != cid);
            }
        }
    }

    /// Record `new` as an immediate closed subset of `target`, dropping any
    /// existing subset edge that `new` supersedes. Duplicates are ignored.
    pub fn add_immediate_subset(&mut self, target: Cid, new: Cid) {
        if self.get(target).subsets.contains(&new) {
            return;
        }
        let new_itemset = self.get(new).itemset.clone();
        let obsolete: Vec<Cid> = self
            .get(target)
            .subsets
            .iter()
            .copied()
            .filter(|&c| new_itemset.is_superset_of(&self.get(c).itemset))
            .collect();
        let entry = self.get_mut(target);
        entry.subsets.push(new);
        entry.subsets.retain(|c| !obsolete.contains(c));

        let subsets = &entry.subsets;
        debug_assert!(
            subsets.iter().enumerate().all(|(i, c)| !subsets[..i].contains(c)),
            "duplicate subset edge"
        );
    }

    /// Mirror of [`Self::add_immediate_subset`] for the upward direction.
    pub fn add_immediate_superset(&mut self, target: Cid, new: Cid) {
        if self.get(target).supersets.contains(&new) {
            return;
        }
        let new_itemset = self.get(new).itemset.clone();
        let obsolete: Vec<Cid> = self
            .get(target)
            .supersets
            .iter()
            .copied()
            .filter(|&c| self.get(c).itemset.is_superset_of(&new_itemset))
            .collect();
        let entry = self.get_mut(target);
        entry.supersets.push(new);
        entry.supersets.retain(|c| !obsolete.contains(c));

        let supersets = &entry.supersets;
        debug_assert!(
            supersets.iter().enumerate().all(|(i, c)| !supersets[..i].contains(c)),
            "duplicate superset edge"
        );
    }

    /// Is `to` reachable from `from` along immediate-superset edges? Only
    /// edges through subsets of `to` can lie on such a path.
    pub fn has_path(&self, from: Cid, to: Cid) -> bool {
        let target = &self.get(to).itemset;
        self.get(from).supersets.iter().any(|&s| {
            s == to || (target.is_superset_of(&self.get(s).itemset) && self.has_path(s, to))
        })
    }

    /// Support of an arbitrary itemset: the support of its closure, i.e. of
    /// the smallest entry containing it. Zero when no entry contains it.
    pub fn support(&self, x: &Itemset<T>) -> usize {
        let mut best: Option<&Entry<T>> = None;
        for (_, entry) in self.entries() {
            if entry.itemset.is_superset_of(x)
                && best.map_or(true, |b| entry.itemset.len() <= b.itemset.len())
            {
                if entry.itemset == *x {
                    return entry.support;
                }
                best = Some(entry);
            }
        }
        best.map_or(0, |entry| entry.support)
    }

    pub fn closed_frequent(&self, threshold: usize) -> BTreeSet<Itemset<T>> {
        self.entries()
            .filter(|(_, entry)| entry.support >= threshold)
            .map(|(_, entry)| entry.itemset.clone())
            .collect()
    }
}
