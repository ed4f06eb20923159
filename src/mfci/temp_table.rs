use crate::itemset::{Item, Itemset};

use super::content_table::Cid;

/// One row of the per-add working set: a candidate intersection of the new
/// transaction with an existing closed itemset.
#[derive(Debug, Clone)]
pub(crate) struct TempEntry<T: Item> {
    /// Content id of the closed itemset this candidate was carved out of.
    /// `None` only for the row representing the new transaction itself.
    pub closure_id: Option<Cid>,
    pub itemset: Itemset<T>,
    pub processed: bool,
    pub support: usize,
    /// Content id assigned to this candidate once it has an entry.
    pub cid: Option<Cid>,
}

/// Working set built for a single `add`: candidate closed itemsets, sorted
/// longest-first, one row per distinct itemset after merging.
#[derive(Debug, Clone, Default)]
pub(crate) struct TempTable<T: Item> {
    entries: Vec<TempEntry<T>>,
}

impl<T: Item> TempTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, idx: usize) -> &TempEntry<T> {
        &self.entries[idx]
    }

    pub fn entry_mut(&mut self, idx: usize) -> &mut TempEntry<T> {
        &mut self.entries[idx]
    }

    pub fn push(&mut self, closure_id: Cid, itemset: Itemset<T>, support: usize) {
        self.entries.push(TempEntry {
            closure_id: Some(closure_id),
            itemset,
            processed: false,
            support,
            cid: None,
        });
    }

    /// Prepend the row for the new transaction itself.
    pub fn push_front(&mut self, itemset: Itemset<T>, support: usize, cid: Cid) {
        self.entries.insert(
            0,
            TempEntry {
                closure_id: None,
                itemset,
                processed: false,
                support,
                cid: Some(cid),
            },
        );
    }

    pub fn find_by_closure_id_mut(&mut self, closure_id: Cid) -> Option<&mut TempEntry<T>> {
        self.entries
            .iter_mut()
            .find(|entry| entry.closure_id == Some(closure_id))
    }

    pub fn contains(&self, itemset: &Itemset<T>) -> bool {
        self.entries.iter().any(|entry| entry.itemset == *itemset)
    }

    /// Sort rows by descending itemset length, ties lexicographically.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.itemset
                .len()
                .cmp(&a.itemset.len())
                .then_with(|| a.itemset.cmp(&b.itemset))
        });
    }

    /// Collapse runs of equal itemsets (adjacent after [`Self::sort`]) to the
    /// first row carrying the maximum support.
    pub fn merge(&mut self) {
        let mut merged: Vec<TempEntry<T>> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match merged.last_mut() {
                Some(last) if last.itemset == entry.itemset => {
                    if entry.support > last.support {
                        *last = entry;
                    }
                }
                _ => merged.push(entry),
            }
        }
        self.entries = merged;
    }
}
