use std::collections::HashMap;

use crate::itemset::{Item, Itemset};

use super::content_table::Cid;

/// Inverted index from item to the content-table entries whose itemset
/// contains it.
#[derive(Debug, Clone, Default)]
pub(crate) struct ItemTable<T: Item> {
    entries: HashMap<T, Vec<Cid>>,
}

impl<T: Item> ItemTable<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn cids(&self, item: &T) -> &[Cid] {
        self.entries.get(item).map_or(&[], Vec::as_slice)
    }

    pub fn add(&mut self, item: T, cid: Cid) {
        let cids = self.entries.entry(item).or_default();
        if !cids.contains(&cid) {
            cids.push(cid);
        }
    }

    /// Drop `cid` from the lists of every item in `itemset`.
    pub fn delete(&mut self, cid: Cid, itemset: &Itemset<T>) {
        for item in itemset {
            if let Some(cids) = self.entries.get_mut(item) {
                cids.retain(|&c| c != cid);
                if cids.is_empty() {
                    self.entries.remove(item);
                }
            }
        }
    }
}
