//! Closed-itemset DAG engine: a content table of closed itemsets whose
//! immediate sub-/superset edges are maintained incrementally, backed by an
//! inverted item index.

mod content_table;
mod item_table;
mod temp_table;

use std::collections::{BTreeSet, HashSet};

use crate::engine::{EngineError, EngineResult, SlidingWindowMiner};
use crate::itemset::{Item, Itemset};

use content_table::{Cid, ContentTable};
use item_table::ItemTable;
use temp_table::TempTable;

/// Incremental closed-itemset miner over a content/item table pair.
///
/// Every `add` intersects the new transaction with the existing closed
/// itemsets (via the item index) to discover which intersections become
/// closed, then repairs the immediate-subset DAG. Every `delete` walks the
/// closed subsets of the removed transaction and collapses entries whose
/// support merged into a superset.
#[derive(Debug, Clone)]
pub struct Mfci<T: Item> {
    content: ContentTable<T>,
    items: ItemTable<T>,
}

impl<T: Item> Mfci<T> {
    pub fn new() -> Self {
        Self {
            content: ContentTable::new(),
            items: ItemTable::new(),
        }
    }

    /// Number of closed itemsets currently represented.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.len() == 0
    }

    /// Build the working set for one add: for each item of `x` in ascending
    /// order, every entry containing that item contributes one growing
    /// intersection row. Sorting and merging leaves one row per distinct
    /// intersection, carrying the maximum support among its sources.
    fn generate_closed_itemsets(&self, x: &Itemset<T>) -> TempTable<T> {
        let mut temp = TempTable::new();
        let mut seen: HashSet<Cid> = HashSet::new();

        for item in x {
            let cids = self.items.cids(item);
            for &cid in cids {
                if seen.contains(&cid) {
                    if let Some(entry) = temp.find_by_closure_id_mut(cid) {
                        entry.itemset.insert(item.clone());
                    }
                } else {
                    temp.push(cid, [item.clone()].into(), self.content.get(cid).support);
                }
            }
            seen.extend(cids.iter().copied());
        }

        temp.sort();
        temp.merge();
        temp
    }

    /// Repair the immediate-subset DAG after an add. Rows are visited longest
    /// first; a row that coincides with an existing closed itemset shields
    /// its subsets from re-linking, everything else gets linked according to
    /// whether a superset edge inside the row's itemset already exists.
    fn process_add(&mut self, temp: &mut TempTable<T>, xi: usize, new_itemset: &Itemset<T>) {
        temp.entry_mut(xi).processed = true;
        let xi_itemset = temp.entry(xi).itemset.clone();

        let equals_closure = match temp.entry(xi).closure_id {
            Some(cid) => self.content.get(cid).itemset == xi_itemset,
            None => false,
        };

        if equals_closure {
            for j in xi + 1..temp.len() {
                if xi_itemset.is_superset_of(&temp.entry(j).itemset) {
                    temp.entry_mut(j).processed = true;
                }
            }
            return;
        }

        let xi_cid = temp.entry(xi).cid.expect("row registered before processing");
        for j in xi + 1..temp.len() {
            if !xi_itemset.is_superset_of(&temp.entry(j).itemset) {
                continue;
            }
            let xj_cid = temp.entry(j).cid.expect("row registered before processing");

            let superflag = self
                .content
                .get(xj_cid)
                .supersets
                .iter()
                .any(|&s| xi_itemset.is_superset_of(&self.content.get(s).itemset));

            if !temp.entry(j).processed || (!superflag && *new_itemset != xi_itemset) {
                self.content.add_immediate_superset(xj_cid, xi_cid);
                self.content.add_immediate_subset(xi_cid, xj_cid);
            }

            self.process_add(temp, j, new_itemset);
        }
    }

    /// Transitive closure of the immediate-subset edges.
    fn closed_subsets(&self, cid: Cid) -> HashSet<Cid> {
        let mut found = HashSet::new();
        self.closed_subsets_into(cid, &mut found);
        found
    }

    fn closed_subsets_into(&self, cid: Cid, found: &mut HashSet<Cid>) {
        for &sub in &self.content.get(cid).subsets {
            if found.insert(sub) {
                self.closed_subsets_into(sub, found);
            }
        }
    }

    fn drop_entry(&mut self, cid: Cid) {
        let itemset = self.content.get(cid).itemset.clone();
        self.content.delete(cid);
        self.items.delete(cid, &itemset);
    }

    /// Decide the fate of one entry after the upfront support decrements: a
    /// support of zero deletes it outright; a lone immediate superset with
    /// equal support means the entry collapsed into it (its subset edges are
    /// rewired there first); anything else keeps the entry and settles its
    /// whole subset closure.
    fn process_delete(&mut self, cid: Cid, visited: &mut HashSet<Cid>, subsets: Option<&[Cid]>) {
        if !visited.insert(cid) {
            return;
        }

        if self.content.get(cid).support == 0 {
            self.drop_entry(cid);
            if let Some(subsets) = subsets {
                for &sub in subsets {
                    self.process_delete(sub, visited, None);
                }
            }
            return;
        }

        let supersets = self.content.get(cid).supersets.clone();
        if let [lone] = supersets[..] {
            if self.content.get(cid).support == self.content.get(lone).support {
                for sub in self.content.get(cid).subsets.clone() {
                    let bypass = self
                        .content
                        .get(sub)
                        .supersets
                        .clone()
                        .into_iter()
                        .filter(|&r| r != cid)
                        .any(|r| self.content.has_path(r, lone));
                    if !bypass {
                        if !self.content.get(sub).supersets.contains(&lone) {
                            self.content.get_mut(sub).supersets.push(lone);
                        }
                        if !self.content.get(lone).subsets.contains(&sub) {
                            self.content.get_mut(lone).subsets.push(sub);
                        }
                    }
                }
                self.drop_entry(cid);
                if let Some(subsets) = subsets {
                    for &sub in subsets {
                        self.process_delete(sub, visited, None);
                    }
                }
                return;
            }
        }

        // Entry survives untouched; its whole subset closure is settled too.
        for sub in self.closed_subsets(cid) {
            visited.insert(sub);
        }
    }
}

#[cfg(test)]
impl<T: Item> Mfci<T> {
    /// The immediate edges must form the skeleton of the strict-subset
    /// relation between closed itemsets: duplicate-free, mirrored in both
    /// directions, and reaching exactly the closed strict subsets of every
    /// entry when followed transitively.
    pub(crate) fn assert_immediate_dag_consistent(&self) {
        let entries: Vec<(Cid, Itemset<T>)> = self
            .content
            .entries()
            .map(|(cid, entry)| (cid, entry.itemset.clone()))
            .collect();

        for (cid, itemset) in &entries {
            let entry = self.content.get(*cid);
            for edges in [&entry.subsets, &entry.supersets] {
                assert!(
                    edges.iter().enumerate().all(|(i, c)| !edges[..i].contains(c)),
                    "duplicate immediate edge on {itemset}"
                );
            }
            for &sub in &entry.subsets {
                let sub_itemset = &self.content.get(sub).itemset;
                assert!(
                    sub_itemset.len() < itemset.len() && itemset.is_superset_of(sub_itemset),
                    "subset edge from {itemset} to non-subset {sub_itemset}"
                );
                assert!(
                    self.content.get(sub).supersets.contains(cid),
                    "missing mirror edge from {sub_itemset} back to {itemset}"
                );
            }
            for &sup in &entry.supersets {
                assert!(
                    self.content.get(sup).subsets.contains(cid),
                    "missing mirror edge from a superset back to {itemset}"
                );
            }

            let reachable = self.closed_subsets(*cid);
            for (other_cid, other) in &entries {
                let strict_subset = other.len() < itemset.len() && itemset.is_superset_of(other);
                assert_eq!(
                    reachable.contains(other_cid),
                    strict_subset,
                    "reachability of {other} from {itemset} disagrees with the subset relation"
                );
            }
        }
    }
}

impl<T: Item> Default for Mfci<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item> SlidingWindowMiner<T> for Mfci<T> {
    fn support(&self, x: &Itemset<T>) -> usize {
        self.content.support(x)
    }

    fn add(&mut self, x: &Itemset<T>) -> EngineResult<()> {
        if x.is_empty() {
            return Err(EngineError::EmptyTransaction);
        }

        let mut temp = self.generate_closed_itemsets(x);
        let already_closed = self.content.contains(x);

        for idx in 0..temp.len() {
            let closure_cid = temp
                .entry(idx)
                .closure_id
                .expect("generated rows carry their closure id");
            let closure_support = self.content.get(closure_cid).support;

            let row_itemset = temp.entry(idx).itemset.clone();
            if row_itemset != self.content.get(closure_cid).itemset {
                // A strict sub-intersection: a brand new closed itemset.
                let new_cid = self.content.new_entry(row_itemset.clone());
                temp.entry_mut(idx).cid = Some(new_cid);

                self.content.add_immediate_superset(new_cid, closure_cid);
                self.content.add_immediate_subset(closure_cid, new_cid);

                for item in &row_itemset {
                    self.items.add(item.clone(), new_cid);
                }
                self.content.get_mut(new_cid).support = closure_support + 1;
            } else {
                temp.entry_mut(idx).cid = Some(closure_cid);
                self.content.get_mut(closure_cid).support = closure_support + 1;
            }
        }

        if !temp.contains(x) {
            let new_cid = self.content.new_entry(x.clone());
            self.content.get_mut(new_cid).support = 1;
            temp.push_front(x.clone(), 1, new_cid);
            for item in x {
                self.items.add(item.clone(), new_cid);
            }
        }

        // When the transaction was already a closed itemset, the supports
        // above are the whole update; the DAG does not change shape.
        if already_closed {
            return Ok(());
        }

        for idx in 0..temp.len() {
            self.process_add(&mut temp, idx, x);
        }
        Ok(())
    }

    fn delete(&mut self, x: &Itemset<T>) -> EngineResult<()> {
        let cid = self
            .content
            .get_by_itemset(x)
            .ok_or_else(|| EngineError::TransactionNotFound(x.to_string()))?;

        let mut affected = self.closed_subsets(cid);
        affected.insert(cid);
        for &c in &affected {
            let entry = self.content.get_mut(c);
            entry.support = entry
                .support
                .checked_sub(1)
                .ok_or_else(|| EngineError::TransactionNotFound(x.to_string()))?;
        }
        affected.remove(&cid);

        let mut subsets: Vec<Cid> = affected.into_iter().collect();
        subsets.sort_by(|&a, &b| {
            let (a, b) = (&self.content.get(a).itemset, &self.content.get(b).itemset);
            b.len().cmp(&a.len()).then_with(|| a.cmp(b))
        });

        let mut visited = HashSet::new();
        self.process_delete(cid, &mut visited, Some(&subsets));
        Ok(())
    }

    fn closed_frequent(&self, threshold: usize) -> BTreeSet<Itemset<T>> {
        self.content.closed_frequent(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[char]) -> Itemset<char> {
        items.iter().copied().collect()
    }

    fn paper_stream() -> Vec<Itemset<char>> {
        vec![
            set(&['A', 'C', 'T', 'W']),
            set(&['C', 'D', 'W']),
            set(&['A', 'C', 'T', 'W']),
            set(&['A', 'C', 'D', 'W']),
            set(&['A', 'C', 'D', 'T', 'W']),
            set(&['C', 'D', 'T']),
        ]
    }

    #[test]
    fn paper_example_closed_sets_and_supports() {
        let mut mfci = Mfci::new();
        for tx in paper_stream() {
            mfci.add(&tx).unwrap();
        }

        let expected: Vec<(&[char], usize)> = vec![
            (&['C'], 6),
            (&['C', 'W'], 5),
            (&['C', 'T'], 4),
            (&['C', 'D'], 4),
            (&['A', 'C', 'W'], 4),
            (&['C', 'D', 'W'], 3),
            (&['A', 'C', 'T', 'W'], 3),
            (&['C', 'D', 'T'], 2),
            (&['A', 'C', 'D', 'W'], 2),
            (&['A', 'C', 'D', 'T', 'W'], 1),
        ];

        let closed = mfci.closed_itemsets();
        assert_eq!(closed.len(), expected.len());
        for (items, support) in expected {
            let itemset = set(items);
            assert!(closed.contains(&itemset), "missing {itemset}");
            assert_eq!(mfci.support(&itemset), support, "support of {itemset}");
        }
    }

    #[test]
    fn support_falls_back_to_the_closure() {
        let mut mfci = Mfci::new();
        for tx in paper_stream() {
            mfci.add(&tx).unwrap();
        }

        // {A} is not closed; its closure is {A,C,W} with support 4.
        assert_eq!(mfci.support(&set(&['A'])), 4);
        assert_eq!(mfci.support(&set(&['W'])), 5);
        assert_eq!(mfci.support(&set(&['D', 'T'])), 2);
        assert_eq!(mfci.support(&set(&['B'])), 0);
    }

    #[test]
    fn threshold_filters_by_support() {
        let mut mfci = Mfci::new();
        for tx in paper_stream() {
            mfci.add(&tx).unwrap();
        }

        let frequent = mfci.closed_frequent(4);
        assert_eq!(frequent.len(), 4);
        assert!(frequent.contains(&set(&['C'])));
        assert!(frequent.contains(&set(&['C', 'W'])));
        assert!(frequent.contains(&set(&['C', 'T'])));
        assert!(frequent.contains(&set(&['A', 'C', 'W'])));
        // {C,D} sits exactly on a lower threshold
        assert!(mfci.closed_frequent(5).len() < frequent.len());
    }

    #[test]
    fn full_drain_leaves_nothing_behind() {
        let mut mfci = Mfci::new();
        let stream = paper_stream();
        for tx in &stream {
            mfci.add(tx).unwrap();
        }
        for tx in &stream {
            mfci.delete(tx).unwrap();
        }
        assert!(mfci.is_empty());
        assert!(mfci.closed_itemsets().is_empty());
    }

    #[test]
    fn duplicate_transactions_share_one_entry() {
        let mut mfci = Mfci::new();
        mfci.add(&set(&['A', 'B'])).unwrap();
        mfci.add(&set(&['A', 'B'])).unwrap();
        assert_eq!(mfci.len(), 1);
        assert_eq!(mfci.support(&set(&['A', 'B'])), 2);

        mfci.delete(&set(&['A', 'B'])).unwrap();
        assert_eq!(mfci.support(&set(&['A', 'B'])), 1);
        assert_eq!(mfci.closed_itemsets().len(), 1);
    }

    #[test]
    fn deleting_unknown_transaction_fails() {
        let mut mfci = Mfci::new();
        mfci.add(&set(&['A', 'B'])).unwrap();
        assert!(mfci.delete(&set(&['A', 'C'])).is_err());
    }

    #[test]
    fn immediate_dag_stays_consistent_through_adds_and_deletes() {
        let mut mfci = Mfci::new();
        let stream = paper_stream();
        for tx in &stream {
            mfci.add(tx).unwrap();
            mfci.assert_immediate_dag_consistent();
        }
        for tx in &stream {
            mfci.delete(tx).unwrap();
            mfci.assert_immediate_dag_consistent();
        }
    }
}
