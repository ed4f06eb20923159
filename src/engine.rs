use std::collections::BTreeSet;
use std::str::FromStr;

use thiserror::Error;

use crate::diu::DirectUpdateTree;
use crate::itemset::{Item, Itemset};
use crate::mfci::Mfci;
use crate::stream_fci::StreamFci;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot add an empty transaction")]
    EmptyTransaction,
    /// Deleting a transaction that is not in the window breaks the engines'
    /// bookkeeping; the caller gets an error instead of a corrupted structure.
    #[error("transaction {0} is not in the current window")]
    TransactionNotFound(String),
}

/// Contract shared by the sliding-window mining engines.
///
/// The driver applies window deltas strictly in order: once the window is
/// full, each step deletes the aged-out transaction and adds the new one.
/// Adding the same itemset twice is meaningful (the window then holds two
/// equal transactions), and every delete must match an earlier add.
pub trait SlidingWindowMiner<T: Item> {
    /// Number of transactions in the current window containing `x`.
    fn support(&self, x: &Itemset<T>) -> usize;

    /// Add one transaction to the window.
    fn add(&mut self, x: &Itemset<T>) -> EngineResult<()>;

    /// Remove one transaction from the window. The transaction must have been
    /// added before and not yet deleted a matching number of times.
    fn delete(&mut self, x: &Itemset<T>) -> EngineResult<()>;

    /// All itemsets that are closed within the current window.
    fn closed_itemsets(&self) -> BTreeSet<Itemset<T>> {
        self.closed_frequent(0)
    }

    /// All closed itemsets with support at least `threshold`.
    fn closed_frequent(&self, threshold: usize) -> BTreeSet<Itemset<T>>;
}

/// Selects one of the mining engines at driver level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Diu,
    Mfci,
    StreamFci,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [EngineKind::Diu, EngineKind::Mfci, EngineKind::StreamFci];

    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Diu => "diu",
            EngineKind::Mfci => "mfci",
            EngineKind::StreamFci => "stream-fci",
        }
    }

    pub fn build<T: Item>(&self) -> Engine<T> {
        match self {
            EngineKind::Diu => Engine::Diu(DirectUpdateTree::new()),
            EngineKind::Mfci => Engine::Mfci(Mfci::new()),
            EngineKind::StreamFci => Engine::StreamFci(StreamFci::new()),
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diu" => Ok(EngineKind::Diu),
            "mfci" => Ok(EngineKind::Mfci),
            "stream-fci" | "streamfci" => Ok(EngineKind::StreamFci),
            other => Err(format!("unknown engine '{other}' (expected diu, mfci or stream-fci)")),
        }
    }
}

/// Tagged union over the three engines, so drivers can pick one at runtime
/// without trait objects.
#[derive(Debug, Clone)]
pub enum Engine<T: Item> {
    Diu(DirectUpdateTree<T>),
    Mfci(Mfci<T>),
    StreamFci(StreamFci<T>),
}

impl<T: Item> SlidingWindowMiner<T> for Engine<T> {
    fn support(&self, x: &Itemset<T>) -> usize {
        match self {
            Engine::Diu(e) => e.support(x),
            Engine::Mfci(e) => e.support(x),
            Engine::StreamFci(e) => e.support(x),
        }
    }

    fn add(&mut self, x: &Itemset<T>) -> EngineResult<()> {
        match self {
            Engine::Diu(e) => e.add(x),
            Engine::Mfci(e) => e.add(x),
            Engine::StreamFci(e) => e.add(x),
        }
    }

    fn delete(&mut self, x: &Itemset<T>) -> EngineResult<()> {
        match self {
            Engine::Diu(e) => e.delete(x),
            Engine::Mfci(e) => e.delete(x),
            Engine::StreamFci(e) => e.delete(x),
        }
    }

    fn closed_frequent(&self, threshold: usize) -> BTreeSet<Itemset<T>> {
        match self {
            Engine::Diu(e) => e.closed_frequent(threshold),
            Engine::Mfci(e) => e.closed_frequent(threshold),
            Engine::StreamFci(e) => e.closed_frequent(threshold),
        }
    }
}
