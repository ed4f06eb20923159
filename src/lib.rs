//! Incremental mining of closed frequent itemsets over a sliding window.
//!
//! A transaction stream is consumed one itemset at a time; the window holds
//! the most recent `W` transactions. Three independent engines keep the set
//! of closed itemsets (those whose support strictly exceeds every proper
//! superset's) current on every window slide:
//!
//! * [`DirectUpdateTree`] — a closure tree ordered by first-seen item rank,
//!   updated in place per transaction.
//! * [`Mfci`] — a content/item table pair maintaining the closed-itemset
//!   lattice as an explicit DAG of immediate sub-/superset edges.
//! * [`StreamFci`] — a dynamic frequent-pattern tree rebalanced by item
//!   support, with closed itemsets read off the tree on demand.
//!
//! All three implement [`SlidingWindowMiner`]; [`EngineKind`] picks one at
//! runtime. [`dataset`] loads CSV transaction streams and [`measure`] replays
//! them under the window protocol while recording timings.

pub mod dataset;
pub mod engine;
pub mod itemset;
pub mod measure;

pub mod diu;
pub mod mfci;
pub mod stream_fci;

pub use diu::DirectUpdateTree;
pub use engine::{Engine, EngineError, EngineKind, EngineResult, SlidingWindowMiner};
pub use itemset::{Item, Itemset};
pub use mfci::Mfci;
pub use stream_fci::StreamFci;

#[cfg(test)]
mod tests;
