//! Replays a transaction stream through an engine under the sliding-window
//! protocol and records how the processing time grows.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::engine::{EngineError, EngineKind, SlidingWindowMiner};
use crate::itemset::{Item, Itemset};

#[derive(Debug, Error)]
pub enum MeasureError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),
}

/// Wall-clock checkpoints of one replay: elapsed time after every
/// `window`-sized batch of transactions, plus one final checkpoint.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub window: usize,
    pub checkpoints: Vec<(usize, Duration)>,
}

/// Drive the engine over the whole stream: once the window is full, each step
/// ages out the oldest transaction before adding the next one.
pub fn run_sliding_window<T, M>(
    engine: &mut M,
    tdb: &[Itemset<T>],
    window: usize,
) -> Result<Measurement, EngineError>
where
    T: Item,
    M: SlidingWindowMiner<T>,
{
    assert!(window > 0, "window size must be positive");

    let start = Instant::now();
    let mut checkpoints = Vec::new();
    for (i, itemset) in tdb.iter().enumerate() {
        if i % window == 0 {
            checkpoints.push((i, start.elapsed()));
            debug!("processed {i} of {} transactions", tdb.len());
        }
        if i >= window {
            engine.delete(&tdb[i - window])?;
        }
        engine.add(itemset)?;
    }
    checkpoints.push((tdb.len(), start.elapsed()));

    Ok(Measurement {
        window,
        checkpoints,
    })
}

/// Write a measurement as `"<transactions> <seconds>"` lines.
pub fn save_results(path: &Path, measurement: &Measurement) -> Result<(), MeasureError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for (transactions, elapsed) in &measurement.checkpoints {
        writeln!(file, "{} {}", transactions, elapsed.as_secs_f64())?;
    }
    Ok(())
}

/// Replay the stream once per window size and store the timings under
/// `out_dir`, one `<name>_<window>.txt` per run. Window sizes run in
/// parallel; every run builds its own engine instance, so nothing is shared.
/// Result files that already exist are kept, which makes interrupted
/// experiment batches resumable.
pub fn run_experiments<T>(
    kind: EngineKind,
    name: &str,
    tdb: &[Itemset<T>],
    windows: &[usize],
    out_dir: &Path,
) -> Result<(), MeasureError>
where
    T: Item + Send + Sync,
{
    windows
        .par_iter()
        .map(|&window| {
            let path = out_dir.join(format!("{name}_{window}.txt"));
            if path.is_file() {
                info!("experiment {} already done, skipped", path.display());
                return Ok(());
            }
            info!("running {} on {name} with window {window}", kind.name());
            let mut engine = kind.build::<T>();
            let measurement = run_sliding_window(&mut engine, tdb, window)?;
            save_results(&path, &measurement)
        })
        .collect()
}
