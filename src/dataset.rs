//! Loaders for the transaction datasets the experiments run against.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::itemset::Itemset;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid item {value:?} on line {line}")]
    InvalidItem { line: u64, value: String },
}

fn parse_item(record: &StringRecord, value: &str) -> Result<u32, DatasetError> {
    value.trim().parse().map_err(|_| DatasetError::InvalidItem {
        line: record.position().map_or(0, |pos| pos.line()),
        value: value.to_string(),
    })
}

/// Load a dataset with one transaction per line, items as comma-separated
/// integers. Lines may differ in length; empty fields are skipped.
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<Itemset<u32>>, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut tdb = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut itemset = Itemset::new();
        for value in record.iter() {
            if value.trim().is_empty() {
                continue;
            }
            itemset.insert(parse_item(&record, value)?);
        }
        if !itemset.is_empty() {
            tdb.push(itemset);
        }
    }
    Ok(tdb)
}

/// Load the poker-hand dataset: a header line, then rows of (suit, rank)
/// column pairs. Each card becomes one item with the suit in the upper half
/// of the value, so hands of five cards map to five-item transactions.
pub fn load_poker<P: AsRef<Path>>(
    path: P,
    limit: usize,
) -> Result<Vec<Itemset<u32>>, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut tdb = Vec::new();
    for result in reader.records().take(limit) {
        let record = result?;
        let mut itemset = Itemset::new();
        let mut columns = record.iter();
        while let (Some(suit), Some(rank)) = (columns.next(), columns.next()) {
            let suit = parse_item(&record, suit)?;
            let rank = parse_item(&record, rank)?;
            itemset.insert((suit << 16) | rank);
        }
        if !itemset.is_empty() {
            tdb.push(itemset);
        }
    }
    Ok(tdb)
}

/// Load the mushroom dataset: a header line, then semicolon-separated
/// categorical columns. The same character can appear in different columns
/// with different meanings, so the column index is packed into the upper
/// half of each item.
pub fn load_mushroom<P: AsRef<Path>>(path: P) -> Result<Vec<Itemset<u32>>, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(b';')
        .from_path(path.as_ref())?;

    let mut tdb = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut itemset = Itemset::new();
        for (column, value) in record.iter().enumerate() {
            let value = value.chars().next().map_or(0, |c| c as u32);
            itemset.insert(((column as u32) << 16) | value);
        }
        if !itemset.is_empty() {
            tdb.push(itemset);
        }
    }
    Ok(tdb)
}
