// src/process/columns.rs
//! Column naming and column selection.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::grid::{Cell, RawGrid};
use crate::process::date_parser::TimestampIndex;
use crate::process::types::{DataRow, DataTable};
use crate::process::utils::has_digit;

/// Unique column names for a header row.
///
/// The first occurrence of a raw name keeps it; later occurrences (sensor
/// swaps) become `"<raw>.1"`, `"<raw>.2"`, ... left to right. Trailing blank
/// header cells are not columns.
pub fn reconcile_columns(header: &[Cell]) -> Vec<String> {
    let width = header
        .iter()
        .rposition(|c| !c.is_blank())
        .map_or(0, |i| i + 1);
    let raw: Vec<String> = header[..width].iter().map(Cell::as_text).collect();

    let raw_names: HashSet<&str> = raw.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(width);
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(width);

    for name in &raw {
        let mut candidate = name.clone();
        if used.contains(&candidate) {
            let k = next_suffix.entry(name.as_str()).or_insert(0);
            // skip suffixes that collide with a literal header name
            loop {
                *k += 1;
                candidate = format!("{}.{}", name, k);
                if !raw_names.contains(candidate.as_str()) && !used.contains(&candidate) {
                    break;
                }
            }
        }
        used.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Coerce every cell of the indexed rows to an optional float.
pub fn build_table(grid: &RawGrid, columns: &[String], index: &TimestampIndex) -> DataTable {
    let rows = index
        .entries
        .iter()
        .map(|&(r, timestamp)| DataRow {
            timestamp,
            values: (0..columns.len()).map(|c| grid.cell(r, c).as_f64()).collect(),
        })
        .collect();
    DataTable {
        columns: columns.to_vec(),
        rows,
    }
}

/// Removes configured columns, then any column whose name carries a digit
/// (swap suffixes, serial-tagged names) or is blank.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    drop_cols: Vec<String>,
}

impl ColumnFilter {
    pub fn new(drop_cols: &[String]) -> Self {
        Self {
            drop_cols: drop_cols.to_vec(),
        }
    }

    /// Indices of columns not named in the drop list. Configured names
    /// missing from `columns` are ignored.
    pub fn configured_keep(&self, columns: &[String]) -> Vec<usize> {
        (0..columns.len())
            .filter(|&i| !self.drop_cols.contains(&columns[i]))
            .collect()
    }

    /// Indices of the measurement columns that survive every rule.
    pub fn keep(&self, columns: &[String]) -> Vec<usize> {
        self.configured_keep(columns)
            .into_iter()
            .filter(|&i| {
                let name = &columns[i];
                !name.trim().is_empty() && !has_digit(name)
            })
            .collect()
    }

    /// Table after the drop list only.
    pub fn apply_configured(&self, table: &DataTable) -> DataTable {
        table.select(&self.configured_keep(&table.columns))
    }

    pub fn apply(&self, table: &DataTable) -> DataTable {
        let keep = self.keep(&table.columns);
        debug!(
            kept = keep.len(),
            dropped = table.columns.len() - keep.len(),
            "column filter"
        );
        table.select(&keep)
    }
}
