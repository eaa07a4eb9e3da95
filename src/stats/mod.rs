// src/stats/mod.rs
//! MAD-trimmed median: the per-burst reduction.
//!
//! For each burst and column the samples are centred on their median, every
//! sample farther than `criteria * MAD` from it is discarded, and the median
//! of what remains is the burst's value.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::debug;

use crate::process::burst::Burst;
use crate::process::types::DataTable;

/// Scale that makes the MAD a consistent estimator of the standard
/// deviation for normal data: `1 / Phi^-1(3/4)`, about 1.4826.
pub const NORMAL_CONSISTENCY: f64 = 1.0 / 0.674_489_750_196_081_7;

pub const DEFAULT_CRITERIA: f64 = 2.5;

/// Median of `values`; `None` when empty. Expects finite values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Normal-consistent median absolute deviation about the median.
pub fn median_abs_deviation(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations).map(|m| m * NORMAL_CONSISTENCY)
}

/// Median of the samples inside `[M - k, M + k]`, `M` the median and
/// `k = MAD * criteria`.
///
/// Samples exactly on a bound are kept; only samples strictly outside are
/// discarded. Missing or non-finite samples are ignored. Returns `None` when
/// nothing valid is left.
pub fn trimmed_median(samples: &[Option<f64>], criteria: f64) -> Option<f64> {
    let valid: Vec<f64> = samples
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let center = median(&valid)?;
    let k = median_abs_deviation(&valid)? * criteria;
    let (low, high) = (center - k, center + k);
    let retained: Vec<f64> = valid
        .into_iter()
        .filter(|&v| v >= low && v <= high)
        .collect();
    median(&retained)
}

/// One reduced row per burst.
#[derive(Debug, Clone, PartialEq)]
pub struct MadRow {
    pub label: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// Burst-indexed table of reduced values.
#[derive(Debug, Clone, PartialEq)]
pub struct MadTable {
    /// Label of the time index, e.g. `"Datetime (PST)"`.
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<MadRow>,
}

impl MadTable {
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let c = self.columns.iter().position(|n| n == column)?;
        self.rows.get(row)?.values[c]
    }
}

/// Reduce every (burst, column) cell of `table`.
///
/// Cells are independent; columns are reduced in parallel and reassembled
/// in column order, rows in burst order.
pub fn reduce_bursts(
    table: &DataTable,
    bursts: &[Burst],
    criteria: f64,
    index_name: &str,
) -> MadTable {
    let by_column: Vec<Vec<Option<f64>>> = (0..table.columns.len())
        .into_par_iter()
        .map(|c| {
            debug!(column = %table.columns[c], "reducing");
            bursts
                .iter()
                .map(|b| trimmed_median(&table.column_values(c, &b.rows), criteria))
                .collect()
        })
        .collect();

    let rows = bursts
        .iter()
        .enumerate()
        .map(|(i, b)| MadRow {
            label: b.label,
            values: by_column.iter().map(|col| col[i]).collect(),
        })
        .collect();

    MadTable {
        index_name: index_name.to_string(),
        columns: table.columns.clone(),
        rows,
    }
}
