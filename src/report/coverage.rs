// src/report/coverage.rs
//! Deployment coverage: when each column carried data, which rows pass the
//! conductance cut, and how complete the cut bursts are.

use chrono::NaiveDateTime;
use tracing::warn;

use crate::process::burst::Burst;
use crate::process::types::{DataTable, SensorRecord};

/// First and last non-missing timestamps of one column, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpan {
    pub column: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

pub fn column_spans(table: &DataTable) -> Vec<ColumnSpan> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let mut present = table
                .rows
                .iter()
                .filter(|row| row.values[c].is_some())
                .map(|row| row.timestamp);
            let start = present.next();
            let end = present.last().or(start);
            ColumnSpan {
                column: name.clone(),
                start,
                end,
            }
        })
        .collect()
}

/// Give each sensor the earliest start and latest end over its data
/// columns. Sensors without data columns keep no span.
pub fn attribute_spans(sensors: &mut [SensorRecord], spans: &[ColumnSpan]) {
    for sensor in sensors.iter_mut() {
        let own: Vec<&ColumnSpan> = spans
            .iter()
            .filter(|s| sensor.data_columns.contains(&s.column))
            .collect();
        sensor.start_time = own.iter().filter_map(|s| s.start).min();
        sensor.end_time = own.iter().filter_map(|s| s.end).max();
    }
}

/// Rows retained for completeness reporting.
#[derive(Debug, Clone)]
pub struct CutDataset {
    pub table: DataTable,
    /// False when the conductance column is absent and nothing was cut.
    pub applied: bool,
}

/// Keep rows whose `sc_col` value is strictly above `cutoff`; rows with a
/// missing conductance reading are cut.
pub fn conductance_cut(table: &DataTable, sc_col: &str, cutoff: f64) -> CutDataset {
    match table.column_index(sc_col) {
        Some(c) => CutDataset {
            table: table.filter_rows(|row| row.values[c].is_some_and(|v| v > cutoff)),
            applied: true,
        },
        None => {
            warn!(column = sc_col, "conductance column absent; cut dataset is the full record");
            CutDataset {
                table: table.clone(),
                applied: false,
            }
        }
    }
}

/// Percentage of `bursts` in which each column has strictly more than
/// `min_burst_len` valid samples. No bursts => 0.0 for every column.
pub fn completeness(table: &DataTable, bursts: &[Burst], min_burst_len: usize) -> Vec<(String, f64)> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(c, name)| {
            if bursts.is_empty() {
                return (name.clone(), 0.0);
            }
            let complete = bursts
                .iter()
                .filter(|b| {
                    let valid = b
                        .rows
                        .iter()
                        .filter(|&&r| table.rows[r].values[c].is_some())
                        .count();
                    valid > min_burst_len
                })
                .count();
            let pct = complete as f64 * 100.0 / bursts.len() as f64;
            (name.clone(), pct)
        })
        .collect()
}
