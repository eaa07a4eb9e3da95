// src/report/mod.rs
pub mod coverage;

use chrono::NaiveDateTime;
use std::fmt;

use crate::process::burst::Burst;
use crate::process::types::{DataTable, SensorRecord};

pub use coverage::{
    attribute_spans, column_spans, completeness, conductance_cut, ColumnSpan, CutDataset,
};

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Login name of the user running the reduction.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Extent of a record: first/last timestamps, row and burst counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSummary {
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub measurements: usize,
    pub bursts: usize,
}

impl RecordSummary {
    pub fn new(table: &DataTable, bursts: &[Burst]) -> Self {
        Self {
            first: table.first_timestamp(),
            last: table.last_timestamp(),
            measurements: table.len(),
            bursts: bursts.len(),
        }
    }
}

/// Everything the human-readable deployment log reports for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentLog {
    pub user_id: String,
    pub file_name: String,
    pub interval: u32,
    pub min_burst_len: usize,
    pub sc_cutoff: f64,
    pub full: RecordSummary,
    pub cut: RecordSummary,
    pub cut_applied: bool,
    pub rejected_rows: usize,
    pub sensors: Vec<SensorRecord>,
    /// Per-column completeness percentages, sorted by column name.
    pub completeness: Vec<(String, f64)>,
}

fn fmt_ts(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format(LOG_TIME_FORMAT).to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for DeploymentLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EXO DEPLOYMENT LOG")?;
        writeln!(f, "User: {}", self.user_id)?;
        writeln!(f, "Processed file: {}", self.file_name)?;
        writeln!(f, "Sample interval: {} minutes", self.interval)?;
        writeln!(
            f,
            "Minimum number of measurements in each burst: {}",
            self.min_burst_len
        )?;
        writeln!(f, "Specific conductance cutoff level: {}", self.sc_cutoff)?;
        if !self.cut_applied {
            writeln!(f, "Specific conductance column absent: no records cut")?;
        }

        writeln!(f, "~~~~~~~~~~~~~~~~~~~~~~ Deployment metadata ~~~~~~~~~~~~~~~~~~~~~~")?;
        writeln!(f, "First record timestamp: {}", fmt_ts(self.full.first))?;
        writeln!(f, "Last record timestamp: {}", fmt_ts(self.full.last))?;
        writeln!(f, "Starting number of measurements: {}", self.full.measurements)?;
        writeln!(f, "Rows dropped for unreadable timestamps: {}", self.rejected_rows)?;
        writeln!(f, "Number of bursts: {}", self.full.bursts)?;
        writeln!(f, "First cut record timestamp: {}", fmt_ts(self.cut.first))?;
        writeln!(f, "Last cut record timestamp: {}", fmt_ts(self.cut.last))?;
        writeln!(f, "Ending number of measurements: {}", self.cut.measurements)?;
        writeln!(f, "Number of cut bursts: {}", self.cut.bursts)?;
        writeln!(
            f,
            "Number of bursts cut from record: {}",
            self.full.bursts.saturating_sub(self.cut.bursts)
        )?;

        writeln!(f, "~~~~~~~~~~~~~~~~~~~~~~ Sensor metadata ~~~~~~~~~~~~~~~~~~~~~~~~~~")?;
        for s in &self.sensors {
            let name = &s.device_name;
            writeln!(f, "{} Serial Number: {}", name, s.serial_number)?;
            writeln!(f, "{} Firmware: {}", name, s.firmware_version)?;
            writeln!(
                f,
                "{} Corresponding Data Column(s): [{}]",
                name,
                s.data_columns.join(", ")
            )?;
            writeln!(f, "{} Start Datetime: {}", name, fmt_ts(s.start_time))?;
            writeln!(f, "{} End Datetime: {}", name, fmt_ts(s.end_time))?;
        }

        writeln!(f, "~~~~~~~~~~~~~~~~~~~~~~ Burst completeness data ~~~~~~~~~~~~~~~~~~")?;
        for (column, pct) in &self.completeness {
            writeln!(f, "{} burst completeness percentage: {:.2}", column, pct)?;
        }
        Ok(())
    }
}
