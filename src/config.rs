// src/config.rs
//! Run parameters, read from a JSON file before any input is opened.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path};

use crate::error::{BurstError, Result};

/// Key some parameter files wrap the parameter object under.
pub const PARAMS_NAMESPACE: &str = "gov.usgs.cawsc.bgctech.burpro";

pub const DEFAULT_CONFIG_PATH: &str = "config/run_params.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunParams {
    /// Columns excluded from reduction. Entry 0 is the date column (and the
    /// header-row label), entry 1 the time column.
    pub drop_cols: Vec<String>,
    /// Label of the output time index, e.g. `"Datetime (PST)"`.
    pub index_timezone: String,
    /// Burst length in minutes.
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_mad_criteria")]
    pub mad_criteria: f64,
    /// Specific-conductance column used for the cut dataset.
    #[serde(default = "default_sc_col")]
    pub sc_col: String,
    #[serde(default = "default_sc_cutoff")]
    pub sc_cutoff: f64,
    /// A burst is complete when it has more valid samples than this.
    #[serde(default = "default_min_burst_len")]
    pub min_burst_len: usize,
    /// Column-0 label of the first sensor row in the metadata block.
    #[serde(default = "default_sensor_marker")]
    pub sensor_marker: String,
    /// Reduce only the bursts that pass the conductance cut.
    #[serde(default)]
    pub mad_on_cut: bool,
    /// Also write the reduced table as CSV.
    #[serde(default)]
    pub write_csv: bool,
}

fn default_interval() -> u32 {
    15
}
fn default_mad_criteria() -> f64 {
    crate::stats::DEFAULT_CRITERIA
}
fn default_sc_col() -> String {
    "SpCond µS/cm".to_string()
}
fn default_sc_cutoff() -> f64 {
    60.0
}
fn default_min_burst_len() -> usize {
    20
}
fn default_sensor_marker() -> String {
    "EXO2 Sonde".to_string()
}

impl RunParams {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            BurstError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Parse either the bare parameter object or one wrapped under
    /// [`PARAMS_NAMESPACE`], then validate it.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut doc: Value = serde_json::from_str(text)
            .map_err(|e| BurstError::Config(format!("malformed JSON: {}", e)))?;
        if let Some(inner) = doc.get_mut(PARAMS_NAMESPACE).map(Value::take) {
            doc = inner;
        }
        let params: RunParams = serde_json::from_value(doc)
            .map_err(|e| BurstError::Config(format!("invalid parameters: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.drop_cols.len() < 2 {
            return Err(BurstError::Config(
                "drop_cols must name at least the date and time columns".into(),
            ));
        }
        if self.drop_cols[..2].iter().any(|c| c.trim().is_empty()) {
            return Err(BurstError::Config(
                "drop_cols date/time entries must not be blank".into(),
            ));
        }
        if !(15..=60).contains(&self.interval) {
            return Err(BurstError::Config(format!(
                "interval must be within 15..=60 minutes, got {}",
                self.interval
            )));
        }
        if !(2.0..=3.0).contains(&self.mad_criteria) {
            return Err(BurstError::Config(format!(
                "mad_criteria must be within 2..=3, got {}",
                self.mad_criteria
            )));
        }
        if !self.sc_cutoff.is_finite() {
            return Err(BurstError::Config("sc_cutoff must be a finite number".into()));
        }
        Ok(())
    }

    pub fn date_col(&self) -> &str {
        &self.drop_cols[0]
    }

    pub fn time_col(&self) -> &str {
        &self.drop_cols[1]
    }
}
