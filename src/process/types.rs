// src/process/types.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One sensor (or the sonde body) listed in the export's metadata block.
///
/// Field order matches the key order of the devices JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(rename = "Corresponding Data Column(s)")]
    pub data_columns: Vec<String>,
    #[serde(rename = "Device Name")]
    pub device_name: String,
    #[serde(rename = "End time", with = "timestamp_format")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(rename = "Firmware Version")]
    pub firmware_version: String,
    #[serde(rename = "Serial Number")]
    pub serial_number: String,
    #[serde(rename = "Start time", with = "timestamp_format")]
    pub start_time: Option<NaiveDateTime>,
}

/// `%Y-%m-%d %H:%M:%S` (or null) for optional timestamps.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// A data row keyed by its reconstructed timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub timestamp: NaiveDateTime,
    /// One slot per table column; `None` is a missing reading.
    pub values: Vec<Option<f64>>,
}

/// Rows in original export order (timestamps are not necessarily sorted)
/// with a value slot for every column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl DataTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Project onto the columns at `keep`, in that order.
    pub fn select(&self, keep: &[usize]) -> DataTable {
        DataTable {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| DataRow {
                    timestamp: row.timestamp,
                    values: keep.iter().map(|&i| row.values[i]).collect(),
                })
                .collect(),
        }
    }

    /// Keep the rows matching `pred`, preserving order.
    pub fn filter_rows<F>(&self, pred: F) -> DataTable
    where
        F: Fn(&DataRow) -> bool,
    {
        DataTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// Values of column `col` at the given row positions.
    pub fn column_values(&self, col: usize, rows: &[usize]) -> Vec<Option<f64>> {
        rows.iter().map(|&r| self.rows[r].values[col]).collect()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.last().map(|r| r.timestamp)
    }
}
