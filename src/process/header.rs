// src/process/header.rs
//! Locates the data table inside the raw grid and reads the sensor
//! metadata block that precedes it.
//!
//! Layout of a sonde export, top to bottom:
//!   - free-form preamble
//!   - metadata block: one row per sensor, starting at the row whose
//!     column 0 is the sonde model marker, ending two rows above the header
//!   - header row: column 0 equals the date-column label
//!   - data rows

use tracing::warn;

use crate::error::{BurstError, Result};
use crate::grid::{Cell, RawGrid};
use crate::process::types::SensorRecord;

/// Rows between the end of the metadata block and the header row.
const BLOCK_GAP: usize = 2;

/// Index of the first row whose column 0 equals `date_literal`.
pub fn locate_header(grid: &RawGrid, date_literal: &str) -> Result<usize> {
    let wanted = date_literal.trim();
    (0..grid.n_rows())
        .find(|&r| matches_label(grid.cell(r, 0), wanted))
        .ok_or_else(|| BurstError::HeaderNotFound {
            literal: date_literal.to_string(),
        })
}

/// Index of the first row whose column 0 equals `marker`, searching above
/// `limit` only.
pub fn locate_marker(grid: &RawGrid, marker: &str, limit: usize) -> Option<usize> {
    let wanted = marker.trim();
    (0..limit.min(grid.n_rows())).find(|&r| matches_label(grid.cell(r, 0), wanted))
}

fn matches_label(cell: &Cell, wanted: &str) -> bool {
    match cell {
        Cell::Text(s) => s.trim() == wanted,
        Cell::Number(_) => cell.as_text() == wanted,
        _ => false,
    }
}

/// A sensor row straight from the metadata block, before its data columns
/// are resolved to names.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEntry {
    pub device_name: String,
    pub serial_number: String,
    pub firmware_version: String,
    /// 0-based grid column indices of the sensor's data columns.
    pub column_indices: Vec<usize>,
}

impl SensorEntry {
    /// Resolve column indices against the reconciled header, keeping only
    /// names present in `surviving`. Indices past the header are ignored.
    pub fn resolve(&self, columns: &[String], surviving: &[String]) -> SensorRecord {
        let data_columns = self
            .column_indices
            .iter()
            .filter_map(|&i| {
                let name = columns.get(i);
                if name.is_none() {
                    warn!(
                        device = %self.device_name,
                        column = i + 1,
                        width = columns.len(),
                        "data column reference past the header row; ignored"
                    );
                }
                name
            })
            .filter(|name| surviving.contains(name))
            .cloned()
            .collect();
        SensorRecord {
            data_columns,
            device_name: self.device_name.clone(),
            end_time: None,
            firmware_version: self.firmware_version.clone(),
            serial_number: self.serial_number.clone(),
            start_time: None,
        }
    }
}

/// Read the metadata block `[marker_row, header_row - 2)`.
///
/// A missing marker yields an empty block; metadata reporting is then
/// skipped by the caller.
pub fn extract_sensor_block(grid: &RawGrid, header_row: usize, marker: &str) -> Vec<SensorEntry> {
    let end = header_row.saturating_sub(BLOCK_GAP);
    let Some(start) = locate_marker(grid, marker, end) else {
        warn!(marker, "sensor marker not found; no sensor metadata");
        return Vec::new();
    };

    (start..end)
        .map(|r| SensorEntry {
            device_name: grid.cell(r, 0).as_text(),
            serial_number: grid.cell(r, 1).as_text(),
            firmware_version: grid.cell(r, 2).as_text(),
            column_indices: parse_column_list(grid.cell(r, 3), r),
        })
        .collect()
}

/// Parse a `;`-separated list of 1-based column numbers. A single column
/// may come through as a plain number cell.
fn parse_column_list(cell: &Cell, row: usize) -> Vec<usize> {
    let text = match cell {
        Cell::Text(s) => s.clone(),
        Cell::Number(_) => cell.as_text(),
        _ => return Vec::new(),
    };
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<usize>() {
            Ok(n) if n >= 1 => Some(n - 1),
            _ => {
                warn!(row, entry = s, "ignoring invalid data column reference");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RunLog;

    fn export() -> RawGrid {
        RawGrid::from_text_rows(vec![
            vec!["KOR Export File"],
            vec![""],
            vec!["EXO2 Sonde", "17C100001", "2.0.0"],
            vec!["Conductivity/Temp", "17C100002", "2.1", "4;5"],
            vec!["pH", "1234", "1.3", "6"],
            vec![""],
            vec!["Column data"],
            vec!["Date (MM/DD/YYYY)", "Time (HH:MM:SS)", "Site Name", "Temp °C"],
            vec!["05/01/2018", "00:00:00", "A", "12.1"],
        ])
    }

    #[test]
    fn test_locate_header_returns_row_index() {
        assert_eq!(locate_header(&export(), "Date (MM/DD/YYYY)").unwrap(), 7);
    }

    #[test]
    fn test_locate_header_missing_literal() {
        let err = locate_header(&export(), "Date (DD/MM/YYYY)").unwrap_err();
        assert!(matches!(err, BurstError::HeaderNotFound { .. }));
    }

    #[test]
    fn test_sensor_block_spans_marker_to_gap() {
        let block = extract_sensor_block(&export(), 7, "EXO2 Sonde");
        assert_eq!(block.len(), 3);
        assert_eq!(block[0].device_name, "EXO2 Sonde");
        assert!(block[0].column_indices.is_empty());
        assert_eq!(block[1].serial_number, "17C100002");
        assert_eq!(block[1].column_indices, vec![3, 4]);
        // numeric serial and single numeric column reference
        assert_eq!(block[2].serial_number, "1234");
        assert_eq!(block[2].column_indices, vec![5]);
    }

    #[test]
    fn test_absent_marker_gives_empty_block() {
        assert!(extract_sensor_block(&export(), 7, "EXO3 Sonde").is_empty());
    }

    #[test]
    fn test_resolve_keeps_surviving_columns() {
        let entry = SensorEntry {
            device_name: "Conductivity/Temp".into(),
            serial_number: "17C100002".into(),
            firmware_version: "2.1".into(),
            column_indices: vec![0, 3, 9],
        };
        let columns: Vec<String> = ["Date", "Time", "Site", "Temp °C"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let surviving = vec!["Temp °C".to_string()];
        let record = entry.resolve(&columns, &surviving);
        assert_eq!(record.data_columns, vec!["Temp °C"]);
        assert_eq!(record.start_time, None);
    }

    #[test]
    fn test_reference_past_header_is_ignored_with_warning() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["EXO2 Sonde", "17C100001", "2.0.0"],
            vec!["Conductivity/Temp", "17C100002", "2.1", "4;99"],
            vec![""],
            vec![""],
            vec!["Date (MM/DD/YYYY)", "Time (HH:MM:SS)", "Site Name", "Temp °C"],
        ]);
        let block = extract_sensor_block(&grid, 4, "EXO2 Sonde");
        assert_eq!(block[1].column_indices, vec![3, 98]);

        let columns: Vec<String> = grid.row(4).iter().map(Cell::as_text).collect();
        let log = RunLog::new();
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_ansi(false)
            .with_writer(log.clone())
            .finish();
        let record = tracing::subscriber::with_default(subscriber, || {
            block[1].resolve(&columns, &columns)
        });
        assert_eq!(record.data_columns, vec!["Temp °C"]);
        let text = log.take();
        assert!(text.contains("past the header row"));
        assert!(text.contains("column=99"));
    }
}
