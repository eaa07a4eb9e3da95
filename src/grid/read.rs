// src/grid/read.rs
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, instrument};

use super::{excel_serial_to_datetime, Cell, RawGrid};
use crate::error::{BurstError, Result};

/// Spreadsheet extensions accepted as inputs (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "csv"];

/// Load the first worksheet (or the whole CSV file) as a headerless grid.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn read_grid(path: &Path) -> Result<RawGrid> {
    if !path.exists() {
        return Err(BurstError::InputNotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let grid = match ext.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xls" => read_workbook(path)?,
        _ => return Err(BurstError::UnsupportedInput(path.to_path_buf())),
    };
    debug!(rows = grid.n_rows(), "grid loaded");
    Ok(grid)
}

fn read_error(path: &Path, err: impl std::fmt::Display) -> BurstError {
    BurstError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn read_csv(path: &Path) -> Result<RawGrid> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // metadata rows are shorter than data rows
        .from_path(path)
        .map_err(|e| read_error(path, e))?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| read_error(path, format!("record {}: {}", idx, e)))?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(RawGrid::new(rows))
}

fn read_workbook(path: &Path) -> Result<RawGrid> {
    let mut workbook = open_workbook_auto(path).map_err(|e| read_error(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| read_error(path, "workbook has no worksheets"))?
        .map_err(|e| read_error(path, e))?;

    // keep absolute positions: calamine trims leading blank rows/columns
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }
    Ok(RawGrid::new(rows))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::DateTime)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::from_text(s)),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_csv_grid_is_ragged() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("export.csv");
        let mut f = std::fs::File::create(&path)?;
        writeln!(f, "KOR Export File")?;
        writeln!(f, "EXO2 Sonde,17C100001,2.0.0")?;
        writeln!(f, "Date (MM/DD/YYYY),Time (HH:MM:SS),Temp °C")?;
        writeln!(f, "05/01/2018,00:00:00,12.5")?;
        drop(f);

        let grid = read_grid(&path)?;
        assert_eq!(grid.n_rows(), 4);
        assert_eq!(grid.row(0).len(), 1);
        assert_eq!(grid.cell(3, 2), &Cell::Number(12.5));
        assert_eq!(grid.cell(1, 1).as_text(), "17C100001");
        Ok(())
    }

    #[test]
    fn test_missing_and_unsupported_inputs() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.xlsx");
        assert!(matches!(
            read_grid(&missing),
            Err(BurstError::InputNotFound(_))
        ));

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hello").unwrap();
        assert!(matches!(
            read_grid(&txt),
            Err(BurstError::UnsupportedInput(_))
        ));
    }
}
