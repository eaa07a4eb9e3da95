// src/grid/mod.rs
//! Headerless cell grid as read from a sonde export.
//!
//! The grid is immutable once loaded; every later stage reads cells by
//! position and builds its own derived tables.

pub mod read;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;

pub use read::read_grid;

const LAST_SECOND_OF_DAY: i64 = 86_399;

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    /// Spreadsheet date/time value. Time-only cells land on 1899-12-30.
    DateTime(NaiveDateTime),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Classify a raw text field the way a spreadsheet would.
    pub fn from_text(raw: &str) -> Self {
        let cleaned = crate::process::utils::clean_str(raw);
        if cleaned.is_empty() {
            return Cell::Empty;
        }
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(cleaned),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for labels, serial numbers and diagnostics.
    ///
    /// Integral numbers render without a fractional part so that a serial
    /// number stored as `1234.0` reads back as `1234`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(v) => format_number(*v),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Numeric coercion: numbers pass through, numeric text is parsed,
    /// everything else is missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// Convert a spreadsheet serial day number (1900 date system) to a
/// timestamp, rounded to the nearest second.
///
/// A serial below 1 is a bare time of day and never rounds past 23:59:59.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let mut seconds = (serial * 86_400.0).round() as i64;
    if serial < 1.0 {
        seconds = seconds.min(LAST_SECOND_OF_DAY);
    }
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Ordered rows of cells, 0-indexed, possibly ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from text fields, classifying each one with
    /// [`Cell::from_text`].
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::from_text(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, r: usize) -> &[Cell] {
        self.rows.get(r).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell at `(r, c)`; anything outside the grid reads as empty.
    pub fn cell(&self, r: usize, c: usize) -> &Cell {
        self.rows.get(r).and_then(|row| row.get(c)).unwrap_or(&EMPTY)
    }
}
