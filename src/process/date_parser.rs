// src/process/date_parser.rs
//! Builds the timestamp index from the separate date and time cells of each
//! data row.
//!
//! Rows whose date/time pair does not parse are rejected one by one; they
//! never abort the file. The caller logs them and reports the count.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::BurstError;
use crate::grid::{excel_serial_to_datetime, Cell, RawGrid};

// `%Y` also takes a two-digit year, so the `%y` forms must come first.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%d-%b-%y", "%d-%b-%Y",
];
/// Text dates before this year are treated as unreadable.
const MIN_YEAR: i32 = 1900;
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Grid rows that produced a timestamp, in original order.
#[derive(Debug, Default)]
pub struct TimestampIndex {
    /// `(grid row, timestamp)` pairs.
    pub entries: Vec<(usize, NaiveDateTime)>,
    /// One `TimestampParse` per rejected row.
    pub rejected: Vec<BurstError>,
}

/// Index every non-blank row from `first_row` to the end of the grid.
///
/// `width` bounds the cells considered when deciding a row is blank padding.
pub fn index_rows(
    grid: &RawGrid,
    first_row: usize,
    width: usize,
    date_col: usize,
    time_col: usize,
) -> TimestampIndex {
    let mut index = TimestampIndex::default();
    for r in first_row..grid.n_rows() {
        if (0..width).all(|c| grid.cell(r, c).is_blank()) {
            continue;
        }
        let date = grid.cell(r, date_col);
        let time = grid.cell(r, time_col);
        match combine_date_time(date, time) {
            Some(ts) => index.entries.push((r, ts)),
            None => index.rejected.push(BurstError::TimestampParse {
                row: r,
                date: date.as_text(),
                time: time.as_text(),
            }),
        }
    }
    index
}

/// Date part of `date` joined with the time part of `time`.
pub fn combine_date_time(date: &Cell, time: &Cell) -> Option<NaiveDateTime> {
    Some(cell_date(date)?.and_time(cell_time(time)?))
}

/// Calendar date carried by a cell: a spreadsheet date, a serial day
/// number, or date-like text (anything after the first space is ignored).
pub fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Number(v) if *v >= 1.0 => excel_serial_to_datetime(*v).map(|dt| dt.date()),
        Cell::Text(s) => {
            let token = s.split_whitespace().next()?;
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
                .find(|d| d.year() >= MIN_YEAR)
        }
        _ => None,
    }
}

/// Time of day carried by a cell: a spreadsheet time (fraction of a day),
/// the time part of a date-time, or time-like text.
pub fn cell_time(cell: &Cell) -> Option<NaiveTime> {
    match cell {
        Cell::DateTime(dt) => Some(dt.time()),
        Cell::Number(v) if *v >= 0.0 => excel_serial_to_datetime(v.fract()).map(|dt| dt.time()),
        Cell::Text(s) => {
            let s = s.trim();
            let token = s.split_whitespace().last()?;
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(token, fmt).ok())
        }
        _ => None,
    }
}
