// src/process/burst.rs
//! Groups rows into fixed-width time buckets ("bursts").
//!
//! Bucket boundaries are aligned to midnight of the deployment's first day.
//! Bursts come out in the order their buckets are first met while walking
//! the rows; the rows are never sorted.

use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

use crate::process::types::DataTable;

/// Rows sharing one bucket, identified by the bucket start.
#[derive(Debug, Clone, PartialEq)]
pub struct Burst {
    pub label: NaiveDateTime,
    /// Row positions in the source table, in original order.
    pub rows: Vec<usize>,
}

impl Burst {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BurstGrouper {
    origin: NaiveDateTime,
    width: Duration,
}

impl BurstGrouper {
    pub fn new(origin: NaiveDateTime, interval_minutes: u32) -> Self {
        Self {
            origin,
            width: Duration::minutes(i64::from(interval_minutes.max(1))),
        }
    }

    /// Grouper aligned to midnight of the table's first row. `None` for an
    /// empty table.
    pub fn for_table(table: &DataTable, interval_minutes: u32) -> Option<Self> {
        let first = table.first_timestamp()?;
        let origin = first.date().and_hms_opt(0, 0, 0)?;
        Some(Self::new(origin, interval_minutes))
    }

    /// Start of the bucket containing `ts`.
    pub fn bucket_label(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let width = self.width.num_seconds();
        let offset = (ts - self.origin).num_seconds();
        self.origin + Duration::seconds(offset.div_euclid(width) * width)
    }

    pub fn group(&self, table: &DataTable) -> Vec<Burst> {
        let mut slots: HashMap<NaiveDateTime, usize> = HashMap::new();
        let mut bursts: Vec<Burst> = Vec::new();
        for (pos, row) in table.rows.iter().enumerate() {
            let label = self.bucket_label(row.timestamp);
            let slot = *slots.entry(label).or_insert_with(|| {
                bursts.push(Burst {
                    label,
                    rows: Vec::new(),
                });
                bursts.len() - 1
            });
            bursts[slot].rows.push(pos);
        }
        bursts
    }
}

/// Group `table` with buckets aligned to its own first day.
pub fn group_bursts(table: &DataTable, interval_minutes: u32) -> Vec<Burst> {
    BurstGrouper::for_table(table, interval_minutes)
        .map(|g| g.group(table))
        .unwrap_or_default()
}
