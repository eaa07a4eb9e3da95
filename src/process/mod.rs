// src/process/mod.rs
pub mod burst;
pub mod columns;
pub mod date_parser;
pub mod header;
pub mod types;
pub mod utils;

use std::path::Path;
use tracing::{info, instrument, warn};

use crate::config::RunParams;
use crate::error::{BurstError, Result};
use crate::grid::{read_grid, RawGrid};
use crate::report::{self, DeploymentLog, RecordSummary};
use crate::stats::{self, MadTable};
use burst::BurstGrouper;
use columns::ColumnFilter;
use types::SensorRecord;

/// Everything produced for one input file, ready to be written.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub mad: MadTable,
    pub sensors: Vec<SensorRecord>,
    pub log: DeploymentLog,
}

/// Read `path` and reduce it.
#[instrument(level = "info", skip(params), fields(file = %path.display()))]
pub fn process_file(path: &Path, params: &RunParams) -> Result<Deployment> {
    if !path.exists() {
        return Err(BurstError::InputNotFound(path.to_path_buf()));
    }
    info!("reading input file");
    let grid = read_grid(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    process_grid(&grid, params, &file_name, &report::current_user())
}

/// Run the full reduction over an already-loaded grid.
///
/// Nothing is written here; a failure at any stage leaves no trace on disk.
pub fn process_grid(
    grid: &RawGrid,
    params: &RunParams,
    file_name: &str,
    user_id: &str,
) -> Result<Deployment> {
    // 1) locate the table and the sensor block above it
    let header_row = header::locate_header(grid, params.date_col())?;
    let entries = header::extract_sensor_block(grid, header_row, &params.sensor_marker);
    info!(header_row, sensors = entries.len(), "fetched file metadata");

    // 2) unique column names
    let column_names = columns::reconcile_columns(grid.row(header_row));
    let position = |name: &str| {
        column_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| BurstError::MissingColumn {
                name: name.to_string(),
            })
    };
    let date_idx = position(params.date_col())?;
    let time_idx = position(params.time_col())?;

    // 3) timestamp index; bad rows are dropped one at a time
    let index = date_parser::index_rows(
        grid,
        header_row + 1,
        column_names.len(),
        date_idx,
        time_idx,
    );
    for err in &index.rejected {
        warn!(%err, "dropping row");
    }
    if index.entries.is_empty() {
        return Err(BurstError::NoDataRows);
    }
    info!(
        rows = index.entries.len(),
        rejected = index.rejected.len(),
        "indexed data rows"
    );

    // 4) numeric tables: after the drop list (for spans), and fully filtered
    let raw = columns::build_table(grid, &column_names, &index);
    let filter = ColumnFilter::new(&params.drop_cols);
    let configured = filter.apply_configured(&raw);
    let numeric = filter.apply(&raw);

    let mut sensors: Vec<SensorRecord> = entries
        .iter()
        .map(|e| e.resolve(&column_names, &configured.columns))
        .collect();
    report::attribute_spans(&mut sensors, &report::column_spans(&configured));

    // 5) bursts over the full and the cut record, on the same boundaries
    let grouper = BurstGrouper::for_table(&numeric, params.interval).ok_or(BurstError::NoDataRows)?;
    let bursts = grouper.group(&numeric);
    let cut = report::conductance_cut(&numeric, &params.sc_col, params.sc_cutoff);
    let cut_bursts = grouper.group(&cut.table);
    info!(bursts = bursts.len(), cut_bursts = cut_bursts.len(), "grouped bursts");

    let mut completeness = report::completeness(&cut.table, &cut_bursts, params.min_burst_len);
    completeness.sort_by(|a, b| a.0.cmp(&b.0));

    // 6) MAD reduction
    info!(columns = numeric.columns.len(), "calculating MAD");
    let mad = if params.mad_on_cut {
        stats::reduce_bursts(&cut.table, &cut_bursts, params.mad_criteria, &params.index_timezone)
    } else {
        stats::reduce_bursts(&numeric, &bursts, params.mad_criteria, &params.index_timezone)
    };

    let log = DeploymentLog {
        user_id: user_id.to_string(),
        file_name: file_name.to_string(),
        interval: params.interval,
        min_burst_len: params.min_burst_len,
        sc_cutoff: params.sc_cutoff,
        full: RecordSummary::new(&numeric, &bursts),
        cut: RecordSummary::new(&cut.table, &cut_bursts),
        cut_applied: cut.applied,
        rejected_rows: index.rejected.len(),
        sensors: sensors.clone(),
        completeness,
    };

    Ok(Deployment { mad, sensors, log })
}
