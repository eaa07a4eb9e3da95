// src/output/mod.rs
//! Input discovery, output directory naming and artifact writing.
//!
//! Artifacts for one input are staged as `.tmp` files and renamed into
//! place only once every one of them has been written; a failure removes the
//! staged files and leaves the output directory as it was.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use glob::{glob, Pattern};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::config::RunParams;
use crate::grid::read::SUPPORTED_EXTENSIONS;
use crate::process::types::{timestamp_format, SensorRecord};
use crate::process::Deployment;
use crate::report::DeploymentLog;
use crate::stats::MadTable;

/// Written in place of "no value" where a format has no blank cell.
pub const NULL_SENTINEL: f64 = -9999.0;

/// Marker in the file name of reduced outputs; such files are never inputs.
const DERIVED_MARKER: &str = "mad";

/// Spreadsheet files that are not earlier reduction outputs.
pub fn is_candidate_input(path: &Path) -> bool {
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    let derived = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains(DERIVED_MARKER))
        .unwrap_or(true);
    supported && !derived
}

/// Expand directories (recursively) into candidate spreadsheets; plain
/// paths pass through untouched so a missing file is reported later.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let pattern = format!("{}/**/*", Pattern::escape(&path.to_string_lossy()));
        let mut found: Vec<PathBuf> = glob(&pattern)
            .with_context(|| format!("Failed to parse glob pattern: {}", pattern))?
            .filter_map(|p| p.ok())
            .filter(|p| p.is_file() && is_candidate_input(p))
            .collect();
        found.sort();
        if found.is_empty() {
            warn!(dir = %path.display(), "no spreadsheet files found");
        }
        info!(dir = %path.display(), count = found.len(), "expanded input directory");
        files.extend(found);
    }
    Ok(files)
}

pub fn output_dir_name(user: &str, now: NaiveDateTime) -> String {
    format!("BurPro_{}_{}", user, now.format("%Y%m%dT%H%M%S"))
}

/// Create the run directory next to `input`, suffixing `_1`, `_2`, ... if
/// the name is taken.
pub fn create_output_dir(input: &Path, user: &str, now: NaiveDateTime) -> Result<PathBuf> {
    let base = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = output_dir_name(user, now);
    let mut dir = base.join(&name);
    let mut n = 0;
    while dir.exists() {
        n += 1;
        dir = base.join(format!("{}_{}", name, n));
    }
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    info!(dir = %dir.display(), "writing output");
    Ok(dir)
}

struct Staged {
    tmp: PathBuf,
    dest: PathBuf,
}

fn stage<F>(dest: PathBuf, write: F) -> Result<Staged>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dest.with_file_name(format!(".{}.tmp", file_name));
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e.context(format!("writing {}", dest.display())));
    }
    debug!(path = %tmp.display(), "staged");
    Ok(Staged { tmp, dest })
}

/// Create the run directory for `input` and write its artifacts there. On
/// failure the directory is removed again.
pub fn publish_deployment(
    input: &Path,
    user: &str,
    now: NaiveDateTime,
    deployment: &Deployment,
    params: &RunParams,
    run_log: Option<&str>,
) -> Result<(PathBuf, Vec<PathBuf>)> {
    let out_dir = create_output_dir(input, user, now)?;
    match write_deployment(&out_dir, input, deployment, params, run_log) {
        Ok(written) => Ok((out_dir, written)),
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&out_dir) {
                warn!(dir = %out_dir.display(), %cleanup, "could not remove output directory");
            }
            Err(e)
        }
    }
}

/// Write every artifact for `deployment` into `out_dir`, plus `run_log` as
/// `<stem>_burpro.log` when given. Returns the final paths.
///
/// Either every artifact ends up in place or none does.
pub fn write_deployment(
    out_dir: &Path,
    input: &Path,
    deployment: &Deployment,
    params: &RunParams,
    run_log: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "burst".to_string());

    let mut staged = Vec::new();
    if let Err(e) = stage_all(out_dir, &stem, deployment, params, run_log, &mut staged) {
        for s in &staged {
            let _ = fs::remove_file(&s.tmp);
        }
        return Err(e);
    }

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (i, s) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(&s.tmp, &s.dest) {
            for done in &written {
                let _ = fs::remove_file(done);
            }
            for rest in &staged[i..] {
                let _ = fs::remove_file(&rest.tmp);
            }
            return Err(anyhow::Error::new(e).context(format!(
                "renaming {} -> {}",
                s.tmp.display(),
                s.dest.display()
            )));
        }
        written.push(s.dest.clone());
    }
    info!(files = written.len(), "output written");
    Ok(written)
}

fn stage_all(
    out_dir: &Path,
    stem: &str,
    deployment: &Deployment,
    params: &RunParams,
    run_log: Option<&str>,
    staged: &mut Vec<Staged>,
) -> Result<()> {
    staged.push(stage(out_dir.join(format!("{}_mad.xlsx", stem)), |p| {
        write_mad_xlsx(p, &deployment.mad)
    })?);
    if params.write_csv {
        staged.push(stage(out_dir.join(format!("{}_mad.csv", stem)), |p| {
            write_mad_csv(p, &deployment.mad)
        })?);
    }
    staged.push(stage(
        out_dir.join(format!("{}_EXOdevices.json", stem)),
        |p| write_devices_json(p, &deployment.sensors),
    )?);
    staged.push(stage(
        out_dir.join(format!("{}_deployment.log", stem)),
        |p| write_deployment_log(p, &deployment.log),
    )?);
    if let Some(text) = run_log {
        staged.push(stage(out_dir.join(format!("{}_burpro.log", stem)), |p| {
            fs::write(p, text)?;
            Ok(())
        })?);
    }
    Ok(())
}

/// Reduced table as a worksheet: index label + column names on row 0, one
/// row per burst, blank cells for "no value".
pub fn write_mad_xlsx(path: &Path, mad: &MadTable) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let sheet = workbook.add_worksheet();
    sheet.write_string_with_format(0, 0, mad.index_name.as_str(), &bold)?;
    sheet.set_column_width(0, 20)?;
    for (c, name) in mad.columns.iter().enumerate() {
        let col = ColNum::try_from(c + 1).context("too many columns for a worksheet")?;
        sheet.write_string_with_format(0, col, name.as_str(), &bold)?;
    }
    for (r, row) in mad.rows.iter().enumerate() {
        let r = RowNum::try_from(r + 1).context("too many bursts for a worksheet")?;
        sheet.write_datetime_with_format(r, 0, &row.label, &stamp)?;
        for (c, value) in row.values.iter().enumerate() {
            if let Some(v) = value {
                sheet.write_number(r, (c + 1) as ColNum, *v)?;
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Reduced table as CSV; "no value" becomes [`NULL_SENTINEL`].
pub fn write_mad_csv(path: &Path, mad: &MadTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let header: Vec<&str> = std::iter::once(mad.index_name.as_str())
        .chain(mad.columns.iter().map(String::as_str))
        .collect();
    wtr.write_record(&header)?;
    for row in &mad.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.label.format(timestamp_format::FORMAT).to_string());
        record.extend(
            row.values
                .iter()
                .map(|v| v.unwrap_or(NULL_SENTINEL).to_string()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_devices_json(path: &Path, sensors: &[SensorRecord]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, sensors)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub fn write_deployment_log(path: &Path, log: &DeploymentLog) -> Result<()> {
    fs::write(path, log.to_string())?;
    Ok(())
}
