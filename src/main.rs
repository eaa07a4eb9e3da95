use anyhow::{Context, Result};
use burpro::{
    config::{RunParams, DEFAULT_CONFIG_PATH},
    logging::{init_logging, RunLog},
    output, process, report,
};
use chrono::Local;
use clap::Parser;
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};
use tracing::{error, info};

/// Exit code when a parameter file or the input list cannot be set up.
const EXIT_SETUP: u8 = 2;
/// Exit code when at least one input file failed.
const EXIT_FILE: u8 = 3;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reduce sonde burst records to one robust median per burst"
)]
struct Args {
    /// JSON run-parameter file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Export files, or directories to search for them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // ─── 1) parameters come first; nothing is read without them ─────
    let params = match RunParams::load(&args.config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("BurPro Setup Error: {} ({})", e, args.config.display());
            return ExitCode::from(EXIT_SETUP);
        }
    };

    // ─── 2) init logging ─────────────────────────────────────────────
    let run_log = RunLog::new();
    init_logging(&run_log);
    info!(config = %args.config.display(), "startup");

    // ─── 3) expand directories ───────────────────────────────────────
    let files = match output::discover_inputs(&args.inputs) {
        Ok(f) => f,
        Err(e) => {
            error!("BurPro Setup Error: {:#}", e);
            return ExitCode::from(EXIT_SETUP);
        }
    };
    info!("{} input file(s)", files.len());

    // ─── 4) one file at a time; a failure does not stop the batch ───
    let user = report::current_user();
    let mut failed = 0usize;
    for file in &files {
        let start = Instant::now();
        // each file's run log starts empty
        run_log.take();
        match run_file(file, &params, &user, &run_log) {
            Ok(written) => info!(
                file = %file.display(),
                artifacts = written.len(),
                elapsed = ?start.elapsed(),
                "done"
            ),
            Err(e) => {
                failed += 1;
                error!(file = %file.display(), "BurPro File Error: {:#}", e);
            }
        }
    }

    if failed > 0 {
        error!("{} of {} file(s) failed", failed, files.len());
        ExitCode::from(EXIT_FILE)
    } else {
        info!("all files processed");
        ExitCode::SUCCESS
    }
}

fn run_file(file: &Path, params: &RunParams, user: &str, run_log: &RunLog) -> Result<Vec<PathBuf>> {
    let deployment = process::process_file(file, params)
        .with_context(|| format!("processing {}", file.display()))?;
    info!(file = %file.display(), "processing finished; writing outputs");
    let (_, written) = output::publish_deployment(
        file,
        user,
        Local::now().naive_local(),
        &deployment,
        params,
        Some(run_log.take().as_str()),
    )?;
    Ok(written)
}
