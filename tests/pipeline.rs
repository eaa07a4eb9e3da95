use anyhow::Result;
use burpro::{
    grid::{read_grid, Cell},
    output, process_file, RunParams,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

const HEADER: [&str; 7] = [
    "Date (MM/DD/YYYY)",
    "Time (HH:MM:SS)",
    "Site Name",
    "SpCond µS/cm",
    "Temp °C",
    "SpCond µS/cm",
    "Temp °C",
];

const PARAMS: &str = r#"{
    "gov.usgs.cawsc.bgctech.burpro": {
        "drop_cols": ["Date (MM/DD/YYYY)", "Time (HH:MM:SS)", "Site Name"],
        "index_timezone": "Datetime (PST)",
        "sensor_marker": "Conductivity/Temp",
        "write_csv": true
    }
}"#;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Two hours of 1 Hz bursts, 25 samples every 15 minutes. The first sensor
/// reports during the first hour, its replacement during the second.
fn samples() -> Vec<(NaiveDateTime, [Option<f64>; 4])> {
    let mut out = Vec::new();
    for burst in 0..8i64 {
        for s in 0..25i64 {
            let ts = start() + Duration::minutes(burst * 15) + Duration::seconds(s);
            let temp = if burst == 0 && s == 0 { 40.0 } else { 12.0 };
            let values = if burst < 4 {
                [Some(100.0), Some(temp), None, None]
            } else {
                [None, None, Some(100.0), Some(13.0)]
            };
            out.push((ts, values));
        }
    }
    out
}

fn fmt_value(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv_export(path: &Path) -> Result<()> {
    let mut f = fs::File::create(path)?;
    writeln!(f, "KOR Export File")?;
    writeln!(f, ",")?;
    writeln!(f, "Conductivity/Temp,17C100002,2.1,4;5")?;
    writeln!(f, "Conductivity/Temp,17C100003,2.1,6;7")?;
    writeln!(f, ",")?;
    writeln!(f, "Column data")?;
    writeln!(f, "{}", HEADER.join(","))?;
    for (ts, values) in samples() {
        let fields: Vec<String> = values.iter().map(|v| fmt_value(*v)).collect();
        writeln!(
            f,
            "{},{},Delta,{}",
            ts.format("%m/%d/%Y"),
            ts.format("%H:%M:%S"),
            fields.join(",")
        )?;
    }
    // a row whose time cannot be read is dropped, not fatal
    writeln!(f, "05/01/2018,??,Delta,100,12,,")?;
    Ok(())
}

fn write_xlsx_export(path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("mm/dd/yyyy");
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "KOR Export File")?;
    sheet.write_string(2, 0, "Conductivity/Temp")?;
    sheet.write_string(2, 1, "17C100002")?;
    sheet.write_string(2, 2, "2.1")?;
    sheet.write_string(2, 3, "4;5")?;
    sheet.write_string(3, 0, "Conductivity/Temp")?;
    sheet.write_string(3, 1, "17C100003")?;
    sheet.write_string(3, 2, "2.1")?;
    sheet.write_string(3, 3, "6;7")?;
    sheet.write_string(5, 0, "Column data")?;
    for (c, name) in HEADER.iter().enumerate() {
        sheet.write_string(6, c as u16, *name)?;
    }
    for (i, (ts, values)) in samples().into_iter().enumerate() {
        let r = 7 + i as u32;
        sheet.write_datetime_with_format(r, 0, &ts.date().and_hms_opt(0, 0, 0).unwrap(), &date_format)?;
        sheet.write_string(r, 1, ts.format("%H:%M:%S").to_string())?;
        sheet.write_string(r, 2, "Delta")?;
        for (c, v) in values.iter().enumerate() {
            if let Some(v) = v {
                sheet.write_number(r, 3 + c as u16, *v)?;
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

fn run(input: &Path, params: &RunParams) -> Result<(PathBuf, Vec<PathBuf>)> {
    let deployment = process_file(input, params)?;
    let out_dir = output::create_output_dir(input, "tester", start())?;
    let written = output::write_deployment(&out_dir, input, &deployment, params, None)?;
    Ok((out_dir, written))
}

#[test]
fn test_csv_export_with_sensor_swap() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let input = dir.path().join("delta_2018.csv");
    write_csv_export(&input)?;
    let params = RunParams::from_json_str(PARAMS)?;

    let deployment = process_file(&input, &params)?;

    // duplicate (digit-suffixed) columns stay out of the reduced table
    assert_eq!(deployment.mad.columns, vec!["SpCond µS/cm", "Temp °C"]);
    assert_eq!(deployment.mad.rows.len(), 8);
    assert_eq!(deployment.mad.rows[0].label, start());
    assert_eq!(deployment.mad.value(0, "Temp °C"), Some(12.0));
    assert_eq!(deployment.mad.value(3, "SpCond µS/cm"), Some(100.0));
    assert_eq!(deployment.mad.value(4, "SpCond µS/cm"), None);
    assert_eq!(
        deployment.mad.rows[7].label,
        start() + Duration::minutes(105)
    );

    let sensors = &deployment.sensors;
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].data_columns, vec!["SpCond µS/cm", "Temp °C"]);
    assert_eq!(sensors[0].start_time, Some(start()));
    assert_eq!(
        sensors[0].end_time,
        Some(start() + Duration::minutes(45) + Duration::seconds(24))
    );
    assert_eq!(sensors[1].serial_number, "17C100003");
    assert_eq!(sensors[1].data_columns, vec!["SpCond µS/cm.1", "Temp °C.1"]);
    assert_eq!(sensors[1].start_time, Some(start() + Duration::hours(1)));

    let log = &deployment.log;
    assert_eq!(log.full.measurements, 200);
    assert_eq!(log.full.bursts, 8);
    assert_eq!(log.cut.bursts, 4);
    assert_eq!(log.rejected_rows, 1);
    assert_eq!(
        log.completeness,
        vec![
            ("SpCond µS/cm".to_string(), 100.0),
            ("Temp °C".to_string(), 100.0)
        ]
    );

    let (out_dir, written) = run(&input, &params)?;
    assert_eq!(written.len(), 4);
    assert!(out_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("BurPro_tester_"));

    let csv_text = fs::read_to_string(out_dir.join("delta_2018_mad.csv"))?;
    let mut lines = csv_text.lines();
    assert_eq!(lines.next(), Some("Datetime (PST),SpCond µS/cm,Temp °C"));
    assert_eq!(lines.next(), Some("2018-05-01 00:00:00,100,12"));
    assert_eq!(lines.last(), Some("2018-05-01 01:45:00,-9999,-9999"));

    let log_text = fs::read_to_string(out_dir.join("delta_2018_deployment.log"))?;
    assert!(log_text.contains("Number of bursts: 8"));
    assert!(log_text.contains("Temp °C burst completeness percentage: 100.00"));

    let devices: serde_json::Value = serde_json::from_str(&fs::read_to_string(
        out_dir.join("delta_2018_EXOdevices.json"),
    )?)?;
    assert_eq!(devices[1]["Start time"], "2018-05-01 01:00:00");
    assert_eq!(devices[1]["End time"], "2018-05-01 01:45:24");

    // a second pass must not pick up the reduced output as an input
    let found = output::discover_inputs(&[dir.path().to_path_buf()])?;
    assert_eq!(found, vec![input]);
    Ok(())
}

#[test]
fn test_xlsx_round_trip() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let input = dir.path().join("delta_2018.xlsx");
    write_xlsx_export(&input)?;
    let params = RunParams::from_json_str(PARAMS)?;

    let (out_dir, _) = run(&input, &params)?;
    let grid = read_grid(&out_dir.join("delta_2018_mad.xlsx"))?;
    assert_eq!(grid.n_rows(), 9);
    assert_eq!(grid.cell(0, 0).as_text(), "Datetime (PST)");
    assert_eq!(grid.cell(0, 2).as_text(), "Temp °C");
    assert_eq!(grid.cell(1, 0), &Cell::DateTime(start()));
    assert_eq!(grid.cell(1, 1), &Cell::Number(100.0));
    assert_eq!(grid.cell(1, 2), &Cell::Number(12.0));
    assert!(grid.cell(8, 1).is_blank());
    Ok(())
}

#[test]
fn test_cli_exit_codes() -> Result<()> {
    let dir = tempdir()?;
    let config = dir.path().join("params.json");
    let input = dir.path().join("delta_2018.csv");
    write_csv_export(&input)?;

    // parameters missing: setup error
    let status = Command::new(env!("CARGO_BIN_EXE_burpro"))
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .status()?;
    assert_eq!(status.code(), Some(2));

    fs::write(&config, PARAMS)?;
    let status = Command::new(env!("CARGO_BIN_EXE_burpro"))
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .status()?;
    assert_eq!(status.code(), Some(0));

    // one bad file fails the batch with a file error
    let status = Command::new(env!("CARGO_BIN_EXE_burpro"))
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .arg(dir.path().join("missing.csv"))
        .status()?;
    assert_eq!(status.code(), Some(3));
    Ok(())
}

#[test]
fn test_cli_writes_run_log() -> Result<()> {
    let dir = tempdir()?;
    let config = dir.path().join("params.json");
    fs::write(&config, PARAMS)?;
    let input = dir.path().join("delta_2018.csv");
    write_csv_export(&input)?;

    let status = Command::new(env!("CARGO_BIN_EXE_burpro"))
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .status()?;
    assert_eq!(status.code(), Some(0));

    let out_dirs: Vec<PathBuf> = fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    assert_eq!(out_dirs.len(), 1);
    let out_dir = &out_dirs[0];
    assert_eq!(fs::read_dir(out_dir)?.count(), 5);

    let run_log = fs::read_to_string(out_dir.join("delta_2018_burpro.log"))?;
    assert!(run_log.contains("indexed data rows"));
    assert!(run_log.contains("grouped bursts"));
    assert!(run_log.contains("dropping row"));
    // lines from before the file started belong to no run log
    assert!(!run_log.contains("startup"));
    Ok(())
}
