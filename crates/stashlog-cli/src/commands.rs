//! Subcommand implementations

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Serialize;
use stashlog::{FileStore, Record, RecordValue, WindowedLog};
use tracing::{debug, info};

use crate::config::{Cli, Command, LogKind, Settings};

/// A record value that can be typed on the command line
pub trait CliValue: RecordValue + Serialize + fmt::Display {
    /// Parse a command-line argument
    fn parse_arg(arg: &str) -> anyhow::Result<Self>;
}

impl CliValue for bool {
    fn parse_arg(arg: &str) -> anyhow::Result<Self> {
        match arg.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Ok(true),
            "false" | "0" | "off" => Ok(false),
            _ => bail!("Invalid event value {arg:?}: expected true/false, 1/0 or on/off"),
        }
    }
}

impl CliValue for f64 {
    fn parse_arg(arg: &str) -> anyhow::Result<Self> {
        arg.parse()
            .with_context(|| format!("Invalid sample value {arg:?}"))
    }
}

/// Run the selected subcommand, writing its report to `out`
pub fn execute(cli: &Cli, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.kind {
        LogKind::Event => run::<bool>(cli, settings, out),
        LogKind::Series => run::<f64>(cli, settings, out),
    }
}

fn run<V: CliValue>(cli: &Cli, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
    match &cli.command {
        Command::Inspect { path, records, raw } => inspect::<V>(cli, settings, path, *records, *raw, out),
        Command::Append {
            path,
            values,
            timestamp,
        } => append::<V>(cli, settings, path, values, *timestamp, out),
        Command::Ack { path, count } => ack::<V>(cli, settings, path, *count, out),
        Command::Repair { path } => repair::<V>(cli, settings, path, out),
        Command::Verify { path } => verify::<V>(cli, settings, path, out),
    }
}

fn open_log<V: RecordValue>(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    recover_torn_tail: bool,
) -> anyhow::Result<WindowedLog<V>> {
    let mut config = settings.window_config(cli);
    config.recover_torn_tail |= recover_torn_tail;

    let store = FileStore::with_config(settings.store.clone());
    let mut log = WindowedLog::new(store, path, config);
    log.open()
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(log)
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn now_timestamp() -> anyhow::Result<u32> {
    u32::try_from(chrono::Utc::now().timestamp())
        .context("Current time does not fit a 32-bit timestamp")
}

fn hex_blocks<V: RecordValue>(records: &[Record<V>]) -> Vec<String> {
    records.iter().map(|r| hex::encode(r.encode())).collect()
}

#[derive(Serialize)]
struct InspectReport<'a, V> {
    name: &'a str,
    path: &'a Path,
    kind: LogKind,
    record_width: usize,
    file_records: usize,
    ram_records: usize,
    max_ram_records: usize,
    pending: usize,
    window: &'a [Record<V>],
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<Record<V>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_window: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_records: Option<Vec<String>>,
}

fn inspect<V: CliValue>(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    list_records: bool,
    raw: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let log = open_log::<V>(cli, settings, path, false)?;
    let records = if list_records {
        Some(log.durable_records()?)
    } else {
        None
    };

    let report = InspectReport {
        name: log.name(),
        path: log.path(),
        kind: cli.kind,
        record_width: Record::<V>::WIDTH,
        file_records: log.file_record_count(),
        ram_records: log.ram_record_count(),
        max_ram_records: log.max_ram_records(),
        pending: log.pending_count(),
        window: log.current_window(),
        raw_window: raw.then(|| hex_blocks(log.current_window())),
        raw_records: records.as_deref().filter(|_| raw).map(hex_blocks),
        records,
    };

    if cli.json {
        return write_json(out, &report);
    }

    writeln!(out, "{} ({:?}) at {}", report.name, report.kind, report.path.display())?;
    writeln!(out, "  record width:  {} bytes", report.record_width)?;
    writeln!(out, "  store records: {}", report.file_records)?;
    writeln!(
        out,
        "  window:        {} / {}",
        report.ram_records, report.max_ram_records
    )?;
    writeln!(out, "  pending:       {}", report.pending)?;

    writeln!(out, "window:")?;
    write_records(out, report.window, report.raw_window.as_deref())?;
    if let Some(records) = &report.records {
        writeln!(out, "records:")?;
        write_records(out, records, report.raw_records.as_deref())?;
    }
    Ok(())
}

fn write_records<V: CliValue>(
    out: &mut impl Write,
    records: &[Record<V>],
    raw: Option<&[String]>,
) -> anyhow::Result<()> {
    match raw {
        Some(blocks) => {
            for (i, block) in blocks.iter().enumerate() {
                writeln!(out, "  #{i:<5} {block}")?;
            }
        }
        None => {
            for (i, record) in records.iter().enumerate() {
                writeln!(out, "  #{i:<5} ts={:<10} value={}", record.timestamp, record.value)?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ChangeReport<'a> {
    path: &'a Path,
    changed: usize,
    pending: usize,
}

fn append<V: CliValue>(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    values: &[String],
    timestamp: Option<u32>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let timestamp = match timestamp {
        Some(timestamp) => timestamp,
        None => now_timestamp()?,
    };
    let values = values
        .iter()
        .map(|arg| V::parse_arg(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut log = open_log::<V>(cli, settings, path, false)?;
    for value in &values {
        log.add_value(timestamp, *value)?;
    }
    let pending = log.pending_count();
    log.close()?;
    info!(path = %path.display(), records = values.len(), timestamp, "Appended");

    let report = ChangeReport {
        path,
        changed: values.len(),
        pending,
    };
    if cli.json {
        return write_json(out, &report);
    }
    writeln!(
        out,
        "Appended {} records to {} ({} pending)",
        report.changed,
        path.display(),
        report.pending
    )?;
    Ok(())
}

fn ack<V: CliValue>(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    count: usize,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut log = open_log::<V>(cli, settings, path, false)?;
    let before = log.pending_count();
    log.acknowledge(count)?;
    let pending = log.pending_count();
    log.close()?;

    let report = ChangeReport {
        path,
        changed: before - pending,
        pending,
    };
    if cli.json {
        return write_json(out, &report);
    }
    writeln!(
        out,
        "Acknowledged {} records in {} ({} pending)",
        report.changed,
        path.display(),
        report.pending
    )?;
    Ok(())
}

#[derive(Serialize)]
struct RepairReport<'a> {
    path: &'a Path,
    records: usize,
    discarded_bytes: u64,
}

fn repair<V: CliValue>(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let len = |path: &Path| fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let before = len(path);
    let log = open_log::<V>(cli, settings, path, true)?;
    let records = log.file_record_count();
    log.close()?;
    let discarded_bytes = before.saturating_sub(len(path));
    debug!(path = %path.display(), discarded_bytes, "Repair finished");

    let report = RepairReport {
        path,
        records,
        discarded_bytes,
    };
    if cli.json {
        return write_json(out, &report);
    }
    if discarded_bytes == 0 {
        writeln!(out, "{}: nothing to repair ({} records)", path.display(), records)?;
    } else {
        writeln!(
            out,
            "{}: discarded {} trailing bytes, kept {} records",
            path.display(),
            discarded_bytes,
            records
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct VerifyReport<'a> {
    path: &'a Path,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn verify<V: CliValue>(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut log: WindowedLog<V> = WindowedLog::new(
        FileStore::with_config(settings.store.clone()),
        path,
        settings.window_config(cli).with_recover_torn_tail(false),
    );
    let checked = log.open().and_then(|()| log.durable_records());

    let report = match &checked {
        Ok(records) => VerifyReport {
            path,
            ok: true,
            records: Some(records.len()),
            error: None,
        },
        Err(err) => VerifyReport {
            path,
            ok: false,
            records: None,
            error: Some(err.to_string()),
        },
    };

    if cli.json {
        write_json(out, &report)?;
    } else if let Some(records) = report.records {
        writeln!(out, "{}: OK ({} records)", path.display(), records)?;
    }

    match checked {
        Ok(_) => Ok(()),
        Err(err) => Err(err).with_context(|| format!("{} failed verification", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn run_cli(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("stashlog").chain(args.iter().copied()))?;
        let settings = Settings {
            store: stashlog::FileStoreConfig {
                sync_writes: false,
                ..Default::default()
            },
            ..Settings::default()
        };
        let mut out = Vec::new();
        execute(&cli, &settings, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_parse_values() {
        assert!(bool::parse_arg("ON").unwrap());
        assert!(!bool::parse_arg("0").unwrap());
        assert!(bool::parse_arg("maybe").is_err());
        assert_eq!(f64::parse_arg("-2.5").unwrap(), -2.5);
        assert!(f64::parse_arg("warm").is_err());
    }

    #[test]
    fn test_append_then_inspect_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("temperature");
        let path = path.to_str().unwrap();

        let output = run_cli(&[
            "--max-ram-records",
            "2",
            "append",
            path,
            "--timestamp",
            "100",
            "20.5",
            "21",
            "22.25",
        ])
        .unwrap();
        assert!(output.contains("Appended 3 records"));

        let output = run_cli(&["--max-ram-records", "2", "--json", "inspect", path, "--records"]).unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["name"], "temperature");
        assert_eq!(report["kind"], "series");
        assert_eq!(report["record_width"], 12);
        assert_eq!(report["file_records"], 3);
        assert_eq!(report["ram_records"], 2);
        assert_eq!(report["window"][1]["value"], 21.0);
        assert_eq!(report["records"][2]["value"], 22.25);
        assert_eq!(report["records"][2]["timestamp"], 100);
    }

    #[test]
    fn test_ack_and_raw_inspect() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("door");
        let path = path.to_str().unwrap();

        run_cli(&["--kind", "event", "append", path, "--timestamp", "1", "on", "off", "on"]).unwrap();
        let output = run_cli(&["--kind", "event", "ack", path, "2"]).unwrap();
        assert!(output.contains("Acknowledged 2 records"));
        assert!(output.contains("(1 pending)"));

        let output = run_cli(&["--kind", "event", "inspect", path, "--raw"]).unwrap();
        assert!(output.contains("0100000001"));
    }

    #[test]
    fn test_verify_and_repair_torn_store() {
        let temp_dir = TempDir::new().unwrap();
        let path_buf = temp_dir.path().join("series");
        let path = path_buf.to_str().unwrap();

        run_cli(&["append", path, "--timestamp", "5", "1", "2", "3"]).unwrap();
        assert!(run_cli(&["verify", path]).unwrap().contains("OK (3 records)"));

        let file = fs::OpenOptions::new().write(true).open(&path_buf).unwrap();
        file.set_len(3 * 12 - 4).unwrap();
        drop(file);

        let err = run_cli(&["verify", path]).unwrap_err();
        assert!(err.to_string().contains("failed verification"));

        let output = run_cli(&["--json", "repair", path]).unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["records"], 2);
        assert_eq!(report["discarded_bytes"], 8);

        assert!(run_cli(&["verify", path]).unwrap().contains("OK (2 records)"));
    }

    #[test]
    fn test_missing_directory() {
        let err = run_cli(&["inspect", "/nonexistent-dir/series"]).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
