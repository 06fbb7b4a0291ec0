use super::ScanArgs;
use crate::display;
use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use fim_core::{ChangeLog, ChangeSet};
use std::fs::OpenOptions;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn run(path: Option<PathBuf>, args: ScanArgs, log: Option<PathBuf>, json: bool) -> Result<()> {
    let mut config = super::resolve_config(path, &args)?;
    if let Some(log) = log {
        config = config.with_log_file(log);
    }

    let baseline = super::scan_with_spinner(&config, None, "Building baseline...")?;

    if json {
        eprintln!(
            "Baseline created for {} files. Press Enter to rescan.",
            baseline.snapshot.len()
        );
    } else {
        println!(
            "{}",
            format!("Baseline created for {} files.", baseline.snapshot.len())
                .green()
                .bold()
        );
        println!();
        display::print_snapshot(&baseline.snapshot);
        display::print_issues(&baseline.issues);
        println!();
        println!(
            "Now modify, create, or delete a file in {} and press {} to rescan.",
            config.root.display().to_string().cyan(),
            "Enter".bold()
        );
    }

    wait_for_enter()?;

    let current =
        super::scan_with_spinner(&config, Some(&baseline.snapshot), "Rescanning...")?;
    let (changes, unreadable) = baseline
        .snapshot
        .diff(&current.snapshot)
        .partition_unreadable(&baseline.issues, &current.issues);

    if json {
        let skipped: Vec<String> = baseline
            .issues
            .iter()
            .chain(&current.issues)
            .map(|e| e.to_string())
            .collect();
        let report = serde_json::json!({
            "baseline": baseline.snapshot.id(),
            "current": current.snapshot.id(),
            "changes": &changes,
            "unreadable": &unreadable,
            "skipped": skipped,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{}", "Changes detected:".bold().cyan());
        display::print_changes(&changes);
        display::print_issues(&current.issues);
        display::print_unreadable(&unreadable);
    }

    if !changes.is_empty() {
        let written = append_to_log(&config.log_file, &changes)?;
        if !json {
            println!();
            println!(
                "{}",
                format!(
                    "✓ {} change(s) logged to {}",
                    written,
                    config.log_file.display()
                )
                .green()
                .bold()
            );
        }
    }

    Ok(())
}

fn wait_for_enter() -> Result<()> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(())
}

fn append_to_log(log_file: &Path, changes: &ChangeSet) -> Result<usize> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let mut log = ChangeLog::new(file);
    let written = log.record(changes, &Local::now())?;
    info!("Appended {} change(s) to {:?}", written, log_file);
    Ok(written)
}
