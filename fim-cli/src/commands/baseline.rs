use super::ScanArgs;
use crate::display;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

pub fn run(path: Option<PathBuf>, args: ScanArgs, json: bool) -> Result<()> {
    let config = super::resolve_config(path, &args)?;
    let outcome = super::scan_with_spinner(&config, None, "Building baseline...")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
        for issue in &outcome.issues {
            eprintln!("{} {}", "✗".red(), issue);
        }
        return Ok(());
    }

    println!(
        "{}",
        format!("Baseline created for {} files.", outcome.snapshot.len())
            .green()
            .bold()
    );
    println!("  {}: {}", "Root".bold(), config.root.display());
    println!("  {}: {}", "Snapshot ID".bold(), outcome.snapshot.id());
    println!();

    display::print_snapshot(&outcome.snapshot);
    display::print_issues(&outcome.issues);

    Ok(())
}
