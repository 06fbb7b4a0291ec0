pub mod baseline;
pub mod digest;
pub mod monitor;

use anyhow::{Context, Result};
use clap::Args;
use fim_core::{scan, BuildOutcome, ScanConfig, Snapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// TOML config file (root, ignore_patterns, follow_symlinks, log_file)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// File or directory name to skip (repeatable)
    #[arg(short, long = "ignore")]
    pub ignore: Vec<String>,

    /// Follow symbolic links while walking
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Command-line values win over the config file; the root is prompted for
/// only when neither supplies one.
pub fn resolve_config(path: Option<PathBuf>, args: &ScanArgs) -> Result<ScanConfig> {
    let config = match &args.config {
        Some(file) => ScanConfig::from_toml_file(file)
            .with_context(|| format!("Failed to load config {}", file.display()))?,
        None => ScanConfig::default(),
    };

    let root = match path {
        Some(path) => path,
        None if args.config.is_some() => config.root.clone(),
        None => prompt_for_root()?,
    };

    let follow = config.follow_symlinks || args.follow_symlinks;
    let mut config = config.with_root(root).with_follow_symlinks(follow);
    for pattern in &args.ignore {
        config = config.with_ignore(pattern.clone());
    }

    Ok(config)
}

fn prompt_for_root() -> Result<PathBuf> {
    let input: String = dialoguer::Input::new()
        .with_prompt("Enter directory to monitor")
        .default(".".to_string())
        .interact_text()?;
    Ok(PathBuf::from(input))
}

pub fn scan_with_spinner(
    config: &ScanConfig,
    prior: Option<&Snapshot>,
    message: &'static str,
) -> Result<BuildOutcome> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = scan::scan(config, prior)
        .with_context(|| format!("Failed to scan {}", config.root.display()));

    spinner.finish_and_clear();
    outcome
}
