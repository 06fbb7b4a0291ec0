use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::{baseline, digest, monitor, ScanArgs};

#[derive(Parser)]
#[command(name = "fim")]
#[command(version, about = "File integrity monitor: baseline a directory and report what changed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint a directory and print the baseline
    Baseline {
        /// Directory to scan (prompted for if omitted and no config is given)
        path: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a baseline, wait for Enter, rescan and report changes
    Monitor {
        /// Directory to monitor (prompted for if omitted and no config is given)
        path: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Log file to append change lines to
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Print the change report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SHA-256 digest of files
    Digest {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Baseline { path, scan, json } => {
            baseline::run(path, scan, json)?;
        }
        Commands::Monitor {
            path,
            scan,
            log,
            json,
        } => {
            monitor::run(path, scan, log, json)?;
        }
        Commands::Digest { files } => {
            digest::run(files)?;
        }
    }

    Ok(())
}
