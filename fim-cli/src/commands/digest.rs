use anyhow::Result;
use colored::Colorize;
use fim_core::sha256;
use std::path::PathBuf;

pub fn run(files: Vec<PathBuf>) -> Result<()> {
    let mut failed = 0;

    for file in &files {
        match std::fs::read(file) {
            Ok(bytes) => println!("{}  {}", sha256(&bytes), file.display()),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) could not be read", failed, files.len());
    }

    Ok(())
}
