use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILE: &str = "fim_log.txt";

/// What to scan and how.
///
/// Loadable from TOML; every field is optional there and falls back to
/// [`ScanConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub root: PathBuf,
    /// Path components (file or directory names) to skip entirely.
    pub ignore_patterns: Vec<String>,
    pub follow_symlinks: bool,
    /// Where the driver appends change lines.
    pub log_file: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            ignore_patterns: vec![".git".to_string(), DEFAULT_LOG_FILE.to_string()],
            follow_symlinks: false,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl ScanConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// An explicit `ignore_patterns` list replaces the defaults, but the log
    /// file's name is always added back.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        let log_file = config.log_file.clone();
        Ok(config.with_log_file(log_file))
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_ignore(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if !self.ignore_patterns.contains(&pattern) {
            self.ignore_patterns.push(pattern);
        }
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Also ignores the log file's name so appending to it inside the root
    /// does not show up as a modification.
    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        match self.log_file.file_name() {
            Some(name) => {
                let name = name.to_string_lossy().into_owned();
                self.with_ignore(name)
            }
            None => self,
        }
    }
}
