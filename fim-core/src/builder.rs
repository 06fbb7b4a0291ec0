//! Snapshot construction with the skip-if-unchanged hashing policy.
//!
//! # Known blind spot
//!
//! When a prior snapshot is supplied, a file whose size and mtime both match
//! its prior record is **not re-read**: the prior digest is carried forward.
//! Metadata is trusted as a proxy for content. Anyone who rewrites a file
//! while keeping its length and restoring its mtime will be reported as
//! unchanged. This is a performance trade-off and not a tamper-resistance
//! guarantee; build without a prior snapshot to force every file to be hashed.

use crate::digest::{Digest, DigestEngine, Sha256Engine};
use crate::error::Error;
use crate::models::{FileRecord, Permissions, Snapshot};
use chrono::{DateTime, Utc};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// On-demand access to a file's full content.
pub trait ReadContent {
    fn read_content(&self) -> io::Result<Vec<u8>>;
}

impl ReadContent for PathBuf {
    fn read_content(&self) -> io::Result<Vec<u8>> {
        std::fs::read(self)
    }
}

impl ReadContent for Vec<u8> {
    fn read_content(&self) -> io::Result<Vec<u8>> {
        Ok(self.clone())
    }
}

/// A file as reported by traversal: metadata now, bytes only when asked.
#[derive(Debug, Clone)]
pub struct DiscoveredFile<R> {
    pub path: String,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub permissions: Permissions,
    pub source: R,
}

impl<R: ReadContent> DiscoveredFile<R> {
    pub fn new(
        path: impl Into<String>,
        size: u64,
        mtime: DateTime<Utc>,
        permissions: Permissions,
        source: R,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
            permissions,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Files whose content was read and digested.
    pub files_hashed: u64,
    /// Files whose digest was carried over from the prior snapshot.
    pub files_reused: u64,
    /// Files left out because their content could not be read.
    pub files_skipped: u64,
    pub bytes_hashed: u64,
}

/// A snapshot plus the files that could not be included in it.
#[derive(Debug)]
pub struct BuildOutcome {
    pub snapshot: Snapshot,
    pub issues: Vec<Error>,
    pub stats: BuildStats,
}

pub struct SnapshotBuilder<'a, E = Sha256Engine> {
    prior: Option<&'a Snapshot>,
    engine: E,
}

impl SnapshotBuilder<'static, Sha256Engine> {
    pub fn new() -> Self {
        Self {
            prior: None,
            engine: Sha256Engine,
        }
    }
}

impl Default for SnapshotBuilder<'static, Sha256Engine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E: DigestEngine> SnapshotBuilder<'a, E> {
    /// Reuse digests from `prior` for files whose size and mtime are unchanged.
    pub fn with_prior<'b>(self, prior: &'b Snapshot) -> SnapshotBuilder<'b, E> {
        SnapshotBuilder {
            prior: Some(prior),
            engine: self.engine,
        }
    }

    pub fn with_engine<F: DigestEngine>(self, engine: F) -> SnapshotBuilder<'a, F> {
        SnapshotBuilder {
            prior: self.prior,
            engine,
        }
    }

    /// Builds a snapshot from `files`, one at a time.
    ///
    /// A file that cannot be read is left out and reported in
    /// [`BuildOutcome::issues`]; the rest of the build carries on.
    pub fn build<R, I>(&self, files: I) -> BuildOutcome
    where
        R: ReadContent,
        I: IntoIterator<Item = DiscoveredFile<R>>,
    {
        let mut records = Vec::new();
        let mut issues = Vec::new();
        let mut stats = BuildStats::default();

        for file in files {
            let digest = match self.reusable_digest(&file) {
                Some(digest) => {
                    debug!("Size and mtime unchanged, reusing digest for {}", file.path);
                    stats.files_reused += 1;
                    digest
                }
                None => match file.source.read_content() {
                    Ok(bytes) => {
                        debug!("Hashing {} ({} bytes)", file.path, bytes.len());
                        stats.files_hashed += 1;
                        stats.bytes_hashed += bytes.len() as u64;
                        self.engine.digest(&bytes)
                    }
                    Err(e) => {
                        let issue = Error::from_read(file.path.clone(), e);
                        warn!("Skipping {}: {}", file.path, issue);
                        stats.files_skipped += 1;
                        issues.push(issue);
                        continue;
                    }
                },
            };

            records.push(FileRecord::new(
                file.path,
                file.size,
                file.mtime,
                file.permissions,
                digest,
            ));
        }

        let snapshot = Snapshot::from_records(records);
        info!(
            "Snapshot {} built: {} files ({} hashed, {} reused, {} skipped)",
            snapshot.id(),
            snapshot.len(),
            stats.files_hashed,
            stats.files_reused,
            stats.files_skipped
        );

        BuildOutcome {
            snapshot,
            issues,
            stats,
        }
    }

    fn reusable_digest<R>(&self, file: &DiscoveredFile<R>) -> Option<Digest> {
        let prior = self.prior?.get(&file.path)?;
        (prior.size == file.size && prior.mtime == file.mtime).then_some(prior.digest)
    }
}
