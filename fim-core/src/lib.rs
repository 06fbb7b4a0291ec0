//! # fim-core
//!
//! Core library for fim - file integrity baselines and change detection.
//!
//! This crate provides the SHA-256 content digest engine, the snapshot builder
//! with its skip-if-unchanged hashing policy, and the change detector that
//! classifies the differences between two snapshots.

pub mod builder;
pub mod changelog;
pub mod config;
pub mod diff;
pub mod digest;
pub mod error;
pub mod models;
pub mod scan;

pub use builder::{BuildOutcome, BuildStats, DiscoveredFile, ReadContent, SnapshotBuilder};
pub use changelog::ChangeLog;
pub use config::ScanConfig;
pub use diff::diff;
pub use digest::{sha256, Digest, DigestEngine, Sha256Engine};
pub use error::{Error, Result};
pub use models::{Change, ChangeKind, ChangeSet, FileRecord, Permissions, Snapshot};
