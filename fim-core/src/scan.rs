//! Directory traversal feeding the snapshot builder.

use crate::builder::{BuildOutcome, DiscoveredFile, SnapshotBuilder};
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::models::{mtime_seconds, Permissions, Snapshot};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Regular files found under a root, plus entries that could not be examined.
#[derive(Debug)]
pub struct Discovery {
    pub files: Vec<DiscoveredFile<PathBuf>>,
    pub issues: Vec<Error>,
}

/// Walks `config.root` and collects every regular file with its metadata.
///
/// Only a missing root is fatal; entries that disappear or cannot be
/// examined mid-walk are reported in [`Discovery::issues`].
pub fn discover(config: &ScanConfig) -> Result<Discovery> {
    let root = config.root.as_path();
    if !root.is_dir() {
        return Err(Error::RootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut issues = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !should_ignore(entry.path(), root, &config.ignore_patterns)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let issue = walk_issue(e, root);
                warn!("Walk error: {}", issue);
                issues.push(issue);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let key = relative_key(entry.path(), root);
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                let issue = walk_issue(e, root);
                warn!("Could not stat {}: {}", key, issue);
                issues.push(issue);
                continue;
            }
        };
        let mtime = match metadata.modified() {
            Ok(modified) => mtime_seconds(modified),
            Err(e) => {
                let issue = Error::from_read(key.clone(), e);
                warn!("No modification time for {}: {}", key, issue);
                issues.push(issue);
                continue;
            }
        };

        files.push(DiscoveredFile::new(
            key,
            metadata.len(),
            mtime,
            Permissions::from_metadata(&metadata),
            entry.into_path(),
        ));
    }

    debug!("Discovered {} files under {:?}", files.len(), root);
    Ok(Discovery { files, issues })
}

/// Discovers and builds in one pass, reusing digests from `prior` where allowed.
pub fn scan(config: &ScanConfig, prior: Option<&Snapshot>) -> Result<BuildOutcome> {
    let Discovery { files, mut issues } = discover(config)?;

    let mut outcome = match prior {
        Some(prior) => SnapshotBuilder::new().with_prior(prior).build(files),
        None => SnapshotBuilder::new().build(files),
    };

    issues.append(&mut outcome.issues);
    outcome.issues = issues;
    Ok(outcome)
}

/// Root-relative path with `/` separators, used as the snapshot key.
fn relative_key(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        ignore_patterns.iter().any(|pattern| *pattern == name)
    })
}

fn walk_issue(err: walkdir::Error, root: &Path) -> Error {
    let vanished = match (err.io_error().map(io::Error::kind), err.path()) {
        (Some(io::ErrorKind::NotFound), Some(path)) => Some(relative_key(path, root)),
        _ => None,
    };

    match vanished {
        Some(path) => Error::VanishedPath(path),
        None => Error::Walk(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256;
    use crate::models::ChangeKind;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn set_mtime(root: &Path, relative: &str, secs: u64) {
        let file = File::options().write(true).open(root.join(relative)).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_discover_uses_relative_keys() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.txt", b"top");
        write(dir.path(), "nested/deeper/leaf.txt", b"leaf");
        fs::create_dir_all(dir.path().join("empty_dir")).unwrap();

        let discovery = discover(&ScanConfig::new(dir.path())).unwrap();
        let mut keys: Vec<&str> = discovery.files.iter().map(|f| f.path.as_str()).collect();
        keys.sort();

        assert_eq!(keys, vec!["nested/deeper/leaf.txt", "top.txt"]);
        assert!(discovery.issues.is_empty());
        let leaf = discovery
            .files
            .iter()
            .find(|f| f.path == "nested/deeper/leaf.txt")
            .unwrap();
        assert_eq!(leaf.size, 4);
    }

    #[test]
    fn test_discover_skips_ignored_components() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep.txt", b"k");
        write(dir.path(), ".git/HEAD", b"ref");
        write(dir.path(), "fim_log.txt", b"log");
        write(dir.path(), "build/cache/blob", b"x");

        let config = ScanConfig::new(dir.path()).with_ignore("cache");
        let discovery = discover(&config).unwrap();
        let keys: Vec<&str> = discovery.files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(keys, vec!["keep.txt"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = discover(&ScanConfig::new(&missing)).unwrap_err();
        assert!(matches!(err, Error::RootNotFound(ref p) if *p == missing));

        write(dir.path(), "file.txt", b"not a dir");
        assert!(scan(&ScanConfig::new(dir.path().join("file.txt")), None).is_err());
    }

    #[test]
    fn test_baseline_then_rescan_detects_changes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "same.txt", b"unchanged");
        write(root, "edit.txt", b"before");
        write(root, "doomed.txt", b"bye");

        let config = ScanConfig::new(root);
        let baseline = scan(&config, None).unwrap();
        assert_eq!(baseline.snapshot.len(), 3);
        assert_eq!(
            baseline.snapshot.get("edit.txt").unwrap().digest,
            sha256(b"before")
        );

        write(root, "edit.txt", b"after, and longer");
        fs::remove_file(root.join("doomed.txt")).unwrap();
        write(root, "sub/new.txt", b"hello");

        let current = scan(&config, Some(&baseline.snapshot)).unwrap();
        let changes = baseline.snapshot.diff(&current.snapshot);

        assert_eq!(changes.len(), 3);
        assert_eq!(changes.kind_of("edit.txt"), Some(ChangeKind::Modified));
        assert_eq!(changes.kind_of("doomed.txt"), Some(ChangeKind::Deleted));
        assert_eq!(changes.kind_of("sub/new.txt"), Some(ChangeKind::Created));
        assert_eq!(changes.kind_of("same.txt"), None);
        assert!(current.stats.files_reused >= 1);
    }

    #[test]
    fn test_restored_mtime_hides_same_size_rewrite() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "config.ini", b"mode=safe");
        set_mtime(root, "config.ini", 1_600_000_000);

        let config = ScanConfig::new(root);
        let baseline = scan(&config, None).unwrap();

        write(root, "config.ini", b"mode=evil");
        set_mtime(root, "config.ini", 1_600_000_000);
        let current = scan(&config, Some(&baseline.snapshot)).unwrap();

        // metadata is trusted, so the rewrite goes unnoticed
        assert_eq!(current.stats.files_hashed, 0);
        assert!(baseline.snapshot.diff(&current.snapshot).is_empty());

        // without a prior snapshot every file is hashed and the rewrite shows
        let fresh = scan(&config, None).unwrap();
        assert_eq!(
            baseline.snapshot.diff(&fresh.snapshot).kind_of("config.ini"),
            Some(ChangeKind::Modified)
        );
    }

    #[test]
    fn test_file_removed_after_discovery() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["a.txt", "b.txt", "c.txt"] {
            write(root, name, name.as_bytes());
        }

        let discovery = discover(&ScanConfig::new(root)).unwrap();
        assert_eq!(discovery.files.len(), 3);
        fs::remove_file(root.join("b.txt")).unwrap();

        let outcome = SnapshotBuilder::new().build(discovery.files);
        assert_eq!(outcome.snapshot.len(), 2);
        assert_eq!(outcome.issues.len(), 1);
        assert!(matches!(outcome.issues[0], Error::VanishedPath(ref p) if p == "b.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_change_is_modified() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "run.sh", b"#!/bin/sh\n");
        fs::set_permissions(root.join("run.sh"), fs::Permissions::from_mode(0o644)).unwrap();

        let config = ScanConfig::new(root);
        let baseline = scan(&config, None).unwrap();
        assert_eq!(
            baseline.snapshot.get("run.sh").unwrap().permissions.to_string(),
            "rw-r--r--"
        );

        fs::set_permissions(root.join("run.sh"), fs::Permissions::from_mode(0o744)).unwrap();
        let current = scan(&config, Some(&baseline.snapshot)).unwrap();
        let changes = baseline.snapshot.diff(&current.snapshot);

        assert_eq!(changes.kind_of("run.sh"), Some(ChangeKind::Modified));
        let change = changes.get("run.sh").unwrap();
        assert_eq!(change.before.as_ref().unwrap().digest, change.after.as_ref().unwrap().digest);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_by_default() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "real.txt", b"real");
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();

        let plain = discover(&ScanConfig::new(root)).unwrap();
        assert_eq!(plain.files.len(), 1);

        let followed = discover(&ScanConfig::new(root).with_follow_symlinks(true)).unwrap();
        assert_eq!(followed.files.len(), 2);
    }

    #[test]
    fn test_should_ignore() {
        let root = PathBuf::from("/test");
        let ignore_patterns = vec!["target".to_string(), ".git".to_string()];

        assert!(should_ignore(
            &PathBuf::from("/test/target/debug"),
            &root,
            &ignore_patterns
        ));
        assert!(should_ignore(
            &PathBuf::from("/test/.git/config"),
            &root,
            &ignore_patterns
        ));
        assert!(!should_ignore(
            &PathBuf::from("/test/src/targets.rs"),
            &root,
            &ignore_patterns
        ));
    }
}
