use crate::digest::Digest;
use crate::error::{Error, Result};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

const PERMISSION_BITS: [(u16, char); 9] = [
    (0o400, 'r'),
    (0o200, 'w'),
    (0o100, 'x'),
    (0o040, 'r'),
    (0o020, 'w'),
    (0o010, 'x'),
    (0o004, 'r'),
    (0o002, 'w'),
    (0o001, 'x'),
];

/// Owner/group/other read-write-execute flags.
///
/// On Unix this is the low nine bits of the file mode. Elsewhere only the
/// read-only attribute is observable, so it maps to `r--r--r--` or
/// `rw-rw-rw-`; equality still holds on the mapped bits, so flipping the
/// attribute is reported as a modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Permissions(u16);

impl Permissions {
    pub const MASK: u32 = 0o777;

    pub fn from_mode(mode: u32) -> Self {
        Self((mode & Self::MASK) as u16)
    }

    pub fn mode(&self) -> u32 {
        u32::from(self.0)
    }

    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            Self::from_mode(metadata.permissions().mode())
        }
        #[cfg(not(unix))]
        {
            if metadata.permissions().readonly() {
                Self(0o444)
            } else {
                Self(0o666)
            }
        }
    }

    /// Parses the 9-character `rwxr-xr-x` form.
    pub fn parse(s: &str) -> Result<Self> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != PERMISSION_BITS.len() {
            return Err(Error::InvalidPermissions(s.to_string()));
        }

        let mut bits = 0u16;
        for (c, (bit, flag)) in chars.iter().zip(PERMISSION_BITS) {
            match *c {
                '-' => {}
                c if c == flag => bits |= bit,
                _ => return Err(Error::InvalidPermissions(s.to_string())),
            }
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: String = PERMISSION_BITS
            .iter()
            .map(|(bit, flag)| if self.0 & bit != 0 { *flag } else { '-' })
            .collect();
        f.write_str(&rendered)
    }
}

impl From<Permissions> for String {
    fn from(permissions: Permissions) -> Self {
        permissions.to_string()
    }
}

impl TryFrom<String> for Permissions {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Permissions::parse(&s)
    }
}

/// Drops sub-second precision; records compare mtimes at second resolution.
pub fn mtime_seconds(modified: SystemTime) -> DateTime<Utc> {
    let dt: DateTime<Utc> = modified.into();
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub permissions: Permissions,
    pub digest: Digest,
}

impl FileRecord {
    pub fn new(
        path: impl Into<String>,
        size: u64,
        mtime: DateTime<Utc>,
        permissions: Permissions,
        digest: Digest,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
            permissions,
            digest,
        }
    }
}

/// Every file observed by one traversal pass, keyed by path.
///
/// A snapshot is never mutated once built; a rescan produces a new one.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    id: Uuid,
    taken_at: DateTime<Utc>,
    records: HashMap<String, FileRecord>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::from_records(std::iter::empty())
    }

    /// Later records replace earlier ones with the same path.
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            records: records
                .into_iter()
                .map(|record| (record.path.clone(), record))
                .collect(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Records ordered by path, for rendering.
    pub fn sorted(&self) -> Vec<&FileRecord> {
        let mut records: Vec<&FileRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    pub fn diff(&self, current: &Snapshot) -> ChangeSet {
        crate::diff::diff(self, current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::Created => "CREATED",
            ChangeKind::Modified => "MODIFIED",
            ChangeKind::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(ChangeKind::Created),
            "MODIFIED" => Some(ChangeKind::Modified),
            "DELETED" => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    pub kind: ChangeKind,
    pub before: Option<FileRecord>,
    pub after: Option<FileRecord>,
}

impl Change {
    pub fn created(after: FileRecord) -> Self {
        Self {
            path: after.path.clone(),
            kind: ChangeKind::Created,
            before: None,
            after: Some(after),
        }
    }

    pub fn modified(before: FileRecord, after: FileRecord) -> Self {
        Self {
            path: after.path.clone(),
            kind: ChangeKind::Modified,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: FileRecord) -> Self {
        Self {
            path: before.path.clone(),
            kind: ChangeKind::Deleted,
            before: Some(before),
            after: None,
        }
    }

    /// The record a reporter shows: the current one, or the baseline one for deletions.
    pub fn record(&self) -> Option<&FileRecord> {
        self.after.as_ref().or(self.before.as_ref())
    }
}

/// Differences between two snapshots, at most one entry per path.
///
/// Iteration order is unspecified; use [`ChangeSet::sorted`] for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: HashMap<String, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, change: Change) {
        self.changes.insert(change.path.clone(), change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Change> {
        self.changes.get(path)
    }

    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        self.changes.get(path).map(|c| c.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.values()
    }

    pub fn sorted(&self) -> Vec<&Change> {
        let mut changes: Vec<&Change> = self.changes.values().collect();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.values().filter(|c| c.kind == kind).count()
    }

    /// Splits off changes that only exist because one side skipped the path
    /// as unreadable: deletions of paths the current build skipped, and
    /// creations of paths the baseline build skipped. They are reported apart
    /// from real changes.
    pub fn partition_unreadable(
        mut self,
        baseline_issues: &[Error],
        current_issues: &[Error],
    ) -> (ChangeSet, Vec<Change>) {
        let mut unreadable = Vec::new();
        let skipped = current_issues
            .iter()
            .filter_map(Error::path)
            .map(|path| (path, ChangeKind::Deleted))
            .chain(
                baseline_issues
                    .iter()
                    .filter_map(Error::path)
                    .map(|path| (path, ChangeKind::Created)),
            );

        for (path, kind) in skipped {
            if self.kind_of(path) == Some(kind) {
                if let Some(change) = self.changes.remove(path) {
                    unreadable.push(change);
                }
            }
        }
        unreadable.sort_by(|a, b| a.path.cmp(&b.path));
        (self, unreadable)
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256;

    fn record(path: &str, content: &[u8]) -> FileRecord {
        FileRecord::new(
            path,
            content.len() as u64,
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            Permissions::from_mode(0o644),
            sha256(content),
        )
    }

    #[test]
    fn test_permissions_rendering() {
        assert_eq!(Permissions::from_mode(0o644).to_string(), "rw-r--r--");
        assert_eq!(Permissions::from_mode(0o755).to_string(), "rwxr-xr-x");
        assert_eq!(Permissions::from_mode(0o000).to_string(), "---------");
        // file type bits are not part of the mode we track
        assert_eq!(Permissions::from_mode(0o100644), Permissions::from_mode(0o644));
    }

    #[test]
    fn test_permissions_parse() {
        assert_eq!(Permissions::parse("rwxr--r--").unwrap().mode(), 0o744);
        assert!(Permissions::parse("rwx").is_err());
        assert!(Permissions::parse("wrxr--r--").is_err());
    }

    #[test]
    fn test_truncates_mtime_to_seconds() {
        let t = SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(1_700_000_000_750);
        assert_eq!(mtime_seconds(t).timestamp(), 1_700_000_000);
        assert_eq!(mtime_seconds(t).nanosecond(), 0);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = Snapshot::from_records(vec![record("b.txt", b"b"), record("a.txt", b"a")]);

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains("a.txt"));
        assert!(snapshot.get("missing").is_none());

        let paths: Vec<&str> = snapshot.sorted().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert!(Snapshot::empty().is_empty());
    }

    #[test]
    fn test_change_record_selection() {
        let before = record("a.txt", b"old");
        let after = record("a.txt", b"new");

        assert_eq!(Change::deleted(before.clone()).record(), Some(&before));
        assert_eq!(Change::created(after.clone()).record(), Some(&after));
        assert_eq!(Change::modified(before, after.clone()).record(), Some(&after));
    }

    #[test]
    fn test_change_kind_strings() {
        for kind in [ChangeKind::Created, ChangeKind::Modified, ChangeKind::Deleted] {
            assert_eq!(ChangeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChangeKind::parse("created"), None);
    }

    #[test]
    fn test_change_set_counts() {
        let mut changes = ChangeSet::new();
        changes.insert(Change::created(record("new.txt", b"n")));
        changes.insert(Change::deleted(record("gone.txt", b"g")));
        changes.insert(Change::deleted(record("gone2.txt", b"g")));

        assert_eq!(changes.len(), 3);
        assert_eq!(changes.count(ChangeKind::Deleted), 2);
        assert_eq!(changes.count(ChangeKind::Modified), 0);
        assert_eq!(changes.kind_of("new.txt"), Some(ChangeKind::Created));
    }

    #[test]
    fn test_partition_unreadable() {
        let mut changes = ChangeSet::new();
        changes.insert(Change::deleted(record("locked.txt", b"l")));
        changes.insert(Change::deleted(record("gone.txt", b"g")));
        changes.insert(Change::created(record("new.txt", b"n")));

        let issues = vec![
            Error::ReadError {
                path: "locked.txt".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
            Error::VanishedPath("new.txt".to_string()),
        ];
        let (changes, unreadable) = changes.partition_unreadable(&[], &issues);

        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].path, "locked.txt");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.kind_of("gone.txt"), Some(ChangeKind::Deleted));
        assert_eq!(changes.kind_of("new.txt"), Some(ChangeKind::Created));
    }

    #[test]
    fn test_unreadable_at_baseline_is_not_created() {
        use crate::builder::{DiscoveredFile, ReadContent, SnapshotBuilder};

        struct Source(Option<&'static [u8]>);

        impl ReadContent for Source {
            fn read_content(&self) -> std::io::Result<Vec<u8>> {
                self.0
                    .map(|bytes| bytes.to_vec())
                    .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            }
        }

        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let file = |path: &str, source: Source| {
            DiscoveredFile::new(path, 1, at, Permissions::from_mode(0o644), source)
        };

        let baseline = SnapshotBuilder::new()
            .build(vec![file("a.txt", Source(Some(b"a"))), file("locked", Source(None))]);
        let current = SnapshotBuilder::new().with_prior(&baseline.snapshot).build(vec![
            file("a.txt", Source(Some(b"a"))),
            file("locked", Source(Some(b"l"))),
            file("fresh", Source(Some(b"f"))),
        ]);

        let (changes, unreadable) = baseline
            .snapshot
            .diff(&current.snapshot)
            .partition_unreadable(&baseline.issues, &current.issues);

        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].path, "locked");
        assert_eq!(unreadable[0].kind, ChangeKind::Created);
        assert_eq!(changes.kind_of("locked"), None);
        assert_eq!(changes.kind_of("fresh"), Some(ChangeKind::Created));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("a.txt", b"abc")).unwrap();
        assert_eq!(json["permissions"], "rw-r--r--");
        assert_eq!(
            json["digest"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
