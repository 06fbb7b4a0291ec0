use crate::models::{Change, ChangeSet, FileRecord, Snapshot};

/// Classifies every path that differs between `baseline` and `current`.
///
/// A path present in both is modified when its digest or its permissions
/// differ. Size and mtime are never consulted here: the digest is the
/// authority on content and the permissions are the authority on mode.
pub fn diff(baseline: &Snapshot, current: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for before in baseline.iter() {
        match current.get(&before.path) {
            None => changes.insert(Change::deleted(before.clone())),
            Some(after) if differs(before, after) => {
                changes.insert(Change::modified(before.clone(), after.clone()))
            }
            Some(_) => {}
        }
    }

    for after in current.iter() {
        if !baseline.contains(&after.path) {
            changes.insert(Change::created(after.clone()));
        }
    }

    changes
}

fn differs(before: &FileRecord, after: &FileRecord) -> bool {
    before.digest != after.digest || before.permissions != after.permissions
}
