use chrono::Local;
use colored::{ColoredString, Colorize};
use fim_core::changelog::TIMESTAMP_FORMAT;
use fim_core::{Change, ChangeKind, ChangeSet, Error, FileRecord, Snapshot};

const STATUS_WIDTH: usize = 12;
const PATH_WIDTH: usize = 60;
const TIME_WIDTH: usize = 20;
const SIZE_WIDTH: usize = 10;
const PERMISSIONS_WIDTH: usize = 12;
const RULE_WIDTH: usize = 120;

pub fn header() -> String {
    format!(
        "{:<sw$}{:<pw$}{:<tw$}{:<zw$}{:<mw$}",
        "STATUS",
        "FILE PATH",
        "MOD TIME",
        "SIZE",
        "PERMISSIONS",
        sw = STATUS_WIDTH,
        pw = PATH_WIDTH,
        tw = TIME_WIDTH,
        zw = SIZE_WIDTH,
        mw = PERMISSIONS_WIDTH,
    )
}

/// Everything after the status column.
pub fn columns(record: &FileRecord) -> String {
    let mtime = record
        .mtime
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string();

    format!(
        "{:<pw$}{:<tw$}{:<zw$}{:<mw$}",
        record.path,
        mtime,
        record.size,
        record.permissions.to_string(),
        pw = PATH_WIDTH,
        tw = TIME_WIDTH,
        zw = SIZE_WIDTH,
        mw = PERMISSIONS_WIDTH,
    )
}

pub fn status_label(kind: ChangeKind) -> String {
    format!("[{}]", kind.as_str())
}

fn paint(kind: ChangeKind, padded: &str) -> ColoredString {
    match kind {
        ChangeKind::Created => padded.green(),
        ChangeKind::Modified => padded.yellow(),
        ChangeKind::Deleted => padded.red(),
    }
}

fn print_header() {
    println!("{}", header().bold());
    println!("{}", "-".repeat(RULE_WIDTH).bright_black());
}

pub fn print_snapshot(snapshot: &Snapshot) {
    print_header();
    for record in snapshot.sorted() {
        let status = format!("{:<sw$}", "BASELINE", sw = STATUS_WIDTH);
        println!("{}{}", status.cyan(), columns(record));
    }
}

pub fn print_changes(changes: &ChangeSet) {
    if changes.is_empty() {
        println!("{}", "No changes detected".green());
        return;
    }

    print_header();
    for change in changes.sorted() {
        if let Some(record) = change.record() {
            let status = format!("{:<sw$}", status_label(change.kind), sw = STATUS_WIDTH);
            println!("{}{}", paint(change.kind, &status), columns(record));
        }
    }
    println!();
    println!(
        "  {} created, {} modified, {} deleted",
        changes.count(ChangeKind::Created).to_string().green(),
        changes.count(ChangeKind::Modified).to_string().yellow(),
        changes.count(ChangeKind::Deleted).to_string().red()
    );
}

pub fn print_issues(issues: &[Error]) {
    if issues.is_empty() {
        return;
    }

    println!();
    println!(
        "{}",
        format!("⚠ {} path(s) skipped", issues.len()).yellow().bold()
    );
    for issue in issues {
        println!("  {} {}", "✗".red(), issue);
    }
}

/// Paths that differ only because one of the two scans could not read them.
pub fn print_unreadable(unreadable: &[Change]) {
    if unreadable.is_empty() {
        return;
    }

    println!();
    println!(
        "{}",
        "Unreadable in one of the scans (not counted as created or deleted):".yellow()
    );
    for change in unreadable {
        let side = match change.kind {
            ChangeKind::Created => "baseline",
            _ => "rescan",
        };
        println!("  • {} {}", change.path.dimmed(), format!("({})", side).dimmed());
    }
}
