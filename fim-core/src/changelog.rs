use crate::models::{Change, ChangeSet};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::io::{self, Write};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only change log over any writable sink.
///
/// The sink is owned by the caller's side of things; opening (and appending
/// to) a log file is the driver's job.
pub struct ChangeLog<W: Write> {
    sink: W,
}

impl<W: Write> ChangeLog<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes one `<timestamp> - [<KIND>] <path>` line per change, in path
    /// order, and returns the number of lines written.
    pub fn record<Tz>(&mut self, changes: &ChangeSet, at: &DateTime<Tz>) -> io::Result<usize>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let sorted = changes.sorted();
        for change in &sorted {
            writeln!(self.sink, "{}", format_entry(change, at))?;
        }
        self.sink.flush()?;
        Ok(sorted.len())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

pub fn format_entry<Tz>(change: &Change, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} - [{}] {}",
        at.format(TIMESTAMP_FORMAT),
        change.kind,
        change.path
    )
}
