//! Timetable lookup for the punctuality pass.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{InsightError, Result};
use crate::model::{TIMETABLE_COLUMNS, TimetableEntry};
use crate::output::load_records;

/// Anything that can produce the timetable of a line at one stop post.
///
/// A stop that has no timetable for the line is reported as
/// [`InsightError::LookupMiss`]; other errors abort the pass.
pub trait TimetableSource {
    fn timetable(&self, stop_id: &str, stop_number: &str, line: &str) -> Result<Vec<TimetableEntry>>;
}

/// File name under which a downloaded timetable is stored.
pub fn timetable_file_name(stop_id: &str, stop_number: &str, line: &str) -> String {
    format!("timetable_{stop_id}_{stop_number}_{line}.csv")
}

/// Timetables downloaded ahead of time into one directory.
///
/// A file that is missing, empty or unreadable is a miss for its key only.
pub struct DirectoryTimetables {
    dir: PathBuf,
}

impl DirectoryTimetables {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TimetableSource for DirectoryTimetables {
    fn timetable(&self, stop_id: &str, stop_number: &str, line: &str) -> Result<Vec<TimetableEntry>> {
        let path = self.dir.join(timetable_file_name(stop_id, stop_number, line));
        if !path.exists() {
            return Err(InsightError::LookupMiss(format!("no timetable file {}", path.display())));
        }
        load_records(&path, TIMETABLE_COLUMNS).map_err(|e| {
            InsightError::LookupMiss(format!("unreadable timetable file {}: {e}", path.display()))
        })
    }
}

type Key = (String, String, String);

/// Memoizes one analysis pass worth of timetable lookups.
///
/// Soft misses are remembered too, so every (stop, line) reaches the source at
/// most once while the cache lives.
pub struct TimetableCache<'a, S: TimetableSource + ?Sized> {
    source: &'a S,
    entries: HashMap<Key, Option<Vec<TimetableEntry>>>,
    lookups: usize,
}

impl<'a, S: TimetableSource + ?Sized> TimetableCache<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            lookups: 0,
        }
    }

    /// Entries for the stop and line, or `None` on a soft miss.
    pub fn get(&mut self, stop_id: &str, stop_number: &str, line: &str) -> Result<Option<&[TimetableEntry]>> {
        let key = (stop_id.to_string(), stop_number.to_string(), line.to_string());

        if !self.entries.contains_key(&key) {
            self.lookups += 1;
            let fetched = match self.source.timetable(stop_id, stop_number, line) {
                Ok(entries) => Some(entries),
                Err(e) if e.is_soft() => {
                    debug!(stop_id, stop_number, line, error = %e, "Timetable unavailable");
                    None
                }
                Err(e) => return Err(e),
            };
            self.entries.insert(key.clone(), fetched);
        }

        Ok(self.entries.get(&key).and_then(|e| e.as_deref()))
    }

    /// Number of times the underlying source was queried.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
