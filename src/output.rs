//! Persistence of tables and snapshots.
//!
//! Tables are CSV files read and written through the typed records in
//! [`crate::model`]; API snapshots and download sessions are JSON.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{InsightError, Result};

fn require_suffix(path: &Path, suffix: &str) -> Result<()> {
    if path.to_string_lossy().ends_with(suffix) {
        Ok(())
    } else {
        Err(InsightError::InvalidInput(format!(
            "Path must have {suffix} suffix: {}",
            path.display()
        )))
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: impl AsRef<Path>, record: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    require_suffix(path, ".csv")?;
    ensure_parent(path)?;

    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Writes `records` to a fresh CSV file, replacing any existing one.
pub fn write_records<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    require_suffix(path, ".csv")?;
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}

/// Reads every row of a CSV file after checking that its header carries
/// `required_columns`.
pub fn load_records<T: DeserializeOwned>(path: impl AsRef<Path>, required_columns: &[&str]) -> Result<Vec<T>> {
    let path = path.as_ref();
    require_suffix(path, ".csv")?;

    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let headers = rdr.headers()?.clone();
    for column in required_columns {
        if !headers.iter().any(|h| h == *column) {
            return Err(InsightError::InvalidInput(format!(
                "Data does not contain {column} column."
            )));
        }
    }

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result?;
        rows.push(record);
    }

    debug!(path = %path.display(), rows = rows.len(), "CSV loaded");
    Ok(rows)
}

/// Saves a JSON snapshot.
pub fn save_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    require_suffix(path, ".json")?;
    ensure_parent(path)?;

    fs::write(path, serde_json::to_vec(value)?)?;
    Ok(())
}

/// Loads a JSON snapshot written by [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    require_suffix(path, ".json")?;

    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
