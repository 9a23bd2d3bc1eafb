//! Typed rows for the tables exchanged with the transit API and stored as CSV.
//!
//! Field names follow the API's column names through `serde` renames so the
//! same structs read API payloads, CSV snapshots and timetable files.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::timestamp_format;

/// Columns every vehicle position table must carry.
pub const VEHICLE_COLUMNS: &[&str] = &["Lines", "Lon", "VehicleNumber", "Time", "Lat", "Brigade"];

/// Columns every stop reference table must carry.
pub const STOP_COLUMNS: &[&str] = &["ID", "Number", "Latitude", "Longitude", "Destination", "Validity"];

/// Columns every timetable table must carry.
pub const TIMETABLE_COLUMNS: &[&str] = &["Brigade", "Destination", "Time"];

/// One polled position of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleObservation {
    #[serde(rename = "Lines")]
    pub line: String,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "VehicleNumber")]
    pub vehicle_number: String,
    #[serde(rename = "Time", with = "timestamp_format")]
    pub time: NaiveDateTime,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Brigade")]
    pub brigade: String,
}

/// A stop post from the stop reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Number")]
    pub number: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Destination")]
    pub destination: String,
    #[serde(rename = "Validity", alias = "ValiditySince")]
    pub validity_since: String,
}

/// A scheduled departure of one brigade from one stop.
///
/// `time` is kept as served: a wall-clock string whose hour may exceed 23.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(rename = "Brigade")]
    pub brigade: String,
    #[serde(rename = "Destination")]
    pub destination: String,
    #[serde(rename = "Time")]
    pub time: String,
}

/// Midpoint of two consecutive observations that imply a speed above the limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedIncident {
    #[serde(rename = "Lines")]
    pub line: String,
    #[serde(rename = "Speed")]
    pub speed: f64,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Time", with = "timestamp_format")]
    pub time: NaiveDateTime,
}

/// Punctuality records of one line; `true` marks a late stop visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinePunctuality {
    pub line: String,
    pub records: Vec<bool>,
}

impl LinePunctuality {
    pub fn incidents(&self) -> usize {
        self.records.iter().filter(|late| **late).count()
    }
}

/// Punctuality records for every line, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PunctualityByLine {
    pub lines: Vec<LinePunctuality>,
}

impl PunctualityByLine {
    pub fn get(&self, line: &str) -> Option<&[bool]> {
        self.lines
            .iter()
            .find(|l| l.line == line)
            .map(|l| l.records.as_slice())
    }
}
