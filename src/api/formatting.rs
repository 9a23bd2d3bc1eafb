//! Validation and reshaping of raw API responses.
//!
//! The vehicle endpoint serves plain JSON objects. The stop and timetable
//! endpoints wrap every row as a list of `{"key": ..., "value": ...}` pairs.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::clock::correct_time;
use crate::error::{InsightError, Result};
use crate::model::{StopRecord, TimetableEntry, VehicleObservation};

#[derive(Debug, Deserialize)]
struct KeyValue {
    key: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValuesRow {
    values: Vec<KeyValue>,
}

impl ValuesRow {
    fn field(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_deref())
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.field(key)
            .ok_or_else(|| InsightError::InvalidDomain(format!("Response row does not contain '{key}'.")))
    }
}

fn message_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Checks that `response` carries a list under `result`.
///
/// The API answers HTTP 200 even for rejected calls, so the failure is
/// encoded in the body: a missing `result` means no data at all, an `error`
/// key or a non-list `result` means the call was refused.
pub fn validate_response(url: &str, response: &Value) -> Result<()> {
    let Some(result) = response.get("result") else {
        return Err(InsightError::Upstream {
            code: 204,
            message: format!("Empty data. ({url})"),
        });
    };

    if let Some(error) = response.get("error") {
        return Err(InsightError::Upstream {
            code: 400,
            message: message_of(error),
        });
    }

    if !result.is_array() {
        return Err(InsightError::Upstream {
            code: 400,
            message: message_of(result),
        });
    }

    Ok(())
}

fn result_of(response: &Value) -> &Value {
    response.get("result").unwrap_or(&Value::Null)
}

fn rows(response: &Value) -> Result<Vec<ValuesRow>> {
    Ok(Vec::<ValuesRow>::deserialize(result_of(response))?)
}

pub fn format_active_vehicles(response: &Value) -> Result<Vec<VehicleObservation>> {
    Ok(Vec::<VehicleObservation>::deserialize(result_of(response))?)
}

/// Stop posts with usable coordinates. Rows without them are dropped.
pub fn format_stop_coordinates(response: &Value) -> Result<Vec<StopRecord>> {
    let rows = rows(response)?;
    let total = rows.len();

    let mut stops = Vec::with_capacity(total);
    for row in &rows {
        let latitude = row.field("szer_geo").and_then(|v| v.parse::<f64>().ok());
        let longitude = row.field("dlug_geo").and_then(|v| v.parse::<f64>().ok());
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            continue;
        };

        stops.push(StopRecord {
            id: row.require("zespol")?.to_string(),
            number: row.require("slupek")?.to_string(),
            latitude,
            longitude,
            destination: row.field("kierunek").unwrap_or_default().to_string(),
            validity_since: row.field("obowiazuje_od").unwrap_or_default().to_string(),
        });
    }

    if stops.len() < total {
        debug!(dropped = total - stops.len(), "Stops without coordinates dropped");
    }
    Ok(stops)
}

/// Timetable rows with hours folded into `0..24`.
///
/// An empty result means the stop has no departures of the line.
pub fn format_timetable(response: &Value) -> Result<Vec<TimetableEntry>> {
    let rows = rows(response)?;
    if rows.is_empty() {
        return Err(InsightError::LookupMiss(
            "Incorrect bus stop or line number. No results found.".to_string(),
        ));
    }

    rows.iter()
        .map(|row| {
            Ok(TimetableEntry {
                brigade: row.require("brygada")?.to_string(),
                destination: row.field("kierunek").unwrap_or_default().to_string(),
                time: correct_time(row.require("czas")?)?,
            })
        })
        .collect()
}

/// Values of `key` from every row, e.g. stop ids or line numbers.
pub fn format_values(response: &Value, key: &str, what: &str) -> Result<Vec<String>> {
    let values: Vec<String> = rows(response)?
        .iter()
        .filter_map(|row| row.field(key).map(str::to_string))
        .collect();

    if values.is_empty() {
        return Err(InsightError::LookupMiss(format!("Incorrect {what}. No results found.")));
    }
    Ok(values)
}
