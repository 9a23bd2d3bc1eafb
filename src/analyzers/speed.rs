//! Speed-limit violations derived from consecutive positions of one vehicle.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::filter::{distinct_brigades, distinct_lines, of_brigade, of_line, sorted_by_time};
use crate::analyzers::geo::haversine_km;
use crate::analyzers::report::{short_speed_summary, top_lines_summary, top_places_summary};
use crate::analyzers::utility::{linspace, mean};
use crate::error::{InsightError, Result};
use crate::model::{SpeedIncident, VehicleObservation};

/// Speeds at or above this are GPS noise, not driving.
pub const SPEED_CEILING_KMH: f64 = 150.0;

/// Edges per axis of the grid used to locate incident hot spots.
pub const GRID_EDGES: usize = 9;

/// How many lines and places the full summary ranks.
const TOP_N: usize = 3;

fn elapsed_hours(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds().abs() as f64 / 3_600_000.0
}

fn midpoint(a: &VehicleObservation, b: &VehicleObservation, speed: f64) -> SpeedIncident {
    SpeedIncident {
        line: a.line.clone(),
        speed,
        lat: mean(&[a.lat, b.lat]),
        lon: mean(&[a.lon, b.lon]),
        time: a.time + (b.time - a.time) / 2,
    }
}

/// Speed incidents of a single vehicle run.
///
/// `data` must hold observations of exactly one line and brigade. Pairs of
/// consecutive positions are flagged when the implied speed lies strictly
/// between `speed_limit` and [`SPEED_CEILING_KMH`].
pub fn speed_incidents_for_bus(data: &[VehicleObservation], speed_limit: u32) -> Result<Vec<SpeedIncident>> {
    let Some(first) = data.first() else {
        return Err(InsightError::InvalidInput("No observations to analyse.".to_string()));
    };
    if data
        .iter()
        .any(|o| o.line != first.line || o.brigade != first.brigade)
    {
        return Err(InsightError::InvalidDomain(
            "Data does not consist of information from single bus/brigade.".to_string(),
        ));
    }

    let limit = f64::from(speed_limit);
    let sorted = sorted_by_time(data);
    let mut incidents = Vec::new();

    for pair in sorted.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let hours = elapsed_hours(a.time, b.time);
        if hours == 0.0 {
            continue;
        }

        let speed = haversine_km(a.lat, a.lon, b.lat, b.lon) / hours;
        if limit < speed && speed < SPEED_CEILING_KMH {
            incidents.push(midpoint(a, b, speed));
        }
    }

    Ok(incidents)
}

/// Speed incidents of every vehicle run, grouped by line then brigade.
#[tracing::instrument(skip(data), fields(observations = data.len()))]
pub fn all_incidents(data: &[VehicleObservation], speed_limit: u32) -> Result<Vec<SpeedIncident>> {
    if data.is_empty() {
        return Err(InsightError::InvalidInput("No observations to analyse.".to_string()));
    }

    let sorted = sorted_by_time(data);
    let mut report = Vec::new();

    for line in distinct_lines(&sorted) {
        let per_line = of_line(&sorted, line);
        for brigade in distinct_brigades(&per_line) {
            let per_brigade = of_brigade(&per_line, brigade);
            report.extend(speed_incidents_for_bus(&per_brigade, speed_limit)?);
        }
    }

    debug!(incidents = report.len(), "Speed incidents collected");
    Ok(report)
}

/// Incident count and share of lines with at least one incident.
pub fn short_incidents_summary(data: &[VehicleObservation], speed_limit: u32) -> Result<(String, Vec<SpeedIncident>)> {
    let incidents = all_incidents(data, speed_limit)?;

    let lines_with_incidents = distinct_lines_of(&incidents).len();
    let total_lines = distinct_lines(data).len();
    let summary = short_speed_summary(speed_limit, incidents.len(), lines_with_incidents, total_lines);

    Ok((summary, incidents))
}

/// The short summary followed by the top lines and top places.
pub fn full_incidents_summary(data: &[VehicleObservation], speed_limit: u32) -> Result<(String, Vec<LineHotspot>)> {
    let (mut summary, incidents) = short_incidents_summary(data, speed_limit)?;

    summary.push_str(&top_lines_summary(&top_lines(&incidents, TOP_N)));

    let hotspots = line_hotspots(&incidents);
    let places = densest_cells(&hotspots, TOP_N);
    summary.push_str(&top_places_summary(&places));

    Ok((summary, hotspots))
}

fn distinct_lines_of(incidents: &[SpeedIncident]) -> Vec<&str> {
    let mut lines: Vec<&str> = Vec::new();
    for incident in incidents {
        if !lines.contains(&incident.line.as_str()) {
            lines.push(&incident.line);
        }
    }
    lines
}

/// Lines with the most incidents; ties keep first-appearance order.
pub fn top_lines(incidents: &[SpeedIncident], n: usize) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = distinct_lines_of(incidents)
        .into_iter()
        .map(|line| (line, incidents.iter().filter(|i| i.line == line).count()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

/// Mean incident position of one line and the grid cell it falls in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineHotspot {
    pub line: String,
    pub lat: f64,
    pub lon: f64,
    pub lat_cell: usize,
    pub lon_cell: usize,
}

/// A grid cell center and how many line hot spots fall into the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCount {
    pub lat: f64,
    pub lon: f64,
    pub count: usize,
}

/// Evenly spaced edges spanning the bounding box of a set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentGrid {
    lat_edges: [f64; GRID_EDGES],
    lon_edges: [f64; GRID_EDGES],
}

impl IncidentGrid {
    /// Grid over the bounding box of `(lat, lon)` points; `None` when empty.
    pub fn spanning(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let min_lat = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_lat = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_lon = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_lon = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            lat_edges: linspace(min_lat, max_lat),
            lon_edges: linspace(min_lon, max_lon),
        })
    }

    fn index(value: f64, edges: &[f64; GRID_EDGES]) -> usize {
        edges[1..].iter().position(|edge| value <= *edge).unwrap_or(0)
    }

    fn center(idx: usize, edges: &[f64; GRID_EDGES]) -> f64 {
        (edges[idx] + edges[idx + 1]) / 2.0
    }

    /// `(lat_cell, lon_cell)` of a point.
    pub fn cell_of(&self, lat: f64, lon: f64) -> (usize, usize) {
        (Self::index(lat, &self.lat_edges), Self::index(lon, &self.lon_edges))
    }

    /// Center coordinates of a cell.
    pub fn cell_center(&self, lat_cell: usize, lon_cell: usize) -> (f64, f64) {
        (Self::center(lat_cell, &self.lat_edges), Self::center(lon_cell, &self.lon_edges))
    }
}

/// Mean incident position per line, placed on a grid spanning all of them.
pub fn line_hotspots(incidents: &[SpeedIncident]) -> Vec<LineHotspot> {
    let centroids: Vec<(&str, f64, f64)> = distinct_lines_of(incidents)
        .into_iter()
        .map(|line| {
            let (lats, lons): (Vec<f64>, Vec<f64>) = incidents
                .iter()
                .filter(|i| i.line == line)
                .map(|i| (i.lat, i.lon))
                .unzip();
            (line, mean(&lats), mean(&lons))
        })
        .collect();

    let points: Vec<(f64, f64)> = centroids.iter().map(|c| (c.1, c.2)).collect();
    let Some(grid) = IncidentGrid::spanning(&points) else {
        return Vec::new();
    };

    centroids
        .into_iter()
        .map(|(line, lat, lon)| {
            let (lat_cell, lon_cell) = grid.cell_of(lat, lon);
            LineHotspot {
                line: line.to_string(),
                lat,
                lon,
                lat_cell,
                lon_cell,
            }
        })
        .collect()
}

/// The `n` cells holding the most hot spots; ties go to the lower cell index.
pub fn densest_cells(hotspots: &[LineHotspot], n: usize) -> Vec<PlaceCount> {
    let points: Vec<(f64, f64)> = hotspots.iter().map(|h| (h.lat, h.lon)).collect();
    let Some(grid) = IncidentGrid::spanning(&points) else {
        return Vec::new();
    };

    let mut per_cell: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for h in hotspots {
        *per_cell.entry((h.lat_cell, h.lon_cell)).or_default() += 1;
    }

    let mut cells: Vec<((usize, usize), usize)> = per_cell.into_iter().collect();
    cells.sort_by(|a, b| b.1.cmp(&a.1));
    cells.truncate(n);

    cells
        .into_iter()
        .map(|((lat_cell, lon_cell), count)| {
            let (lat, lon) = grid.cell_center(lat_cell, lon_cell);
            PlaceCount { lat, lon, count }
        })
        .collect()
}
