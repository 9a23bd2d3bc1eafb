//! Restricting observation tables by line, brigade and time.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::clock::parse_timestamp;
use crate::error::Result;
use crate::model::VehicleObservation;

/// Observations of one line.
pub fn of_line(data: &[VehicleObservation], line: &str) -> Vec<VehicleObservation> {
    data.iter().filter(|o| o.line == line).cloned().collect()
}

/// Observations of one brigade.
pub fn of_brigade(data: &[VehicleObservation], brigade: &str) -> Vec<VehicleObservation> {
    data.iter().filter(|o| o.brigade == brigade).cloned().collect()
}

/// Observations with `start <= time <= end`.
pub fn of_time_window(data: &[VehicleObservation], start: NaiveDateTime, end: NaiveDateTime) -> Vec<VehicleObservation> {
    data.iter()
        .filter(|o| start <= o.time && o.time <= end)
        .cloned()
        .collect()
}

/// Same as [`of_time_window`] with bounds given as timestamp strings.
pub fn of_time_window_str(data: &[VehicleObservation], start: &str, end: &str) -> Result<Vec<VehicleObservation>> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    Ok(of_time_window(data, start, end))
}

/// Drops repeated rows, keeping the first occurrence. Consecutive polls often
/// return an unchanged position for vehicles that did not report in between.
pub fn remove_duplicates(data: &[VehicleObservation]) -> Vec<VehicleObservation> {
    let mut seen = HashSet::new();
    data.iter()
        .filter(|o| {
            seen.insert((
                o.line.clone(),
                o.vehicle_number.clone(),
                o.brigade.clone(),
                o.lat.to_bits(),
                o.lon.to_bits(),
                o.time,
            ))
        })
        .cloned()
        .collect()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

/// Lines in order of first appearance.
pub fn distinct_lines(data: &[VehicleObservation]) -> Vec<&str> {
    distinct(data.iter().map(|o| o.line.as_str()))
}

/// Brigades in order of first appearance.
pub fn distinct_brigades(data: &[VehicleObservation]) -> Vec<&str> {
    distinct(data.iter().map(|o| o.brigade.as_str()))
}

/// A copy of `data` in ascending time order; ties keep their input order.
pub fn sorted_by_time(data: &[VehicleObservation]) -> Vec<VehicleObservation> {
    let mut sorted = data.to_vec();
    sorted.sort_by_key(|o| o.time);
    sorted
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn obs(line: &str, brigade: &str, lat: f64, lon: f64, time: &str) -> VehicleObservation {
        VehicleObservation {
            line: line.to_string(),
            lon,
            vehicle_number: "1001".to_string(),
            time: parse_timestamp(time).unwrap(),
            lat,
            brigade: brigade.to_string(),
        }
    }

    fn sample() -> Vec<VehicleObservation> {
        vec![
            obs("213", "2", 52.22, 21.09, "2021-02-01 13:30:00"),
            obs("138", "05", 52.22, 21.09, "2021-02-01 12:30:00"),
            obs("213", "3", 52.23, 21.08, "2021-02-01 14:30:00"),
        ]
    }

    #[test]
    fn test_of_line_and_brigade() {
        let data = sample();
        assert_eq!(of_line(&data, "213").len(), 2);
        assert_eq!(of_line(&data, "999").len(), 0);
        assert_eq!(of_brigade(&data, "05")[0].line, "138");
    }

    #[test]
    fn test_of_time_window_is_inclusive() {
        let data = sample();
        let window = of_time_window_str(&data, "2021-02-01 12:15:00", "2021-02-01 13:30:00").unwrap();
        assert_eq!(window.len(), 2);

        let single = of_time_window_str(&data, "2021-02-01 12:15:00", "2021-02-01 13:15:00").unwrap();
        assert_eq!(single, vec![data[1].clone()]);
    }

    #[test]
    fn test_of_time_window_rejects_bad_bounds() {
        let data = sample();
        assert!(of_time_window_str(&data, "2021-02-01 12.15.00", "2021-02-01 13:15:00").is_err());
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let mut data = sample();
        data.push(data[0].clone());
        data.insert(1, data[0].clone());

        let unique = remove_duplicates(&data);
        assert_eq!(unique, sample());
    }

    #[test]
    fn test_distinct_and_sorted() {
        let data = sample();
        assert_eq!(distinct_lines(&data), vec!["213", "138"]);
        assert_eq!(distinct_brigades(&data), vec!["2", "05", "3"]);

        let sorted = sorted_by_time(&data);
        assert_eq!(distinct_lines(&sorted), vec!["138", "213"]);
    }
}
