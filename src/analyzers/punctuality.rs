//! Schedule punctuality of observed vehicles.
//!
//! Every observation that lies next to a stop is compared with that stop's
//! timetable for the observation's line and brigade. The gap is measured from
//! the observation to the earliest re-anchored departure, so departures
//! scheduled before the visit give negative gaps. A gap of at least the
//! threshold counts as a punctuality incident.

use chrono::NaiveDateTime;
use tracing::{debug, info, trace};

use crate::analyzers::filter::{distinct_brigades, distinct_lines, of_brigade, of_line, sorted_by_time};
use crate::analyzers::geo::{nearest_stop, proximity_to_tolerance};
use crate::analyzers::report::punctuality_summary;
use crate::analyzers::timetable::{TimetableCache, TimetableSource};
use crate::clock::{anchor_to_service_day, parse_time_of_day};
use crate::error::{InsightError, Result};
use crate::model::{LinePunctuality, PunctualityByLine, StopRecord, TimetableEntry, VehicleObservation};

/// Knobs of a punctuality pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunctualityOptions {
    /// How close (in metres) a vehicle must be to count as being at a stop.
    pub proximity_m: u32,
    /// Smallest gap to the timetable, in minutes, that counts as an incident.
    pub threshold_minutes: u32,
    /// Log progress after every brigade.
    pub verbose: bool,
}

impl Default for PunctualityOptions {
    fn default() -> Self {
        Self {
            proximity_m: 10,
            threshold_minutes: 1,
            verbose: false,
        }
    }
}

/// Punctuality records for the observations of a single line.
///
/// One boolean per observation that could be matched to a stop with a usable
/// timetable; `true` marks an incident.
pub fn punctuality_for_line<S: TimetableSource + ?Sized>(
    observations: &[VehicleObservation],
    stops: &[StopRecord],
    source: &S,
    options: &PunctualityOptions,
) -> Result<Vec<bool>> {
    let mut cache = TimetableCache::new(source);
    line_pass(observations, stops, &mut cache, options)
}

/// Punctuality records for every line in `observations`, in order of first
/// appearance. Timetables are looked up at most once per stop and line.
#[tracing::instrument(skip_all, fields(observations = observations.len(), stops = stops.len()))]
pub fn punctuality_for_lines<S: TimetableSource + ?Sized>(
    observations: &[VehicleObservation],
    stops: &[StopRecord],
    source: &S,
    options: &PunctualityOptions,
) -> Result<PunctualityByLine> {
    let mut cache = TimetableCache::new(source);
    let mut by_line = PunctualityByLine::default();

    for line in distinct_lines(observations) {
        let subset = of_line(observations, line);
        let records = line_pass(&subset, stops, &mut cache, options)?;
        by_line.lines.push(LinePunctuality {
            line: line.to_string(),
            records,
        });
    }

    info!(
        lines = by_line.lines.len(),
        timetable_lookups = cache.lookups(),
        "Punctuality pass finished"
    );
    Ok(by_line)
}

/// Human readable ranking of lines by share of punctuality incidents.
pub fn punctuality_report<S: TimetableSource + ?Sized>(
    observations: &[VehicleObservation],
    stops: &[StopRecord],
    source: &S,
    options: &PunctualityOptions,
) -> Result<String> {
    let by_line = punctuality_for_lines(observations, stops, source, options)?;
    Ok(punctuality_summary(&by_line))
}

fn line_pass<S: TimetableSource + ?Sized>(
    observations: &[VehicleObservation],
    stops: &[StopRecord],
    cache: &mut TimetableCache<'_, S>,
    options: &PunctualityOptions,
) -> Result<Vec<bool>> {
    let Some(first) = observations.first() else {
        return Ok(Vec::new());
    };
    let line = first.line.as_str();
    if observations.iter().any(|o| o.line != line) {
        return Err(InsightError::InvalidDomain(
            "Data does not consist of information from single line.".to_string(),
        ));
    }

    let tolerance = proximity_to_tolerance(options.proximity_m);
    let threshold_ms = i64::from(options.threshold_minutes) * 60_000;

    let brigades = distinct_brigades(observations);
    let total = brigades.len();
    let mut records = Vec::new();

    for (done, brigade) in brigades.into_iter().enumerate() {
        let run = sorted_by_time(&of_brigade(observations, brigade));
        let Some(reference) = run.first().map(|o| o.time) else {
            continue;
        };

        for obs in &run {
            if let Some(late) = classify_visit(obs, reference, stops, cache, tolerance, threshold_ms)? {
                records.push(late);
            }
        }

        if options.verbose {
            info!(line, brigade, done = done + 1, total, "Punctuality progress");
        }
    }

    Ok(records)
}

fn classify_visit<S: TimetableSource + ?Sized>(
    obs: &VehicleObservation,
    reference: NaiveDateTime,
    stops: &[StopRecord],
    cache: &mut TimetableCache<'_, S>,
    tolerance: f64,
    threshold_ms: i64,
) -> Result<Option<bool>> {
    let Some(stop) = nearest_stop(obs.lat, obs.lon, stops, tolerance) else {
        trace!(line = %obs.line, brigade = %obs.brigade, time = %obs.time, "No stop nearby");
        return Ok(None);
    };

    let Some(entries) = cache.get(&stop.id, &stop.number, &obs.line)? else {
        return Ok(None);
    };

    let scheduled = match scheduled_times(entries, &obs.brigade, reference) {
        Ok(times) => times,
        Err(e) if e.is_soft() => {
            debug!(stop_id = %stop.id, line = %obs.line, error = %e, "Skipping unreadable timetable");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    // Signed: departures scheduled before the visit give negative gaps.
    let gap_ms = scheduled
        .iter()
        .map(|t| (*t - obs.time).num_milliseconds())
        .min();

    Ok(gap_ms.map(|gap| gap >= threshold_ms))
}

/// Departures of `brigade`, placed on the service day that starts at
/// `reference`.
fn scheduled_times(entries: &[TimetableEntry], brigade: &str, reference: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
    let times = entries
        .iter()
        .filter(|e| e.brigade.trim() == brigade.trim())
        .map(|e| parse_time_of_day(&e.time))
        .collect::<Result<Vec<_>>>()?;

    anchor_to_service_day(&times, reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::filter::tests::obs;
    use crate::analyzers::timetable::tests::FakeTimetables;

    const STOP_LAT: f64 = 52.224536;
    const STOP_LON: f64 = 21.0921481;

    fn stops() -> Vec<StopRecord> {
        vec![StopRecord {
            id: "1001".to_string(),
            number: "01".to_string(),
            latitude: STOP_LAT,
            longitude: STOP_LON,
            destination: "al.Zieleniecka".to_string(),
            validity_since: "2020-10-12 00:00:00.0".to_string(),
        }]
    }

    /// Brigade "2" leaves the depot at 15:20 and passes the stop at 15:45:27.
    fn line_213() -> Vec<VehicleObservation> {
        vec![
            obs("213", "2", 52.3, 21.3, "2021-02-09 15:20:00"),
            obs("213", "2", STOP_LAT, STOP_LON, "2021-02-09 15:45:27"),
            obs("213", "2", 52.2223788, 21.0911025, "2021-02-09 15:46:22"),
        ]
    }

    fn records_for(timetable: &[(&str, &str, &str)]) -> Vec<bool> {
        let source = FakeTimetables::new(timetable);
        punctuality_for_line(&line_213(), &stops(), &source, &PunctualityOptions::default()).unwrap()
    }

    #[test]
    fn test_on_time_within_threshold() {
        assert_eq!(records_for(&[("213", "2", "15:46:00")]), vec![false]);
    }

    #[test]
    fn test_departure_beyond_threshold_is_incident() {
        assert_eq!(records_for(&[("213", "2", "15:50:00")]), vec![true]);
    }

    #[test]
    fn test_departure_before_visit_is_not_incident() {
        assert_eq!(records_for(&[("213", "2", "15:40:00")]), vec![false]);
    }

    #[test]
    fn test_gap_equal_to_threshold_is_incident() {
        assert_eq!(records_for(&[("213", "2", "15:46:27")]), vec![true]);
        assert_eq!(records_for(&[("213", "2", "15:46:26")]), vec![false]);
    }

    #[test]
    fn test_smallest_signed_gap_decides() {
        assert_eq!(
            records_for(&[("213", "2", "15:30:00"), ("213", "2", "15:45:00"), ("213", "2", "16:00:00")]),
            vec![false]
        );
        assert_eq!(records_for(&[("213", "2", "16:00:00"), ("213", "2", "15:50:00")]), vec![true]);
    }

    #[test]
    fn test_departure_before_reference_moves_to_next_day() {
        // 15:10 precedes the brigade's first position, so it belongs to the next day.
        assert_eq!(records_for(&[("213", "2", "15:10:00")]), vec![true]);
    }

    #[test]
    fn test_past_midnight_departure_is_reanchored() {
        let data = vec![
            obs("N01", "1", 52.3, 21.3, "2021-02-09 23:50:00"),
            obs("N01", "1", STOP_LAT, STOP_LON, "2021-02-10 00:10:00"),
        ];
        let source = FakeTimetables::new(&[("N01", "1", "24:10:30")]);

        let records = punctuality_for_line(&data, &stops(), &source, &PunctualityOptions::default()).unwrap();
        assert_eq!(records, vec![false]);
    }

    #[test]
    fn test_other_brigades_are_ignored() {
        let source = FakeTimetables::new(&[("213", "3", "15:46:00")]);
        let records = punctuality_for_line(&line_213(), &stops(), &source, &PunctualityOptions::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_timetable_is_skipped() {
        let source = FakeTimetables::new(&[("213", "2", "quarter to four")]);
        let records = punctuality_for_line(&line_213(), &stops(), &source, &PunctualityOptions::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_no_nearby_stop_means_no_record() {
        let data = vec![obs("213", "2", 52.3, 21.3, "2021-02-09 15:45:27")];
        let source = FakeTimetables::new(&[("213", "2", "15:46:00")]);

        let records = punctuality_for_line(&data, &stops(), &source, &PunctualityOptions::default()).unwrap();
        assert!(records.is_empty());
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn test_wider_proximity_matches_more() {
        let source = FakeTimetables::new(&[("213", "2", "15:46:00")]);
        let options = PunctualityOptions {
            proximity_m: 400,
            ..Default::default()
        };

        let records = punctuality_for_line(&line_213(), &stops(), &source, &options).unwrap();
        assert_eq!(records, vec![false, false]);
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_mixed_lines_rejected() {
        let mut data = line_213();
        data.push(obs("138", "05", STOP_LAT, STOP_LON, "2021-02-09 15:45:27"));
        let source = FakeTimetables::new(&[]);

        let err = punctuality_for_line(&data, &stops(), &source, &PunctualityOptions::default()).unwrap_err();
        assert!(matches!(err, InsightError::InvalidDomain(_)));
    }

    #[test]
    fn test_hard_source_failure_aborts() {
        let mut source = FakeTimetables::new(&[]);
        source.fail_hard = true;

        let result = punctuality_for_line(&line_213(), &stops(), &source, &PunctualityOptions::default());
        assert!(matches!(result, Err(InsightError::Upstream { .. })));
    }

    #[test]
    fn test_lines_and_report() {
        let mut data = line_213();
        data.push(obs("138", "05", STOP_LAT, STOP_LON, "2021-02-09 15:45:27"));
        data.push(obs("138", "05", 52.2223788, 21.0911025, "2021-02-09 15:46:22"));
        let source = FakeTimetables::new(&[("213", "2", "15:46:00"), ("138", "05", "15:50:00")]);
        let options = PunctualityOptions::default();

        let by_line = punctuality_for_lines(&data, &stops(), &source, &options).unwrap();
        assert_eq!(by_line.get("213"), Some(&[false][..]));
        assert_eq!(by_line.get("138"), Some(&[true][..]));

        let report = punctuality_report(&data, &stops(), &source, &options).unwrap();
        assert_eq!(
            report,
            "Percentage of punctuality incidents:\n- 138 line: 100.0% incidents.\n- 213 line: 0.0% incidents.\n"
        );
    }

    #[test]
    fn test_repeated_pass_is_identical() {
        let data = line_213();
        let source = FakeTimetables::new(&[("213", "2", "15:50:00")]);
        let options = PunctualityOptions::default();

        let first = punctuality_for_lines(&data, &stops(), &source, &options).unwrap();
        let second = punctuality_for_lines(&data, &stops(), &source, &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(data, line_213());
    }
}
