use std::path::PathBuf;

use transit_insights::analyzers::filter::{of_time_window_str, remove_duplicates};
use transit_insights::analyzers::punctuality::{PunctualityOptions, punctuality_for_lines, punctuality_report};
use transit_insights::analyzers::speed::{full_incidents_summary, short_incidents_summary};
use transit_insights::analyzers::timetable::DirectoryTimetables;
use transit_insights::config::AnalysisConfig;
use transit_insights::error::InsightError;
use transit_insights::model::{STOP_COLUMNS, StopRecord, VEHICLE_COLUMNS, VehicleObservation};
use transit_insights::output::{load_records, write_records};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn vehicles() -> Vec<VehicleObservation> {
    let data: Vec<VehicleObservation> =
        load_records(fixture("active_buses.csv"), VEHICLE_COLUMNS).expect("Failed to load vehicles");
    remove_duplicates(&data)
}

fn stops() -> Vec<StopRecord> {
    load_records(fixture("stops.csv"), STOP_COLUMNS).expect("Failed to load stops")
}

#[test]
fn test_fixture_tables_load() {
    let data = vehicles();
    assert_eq!(data.len(), 4);
    assert_eq!(data[2].brigade, "05");

    let stops = stops();
    assert_eq!(stops[0].number, "01");
    assert_eq!(stops[0].validity_since, "2020-10-12 00:00:00.0");
}

#[test]
fn test_speed_pipeline() {
    let (summary, incidents) = short_incidents_summary(&vehicles(), 10).unwrap();
    assert_eq!(
        summary,
        "Speed limit: 10 km/h.\nTotal number of incidents: 2.\n2/2 buses had incidents (100.0%).\n"
    );

    let path = std::env::temp_dir().join("transit_insights_it_incidents.csv");
    write_records(&path, &incidents).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("Lines,Speed,Lat,Lon,Time\n213,"));
    std::fs::remove_file(&path).unwrap();

    let (full, _) = full_incidents_summary(&vehicles(), 10).unwrap();
    assert!(full.ends_with("(52.22, 21.09) - 2 incidents.\n"));

    let (summary, incidents) = short_incidents_summary(&vehicles(), 50).unwrap();
    assert_eq!(
        summary,
        "Speed limit: 50 km/h.\nTotal number of incidents: 0.\n0/2 buses had incidents (0.0%).\n"
    );
    assert!(incidents.is_empty());
}

#[test]
fn test_time_window_leaves_single_positions() {
    let window = of_time_window_str(&vehicles(), "2021-02-09 15:45:00", "2021-02-09 15:46:00").unwrap();
    assert_eq!(window.len(), 2);

    let (summary, _) = short_incidents_summary(&window, 10).unwrap();
    assert!(summary.contains("Total number of incidents: 0."));
}

#[test]
fn test_punctuality_from_timetable_directory() {
    let source = DirectoryTimetables::new(fixture("timetables"));
    let options = PunctualityOptions::default();

    let by_line = punctuality_for_lines(&vehicles(), &stops(), &source, &options).unwrap();
    assert_eq!(by_line.get("213"), Some(&[false][..]));
    assert_eq!(by_line.get("138"), Some(&[true][..]));

    let report = punctuality_report(&vehicles(), &stops(), &source, &options).unwrap();
    assert_eq!(
        report,
        "Percentage of punctuality incidents:\n- 138 line: 100.0% incidents.\n- 213 line: 0.0% incidents.\n"
    );
}

#[test]
fn test_punctuality_with_config_file() {
    let config = AnalysisConfig::load(fixture("config.json")).unwrap();
    assert_eq!(config.proximity_m, 10);
    assert_eq!(config.speed_limit_kmh, 10);

    let source = DirectoryTimetables::new(fixture("timetables"));
    let report = punctuality_report(&vehicles(), &stops(), &source, &config.punctuality(false)).unwrap();
    assert_eq!(
        report,
        "Percentage of punctuality incidents:\n- 213 line: 0.0% incidents.\n- 138 line: 0.0% incidents.\n"
    );
}

#[test]
fn test_missing_timetables_are_skipped() {
    let source = DirectoryTimetables::new(fixture("no_timetables_here"));
    let by_line = punctuality_for_lines(&vehicles(), &stops(), &source, &PunctualityOptions::default()).unwrap();

    assert_eq!(by_line.get("213"), Some(&[][..]));
    assert_eq!(by_line.get("138"), Some(&[][..]));
}

#[test]
fn test_empty_timetable_file_skips_only_its_line() {
    let dir = std::env::temp_dir().join("transit_insights_it_empty_timetable");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("timetable_1001_01_213.csv"), "").unwrap();
    std::fs::copy(
        fixture("timetables/timetable_1001_01_138.csv"),
        dir.join("timetable_1001_01_138.csv"),
    )
    .unwrap();

    let source = DirectoryTimetables::new(&dir);
    let by_line = punctuality_for_lines(&vehicles(), &stops(), &source, &PunctualityOptions::default()).unwrap();
    assert_eq!(by_line.get("213"), Some(&[][..]));
    assert_eq!(by_line.get("138"), Some(&[true][..]));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_vehicle_table_without_brigade_column() {
    let path = std::env::temp_dir().join("transit_insights_it_no_brigade.csv");
    std::fs::write(&path, "Lines,Lon,VehicleNumber,Time,Lat\n213,21.09,1001,2021-02-09 15:45:27,52.22\n").unwrap();

    let err = load_records::<VehicleObservation>(&path, VEHICLE_COLUMNS).unwrap_err();
    assert!(matches!(err, InsightError::InvalidInput(_)));
    assert_eq!(err.to_string(), "invalid input: Data does not contain Brigade column.");

    std::fs::remove_file(&path).unwrap();
}
