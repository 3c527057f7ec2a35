//! Tests for pipeline module
//!
//! Covers the end-to-end scenarios: a sustained encounter, an encounter
//! interrupted by a reporting silence, lone vessels, tile-boundary
//! behavior, and failure isolation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use stsdetect::{
    CsvSource, Detector, DetectorConfig, InMemorySource, PositionRecord, PositionSource,
    RegionBounds, Result, StsError,
};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 9, h, m, 0).unwrap()
}

fn record(vessel_id: u64, t: DateTime<Utc>, lon: f64, lat: f64) -> PositionRecord {
    PositionRecord::new(vessel_id, t, lon, lat)
}

fn config() -> DetectorConfig {
    DetectorConfig {
        region: RegionBounds::new(55.0, 90.0, -10.0, 45.0),
        resample_step: Duration::minutes(10),
        max_interpolation_gap: Duration::minutes(30),
        distance_threshold_m: 50.0,
        min_point_count: 2,
        ..DetectorConfig::default()
    }
}

/// Two vessels 40 m apart reporting together at the given times.
fn close_pair_at(times: &[DateTime<Utc>]) -> Vec<PositionRecord> {
    let mut records = Vec::new();
    for &t in times {
        records.push(record(100, t, 5.0, 60.0));
        records.push(record(200, t, 5.0, 60.0 + 40.0 / METERS_PER_DEG_LAT));
    }
    records
}

#[test]
fn test_sustained_encounter_yields_one_run() {
    let times = [at(10, 0), at(10, 10), at(10, 20), at(10, 30)];
    let source = InMemorySource::new(close_pair_at(&times));

    let output = Detector::new(config()).unwrap().run(&source).unwrap();

    assert_eq!(output.runs.len(), 1);
    let run = &output.runs[0];
    assert_eq!((run.vessel_id_1, run.vessel_id_2), (100, 200));
    assert_eq!(run.start_time, at(10, 0));
    assert_eq!(run.end_time, at(10, 30));
    assert_eq!(run.point_count, 4);

    assert_eq!(output.events.len(), 4);
    assert_eq!(output.summary.runs_emitted, 1);
}

#[test]
fn test_reporting_silence_splits_the_encounter() {
    // Both vessels report at 10:00 and 10:10, fall silent for 25 minutes,
    // then resume at 10:35 through 10:55. With a 15-minute interpolation
    // limit the silent window is blanked, producing two separate runs.
    let times = [at(10, 0), at(10, 10), at(10, 35), at(10, 45), at(10, 55)];
    let source = InMemorySource::new(close_pair_at(&times));

    let cfg = DetectorConfig {
        max_interpolation_gap: Duration::minutes(15),
        ..config()
    };
    let output = Detector::new(cfg).unwrap().run(&source).unwrap();

    assert_eq!(output.runs.len(), 2);
    assert_eq!(output.runs[0].start_time, at(10, 0));
    assert_eq!(output.runs[0].end_time, at(10, 10));
    assert_eq!(output.runs[1].start_time, at(10, 40));
    assert_eq!(output.runs[1].end_time, at(10, 50));
}

#[test]
fn test_lone_vessel_is_not_an_error() {
    let records = vec![
        record(100, at(10, 0), 5.0, 60.0),
        record(100, at(10, 10), 5.1, 60.1),
    ];
    let output = Detector::new(config())
        .unwrap()
        .run(&InMemorySource::new(records))
        .unwrap();

    assert!(output.runs.is_empty());
    assert!(output.events.is_empty());
    assert_eq!(output.summary.vessel_days_resampled, 1);
}

#[test]
fn test_thin_vessel_day_is_skipped_not_failed() {
    let records = vec![record(100, at(10, 0), 5.0, 60.0)];
    let output = Detector::new(config())
        .unwrap()
        .run(&InMemorySource::new(records))
        .unwrap();

    assert!(output.runs.is_empty());
    assert_eq!(output.summary.vessel_days_skipped, 1);
}

#[test]
fn test_pair_straddling_a_tile_boundary_is_missed() {
    // Region split at lat 60: two vessels ~40 m apart on opposite sides of
    // the edge land in different tiles, and tiles are processed
    // independently, so no encounter is reported. Accepted limitation.
    let cfg = DetectorConfig {
        region: RegionBounds::new(55.0, 65.0, 0.0, 10.0),
        lat_tiles: 2,
        lon_tiles: 1,
        ..config()
    };

    let offset = 20.0 / METERS_PER_DEG_LAT;
    let mut records = Vec::new();
    for t in [at(10, 0), at(10, 10), at(10, 20)] {
        records.push(record(100, t, 5.0, 60.0 - offset));
        records.push(record(200, t, 5.0, 60.0 + offset));
    }

    let output = Detector::new(cfg).unwrap().run(&InMemorySource::new(records)).unwrap();
    assert!(output.runs.is_empty());

    // The same pair away from the edge is found
    let cfg = DetectorConfig {
        region: RegionBounds::new(55.0, 65.0, 0.0, 10.0),
        lat_tiles: 2,
        lon_tiles: 1,
        ..config()
    };
    let mut records = Vec::new();
    for t in [at(10, 0), at(10, 10), at(10, 20)] {
        records.push(record(100, t, 5.0, 62.0 - offset));
        records.push(record(200, t, 5.0, 62.0 + offset));
    }
    let output = Detector::new(cfg).unwrap().run(&InMemorySource::new(records)).unwrap();
    assert_eq!(output.runs.len(), 1);
}

#[test]
fn test_malformed_records_are_counted_not_fatal() {
    let mut records = close_pair_at(&[at(10, 0), at(10, 10)]);
    records.push(record(300, at(10, 0), f64::NAN, 60.0));

    let output = Detector::new(config())
        .unwrap()
        .run(&InMemorySource::new(records))
        .unwrap();

    assert_eq!(output.runs.len(), 1);
    assert_eq!(output.summary.records_dropped_invalid, 1);
}

#[test]
fn test_speed_gate_drops_moored_vessels() {
    let times = [at(10, 0), at(10, 10), at(10, 20)];
    let records: Vec<PositionRecord> = close_pair_at(&times)
        .into_iter()
        .map(|r| PositionRecord {
            speed: Some(0.1),
            ..r
        })
        .collect();

    let cfg = DetectorConfig {
        min_speed: Some(0.25),
        ..config()
    };
    let output = Detector::new(cfg).unwrap().run(&InMemorySource::new(records)).unwrap();

    assert!(output.runs.is_empty());
    assert_eq!(output.summary.records_filtered_slow, 6);
}

#[test]
fn test_callsign_filter_restricts_the_batch() {
    let times = [at(10, 0), at(10, 10)];
    let records: Vec<PositionRecord> = close_pair_at(&times)
        .into_iter()
        .map(|r| PositionRecord {
            callsign: Some(format!("CS{}", r.vessel_id)),
            ..r
        })
        .collect();

    let cfg = DetectorConfig {
        callsign_filter: Some(HashSet::from(["CS100".to_string()])),
        ..config()
    };
    let output = Detector::new(cfg).unwrap().run(&InMemorySource::new(records)).unwrap();

    // Only one vessel survives the allowlist, so there is nothing to pair
    assert!(output.runs.is_empty());
    assert_eq!(output.summary.records_filtered_callsign, 2);
}

#[test]
fn test_callsigns_carried_into_runs() {
    let times = [at(10, 0), at(10, 10)];
    let records: Vec<PositionRecord> = close_pair_at(&times)
        .into_iter()
        .map(|r| PositionRecord {
            callsign: Some(format!("CS{}", r.vessel_id)),
            ..r
        })
        .collect();

    let output = Detector::new(config())
        .unwrap()
        .run(&InMemorySource::new(records))
        .unwrap();

    assert_eq!(output.runs.len(), 1);
    assert_eq!(output.runs[0].callsign_1.as_deref(), Some("CS100"));
    assert_eq!(output.runs[0].callsign_2.as_deref(), Some("CS200"));
}

/// Source that fails for tiles overlapping a poisoned latitude band.
struct FlakySource {
    inner: InMemorySource,
    poisoned_lat: f64,
}

impl PositionSource for FlakySource {
    fn read_tile(&self, bounds: &RegionBounds) -> Result<Vec<PositionRecord>> {
        if bounds.lat_min <= self.poisoned_lat && self.poisoned_lat < bounds.lat_max {
            return Err(StsError::DataAccess("partition missing".to_string()));
        }
        self.inner.read_tile(bounds)
    }
}

#[test]
fn test_failed_tile_is_isolated() {
    // Encounter at lat 62; tiles covering lat 57 fail to read
    let cfg = DetectorConfig {
        region: RegionBounds::new(55.0, 65.0, 0.0, 10.0),
        lat_tiles: 2,
        lon_tiles: 1,
        ..config()
    };
    let source = FlakySource {
        inner: InMemorySource::new(close_pair_at(&[at(10, 0), at(10, 10)])),
        poisoned_lat: 57.0,
    };

    let output = Detector::new(cfg).unwrap().run(&source).unwrap();
    assert_eq!(output.summary.tiles_failed, 1);
    // close_pair_at places vessels at lat 60, inside the healthy tile
    assert_eq!(output.runs.len(), 1);
}

/// Source that always fails.
struct DeadSource;

impl PositionSource for DeadSource {
    fn read_tile(&self, _bounds: &RegionBounds) -> Result<Vec<PositionRecord>> {
        Err(StsError::DataAccess("disk gone".to_string()))
    }
}

#[test]
fn test_losing_every_tile_is_fatal() {
    let result = Detector::new(config()).unwrap().run(&DeadSource);
    assert!(matches!(result, Err(StsError::DataAccess(_))));
}

#[test]
fn test_invalid_configuration_fails_before_io() {
    for cfg in [
        DetectorConfig {
            lat_tiles: 0,
            ..config()
        },
        DetectorConfig {
            distance_threshold_m: 0.0,
            ..config()
        },
        DetectorConfig {
            resample_step: Duration::zero(),
            ..config()
        },
        DetectorConfig {
            region: RegionBounds::new(65.0, 55.0, 0.0, 10.0),
            ..config()
        },
    ] {
        assert!(matches!(
            Detector::new(cfg),
            Err(StsError::Configuration(_))
        ));
    }
}

#[test]
fn test_csv_source_end_to_end() {
    let path = std::env::temp_dir().join("stsdetect_csv_source_test.csv");
    std::fs::write(
        &path,
        "vessel_id,callsign,timestamp,lon,lat,speed\n\
         100,CS100,2024-01-09T10:00:00Z,5.0,60.0,\n\
         200,CS200,2024-01-09T10:00:00Z,5.0,60.00036,\n\
         100,CS100,2024-01-09T10:10:00Z,5.0,60.0,\n\
         200,CS200,2024-01-09T10:10:00Z,5.0,60.00036,\n\
         100,CS100,not-a-timestamp,5.0,60.0,\n",
    )
    .unwrap();

    let source = CsvSource::new(&path);
    let output = Detector::new(config()).unwrap().run(&source).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(output.runs.len(), 1);
    assert_eq!(output.runs[0].point_count, 2);
    assert_eq!(output.runs[0].callsign_1.as_deref(), Some("CS100"));
    assert_eq!(source.malformed_rows(), 1);
}

#[test]
fn test_csv_source_missing_file_is_fatal() {
    let source = CsvSource::new("/no/such/positions.csv");
    let result = Detector::new(config()).unwrap().run(&source);
    // Every tile read fails, so the batch has no data at all
    assert!(matches!(result, Err(StsError::DataAccess(_))));
}

#[test]
fn test_pipeline_is_deterministic() {
    let mut records = close_pair_at(&[at(10, 0), at(10, 10), at(10, 20)]);
    // A second pair in a different tile
    for t in [at(11, 0), at(11, 10)] {
        records.push(record(300, t, 20.0, 70.0));
        records.push(record(400, t, 20.0, 70.0 + 30.0 / METERS_PER_DEG_LAT));
    }
    let source = InMemorySource::new(records);
    let detector = Detector::new(config()).unwrap();

    let first = detector.run(&source).unwrap();
    let second = detector.run(&source).unwrap();

    assert_eq!(first.runs, second.runs);
    assert_eq!(first.events, second.events);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.runs.len(), 2);
}
