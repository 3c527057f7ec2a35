//! Tests for synthetic module

use chrono::Duration;
use stsdetect::synthetic::EncounterScenario;
use stsdetect::{Detector, DetectorConfig, InMemorySource, RegionBounds};

#[test]
fn test_generation_is_seeded() {
    let scenario = EncounterScenario::default();
    let a = scenario.generate();
    let b = scenario.generate();
    assert_eq!(a.records, b.records);

    let other = EncounterScenario {
        seed: 7,
        ..EncounterScenario::default()
    };
    assert_ne!(other.generate().records, a.records);
}

#[test]
fn test_record_counts() {
    let scenario = EncounterScenario::default();
    let dataset = scenario.generate();

    let per_vessel = scenario.report_count;
    let vessels = scenario.background_vessels + 2 * scenario.encounter_pairs;
    assert_eq!(dataset.records.len(), vessels * per_vessel);
    assert_eq!(dataset.expected.len(), scenario.encounter_pairs);
}

#[test]
fn test_planted_encounters_are_detected() {
    let scenario = EncounterScenario::default();
    let dataset = scenario.generate();

    let config = DetectorConfig {
        // One generous tile around the scenario so planted pairs cannot be
        // split by a tile edge
        region: RegionBounds::new(58.0, 66.0, 0.0, 10.0),
        lat_tiles: 1,
        lon_tiles: 1,
        resample_step: scenario.report_interval,
        max_interpolation_gap: Duration::minutes(30),
        distance_threshold_m: 50.0,
        ..DetectorConfig::default()
    };
    let output = Detector::new(config)
        .unwrap()
        .run(&InMemorySource::new(dataset.records))
        .unwrap();

    for expected in &dataset.expected {
        let found = output
            .runs
            .iter()
            .find(|r| {
                r.vessel_id_1 == expected.vessel_id_1 && r.vessel_id_2 == expected.vessel_id_2
            })
            .unwrap_or_else(|| {
                panic!(
                    "planted encounter {}-{} not detected",
                    expected.vessel_id_1, expected.vessel_id_2
                )
            });
        assert_eq!(found.start_time, expected.start_time);
        assert_eq!(found.end_time, expected.end_time);
        assert_eq!(found.point_count as usize, scenario.encounter_bins);
        assert_eq!(found.callsign_1.as_deref(), Some(format!("SYN{}", expected.vessel_id_1).as_str()));
    }
}
