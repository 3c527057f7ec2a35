//! Tests for proximity module

use chrono::{DateTime, TimeZone, Utc};
use stsdetect::proximity::{collect_bins, detect_events, pairs_in_bin, VesselPosition};
use stsdetect::resample::{GridPoint, ResampledTrack};
use stsdetect::ProximityEvent;

const METERS_PER_DEG_LAT: f64 = 111_320.0;

fn bin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 9, 10, 0, 0).unwrap()
}

fn pos(vessel_id: u64, lat: f64, lon: f64) -> VesselPosition {
    VesselPosition {
        vessel_id,
        lat,
        lon,
    }
}

/// A position displaced north by the given number of meters.
fn north_of(base: VesselPosition, vessel_id: u64, meters: f64) -> VesselPosition {
    pos(vessel_id, base.lat + meters / METERS_PER_DEG_LAT, base.lon)
}

#[test]
fn test_pair_within_threshold_is_detected() {
    let a = pos(100, 65.0, 10.0);
    let b = north_of(a, 200, 40.0);

    let events = pairs_in_bin(&[a, b], bin(), 50.0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].vessel_id_1, 100);
    assert_eq!(events[0].vessel_id_2, 200);
    assert_eq!(events[0].time_bin, bin());
}

#[test]
fn test_pair_beyond_threshold_is_not_detected() {
    let a = pos(100, 65.0, 10.0);
    let b = north_of(a, 200, 60.0);
    assert!(pairs_in_bin(&[a, b], bin(), 50.0).is_empty());
}

#[test]
fn test_pair_key_is_canonical() {
    // Higher id listed first still comes out ordered
    let a = pos(900, 65.0, 10.0);
    let b = north_of(a, 17, 10.0);

    let events = pairs_in_bin(&[a, b], bin(), 50.0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].vessel_id_1, 17);
    assert_eq!(events[0].vessel_id_2, 900);

    assert!(ProximityEvent::canonical(5, 5, bin()).is_none());
}

#[test]
fn test_same_vessel_never_pairs_with_itself() {
    // Two entries for one vessel at the same spot
    let a = pos(100, 65.0, 10.0);
    let also_a = pos(100, 65.0, 10.0);
    assert!(pairs_in_bin(&[a, also_a], bin(), 50.0).is_empty());
}

#[test]
fn test_duplicate_vessel_entry_keeps_the_last() {
    let anchor = pos(100, 65.0, 10.0);
    let far = north_of(anchor, 200, 5_000.0);
    let near = north_of(anchor, 200, 30.0);

    // Last entry for vessel 200 is the near one
    let events = pairs_in_bin(&[anchor, far, near], bin(), 50.0);
    assert_eq!(events.len(), 1);

    // Last entry for vessel 200 is the far one
    let events = pairs_in_bin(&[anchor, near, far], bin(), 50.0);
    assert!(events.is_empty());
}

#[test]
fn test_cluster_of_three_emits_three_pairs() {
    let a = pos(1, 65.0, 10.0);
    let b = north_of(a, 2, 20.0);
    let c = north_of(a, 3, 40.0);

    let events = pairs_in_bin(&[a, b, c], bin(), 50.0);
    assert_eq!(events.len(), 3);
    // Sorted, deduplicated output
    assert_eq!(
        events
            .iter()
            .map(|e| (e.vessel_id_1, e.vessel_id_2))
            .collect::<Vec<_>>(),
        vec![(1, 2), (1, 3), (2, 3)]
    );
}

#[test]
fn test_crowded_bin_matches_pairwise_scan() {
    // 60 vessels on a line, 30 m apart: each should pair with its immediate
    // neighbor only at a 50 m threshold
    let anchor = pos(0, 65.0, 10.0);
    let positions: Vec<VesselPosition> = (0..60)
        .map(|i| north_of(anchor, i as u64, 30.0 * i as f64))
        .collect();

    let events = pairs_in_bin(&positions, bin(), 50.0);
    assert_eq!(events.len(), 59);
    for e in &events {
        assert_eq!(e.vessel_id_2 - e.vessel_id_1, 1);
    }
}

#[test]
fn test_threshold_works_near_the_pole() {
    // Longitude degrees are tiny at 89N; the metric index must not care
    let a = pos(100, 89.0, 0.0);
    let b = pos(200, 89.0, 0.02); // ~39 m east at this latitude

    let events = pairs_in_bin(&[a, b], bin(), 50.0);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_detect_events_across_bins() {
    let t0 = bin();
    let t1 = t0 + chrono::Duration::minutes(10);
    let near_lat = 65.0 + 30.0 / METERS_PER_DEG_LAT;

    let track_a = ResampledTrack {
        vessel_id: 100,
        callsign: None,
        points: vec![
            GridPoint { time: t0, lon: 10.0, lat: 65.0, speed: None },
            GridPoint { time: t1, lon: 10.0, lat: 65.0, speed: None },
        ],
    };
    // Close at t0, absent at t1
    let track_b = ResampledTrack {
        vessel_id: 200,
        callsign: None,
        points: vec![GridPoint { time: t0, lon: 10.0, lat: near_lat, speed: None }],
    };

    let bins = collect_bins(&[track_a.clone(), track_b.clone()]);
    assert_eq!(bins.len(), 2);
    assert_eq!(bins[&t0].len(), 2);
    assert_eq!(bins[&t1].len(), 1);

    let events = detect_events(&[track_a, track_b], 50.0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].time_bin, t0);
}

#[test]
fn test_lone_vessel_produces_nothing() {
    let only = pos(100, 65.0, 10.0);
    assert!(pairs_in_bin(&[only], bin(), 50.0).is_empty());
}
