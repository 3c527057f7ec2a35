//! Synthetic AIS scenario generator for tests and stress runs.
//!
//! Generates position batches with known planted encounters, providing
//! ground truth for validating the detection pipeline end to end: a set of
//! background vessels cruising independently, plus pairs that converge to
//! within a few meters for a configured stretch of consecutive reporting
//! intervals and stay kilometers apart otherwise.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::PositionRecord;

/// Meters per degree of latitude.
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Configuration for a generated scenario.
#[derive(Debug, Clone)]
pub struct EncounterScenario {
    /// Center of the generated area, in degrees.
    pub origin_lat: f64,
    pub origin_lon: f64,
    /// Independent vessels that should produce no runs.
    pub background_vessels: usize,
    /// Vessel pairs with one planted encounter each.
    pub encounter_pairs: usize,
    /// First report timestamp for every vessel.
    pub start: DateTime<Utc>,
    /// Reports per vessel, aligned to the interval.
    pub report_count: usize,
    /// Spacing between reports.
    pub report_interval: Duration,
    /// Consecutive reports each pair spends within encounter range.
    pub encounter_bins: usize,
    /// Uniform position jitter applied to every report, in meters.
    pub jitter_meters: f64,
    /// RNG seed; the same seed always yields the same dataset.
    pub seed: u64,
}

impl Default for EncounterScenario {
    fn default() -> Self {
        Self {
            origin_lat: 62.0,
            origin_lon: 5.0,
            background_vessels: 20,
            encounter_pairs: 3,
            start: Utc.with_ymd_and_hms(2024, 1, 9, 6, 0, 0).unwrap(),
            report_count: 36,
            report_interval: Duration::minutes(10),
            encounter_bins: 6,
            jitter_meters: 2.0,
            seed: 42,
        }
    }
}

/// Ground truth for one planted encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedEncounter {
    pub vessel_id_1: u64,
    pub vessel_id_2: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A generated batch with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub records: Vec<PositionRecord>,
    pub expected: Vec<ExpectedEncounter>,
}

impl EncounterScenario {
    /// Generate the dataset.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::new();
        let mut expected = Vec::new();

        for i in 0..self.background_vessels {
            let vessel_id = 100 + i as u64;
            self.generate_cruiser(vessel_id, &mut rng, &mut records);
        }

        for k in 0..self.encounter_pairs {
            let id_a = 9000 + 2 * k as u64;
            let id_b = id_a + 1;
            let window = self.generate_pair(id_a, id_b, &mut rng, &mut records);
            expected.push(ExpectedEncounter {
                vessel_id_1: id_a,
                vessel_id_2: id_b,
                start_time: window.0,
                end_time: window.1,
            });
        }

        SyntheticDataset { records, expected }
    }

    /// One vessel on a straight course at cruising speed.
    fn generate_cruiser(&self, vessel_id: u64, rng: &mut StdRng, out: &mut Vec<PositionRecord>) {
        let lat0 = self.origin_lat + rng.gen_range(-0.5..0.5);
        let lon0 = self.origin_lon + rng.gen_range(-0.5..0.5);
        let heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let speed_mps = rng.gen_range(2.0..7.0);
        let step_secs = self.report_interval.num_seconds() as f64;

        for i in 0..self.report_count {
            let dist = speed_mps * step_secs * i as f64;
            let (lat, lon) = offset_position(lat0, lon0, dist * heading.cos(), dist * heading.sin());
            out.push(self.report(vessel_id, i, lat, lon, speed_mps, rng));
        }
    }

    /// Two vessels far apart that converge to ~20 m for the encounter
    /// window in the middle of the series. Returns the (first, last) close
    /// report times.
    fn generate_pair(
        &self,
        id_a: u64,
        id_b: u64,
        rng: &mut StdRng,
        out: &mut Vec<PositionRecord>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let lat0 = self.origin_lat + rng.gen_range(-0.4..0.4);
        let lon0 = self.origin_lon + rng.gen_range(-0.4..0.4);
        let heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let speed_mps = rng.gen_range(0.5..2.0);
        let step_secs = self.report_interval.num_seconds() as f64;

        let window_start = (self.report_count.saturating_sub(self.encounter_bins)) / 2;
        let window_end = window_start + self.encounter_bins; // exclusive

        for i in 0..self.report_count {
            let dist = speed_mps * step_secs * i as f64;
            let (lat_a, lon_a) =
                offset_position(lat0, lon0, dist * heading.cos(), dist * heading.sin());
            out.push(self.report(id_a, i, lat_a, lon_a, speed_mps, rng));

            // Partner: 20 m abeam inside the window, 5 km away outside it.
            let abeam = if (window_start..window_end).contains(&i) {
                20.0
            } else {
                5_000.0
            };
            let (lat_b, lon_b) =
                offset_position(lat_a, lon_a, abeam * -heading.sin(), abeam * heading.cos());
            out.push(self.report(id_b, i, lat_b, lon_b, speed_mps, rng));
        }

        let first = self.start + self.report_interval * window_start as i32;
        let last = self.start + self.report_interval * (window_end as i32 - 1);
        (first, last)
    }

    fn report(
        &self,
        vessel_id: u64,
        index: usize,
        lat: f64,
        lon: f64,
        speed_mps: f64,
        rng: &mut StdRng,
    ) -> PositionRecord {
        let j = self.jitter_meters;
        let (lat, lon) = offset_position(lat, lon, rng.gen_range(-j..=j), rng.gen_range(-j..=j));
        PositionRecord {
            vessel_id,
            callsign: Some(format!("SYN{vessel_id}")),
            timestamp: self.start + self.report_interval * index as i32,
            lon,
            lat,
            speed: Some(speed_mps),
        }
    }
}

/// Displace a position by metric north/east offsets.
fn offset_position(lat: f64, lon: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let dlat = north_m / METERS_PER_DEG_LAT;
    let dlon = east_m / (METERS_PER_DEG_LAT * lat.to_radians().cos());
    (lat + dlat, lon + dlon)
}
