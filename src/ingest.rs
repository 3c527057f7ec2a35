//! Record cleaning and per-vessel-day track building.
//!
//! This is the validation boundary: malformed records are dropped and
//! counted here, prefilters (speed gate, callsign allowlist) are applied,
//! and the surviving records are grouped into per-vessel, per-UTC-day tracks
//! sorted by timestamp with same-instant duplicates collapsed.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::PositionRecord;

/// One cleaned observation within a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    pub speed: Option<f64>,
}

/// Ordered observations for one vessel on one UTC day.
///
/// Tracks are bounded to a day so resampling never interpolates across day
/// boundaries and per-tile memory stays bounded.
#[derive(Debug, Clone)]
pub struct Track {
    pub vessel_id: u64,
    pub callsign: Option<String>,
    pub day: NaiveDate,
    pub points: Vec<TrackPoint>,
}

/// Counters from the cleaning pass, reported in the batch summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanStats {
    /// Records inspected.
    pub seen: usize,
    /// Records with missing or out-of-range coordinates.
    pub dropped_invalid: usize,
    /// Records removed by the speed gate.
    pub filtered_slow: usize,
    /// Records removed by the callsign allowlist.
    pub filtered_callsign: usize,
}

/// Drop malformed records and apply the configured prefilters.
pub fn clean_records(
    records: Vec<PositionRecord>,
    min_speed: Option<f64>,
    callsign_filter: Option<&HashSet<String>>,
) -> (Vec<PositionRecord>, CleanStats) {
    let mut stats = CleanStats {
        seen: records.len(),
        ..CleanStats::default()
    };

    let kept = records
        .into_iter()
        .filter(|r| {
            if !r.has_valid_position() {
                stats.dropped_invalid += 1;
                return false;
            }
            if let Some(gate) = min_speed {
                // Records without a reported speed pass the gate.
                if matches!(r.speed, Some(s) if s <= gate) {
                    stats.filtered_slow += 1;
                    return false;
                }
            }
            if let Some(allowed) = callsign_filter {
                let ok = r
                    .callsign
                    .as_deref()
                    .map(|c| allowed.contains(c))
                    .unwrap_or(false);
                if !ok {
                    stats.filtered_callsign += 1;
                    return false;
                }
            }
            true
        })
        .collect();

    (kept, stats)
}

/// Group cleaned records into per-vessel, per-UTC-day tracks.
///
/// Within a track, records are sorted by timestamp and same-instant
/// duplicates are collapsed: numeric fields are averaged, the first
/// non-empty callsign wins. Output order is deterministic
/// (vessel id, then day).
pub fn build_tracks(records: Vec<PositionRecord>) -> Vec<Track> {
    let mut groups: BTreeMap<(u64, NaiveDate), Vec<PositionRecord>> = BTreeMap::new();
    for record in records {
        let key = (record.vessel_id, record.timestamp.date_naive());
        groups.entry(key).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|((vessel_id, day), mut group)| {
            group.sort_by_key(|r| r.timestamp);

            let callsign = group.iter().find_map(|r| r.callsign.clone());

            let mut points: Vec<TrackPoint> = Vec::with_capacity(group.len());
            let mut i = 0;
            while i < group.len() {
                let mut j = i + 1;
                while j < group.len() && group[j].timestamp == group[i].timestamp {
                    j += 1;
                }
                points.push(collapse_instant(&group[i..j]));
                i = j;
            }

            Track {
                vessel_id,
                callsign,
                day,
                points,
            }
        })
        .collect()
}

/// Collapse records sharing one timestamp into a single point by averaging.
fn collapse_instant(same_instant: &[PositionRecord]) -> TrackPoint {
    let n = same_instant.len() as f64;
    let lon = same_instant.iter().map(|r| r.lon).sum::<f64>() / n;
    let lat = same_instant.iter().map(|r| r.lat).sum::<f64>() / n;

    let speeds: Vec<f64> = same_instant.iter().filter_map(|r| r.speed).collect();
    let speed = if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
    };

    TrackPoint {
        timestamp: same_instant[0].timestamp,
        lon,
        lat,
        speed,
    }
}
