//! Per-bin spatial proximity queries.
//!
//! For each discretized timestamp, all vessel positions present in the bin
//! are loaded into an R-tree and queried for neighbors within the distance
//! threshold. Positions are indexed as points on the unit sphere, so the
//! radius query uses chord distance (the metric equivalent of haversine)
//! and stays exact at any latitude. Query cost is sub-quadratic in the
//! number of simultaneously reporting vessels, which matters when a bin
//! holds hundreds to thousands of positions nationwide.

use chrono::{DateTime, Utc};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::{BTreeMap, HashMap};

use crate::geo::{chord_radius_squared, unit_sphere};
use crate::resample::ResampledTrack;
use crate::ProximityEvent;

/// One vessel's position inside a single time bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VesselPosition {
    pub vessel_id: u64,
    pub lat: f64,
    pub lon: f64,
}

/// A vessel position with its bin index, lifted onto the unit sphere for
/// R-tree queries.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    vessel_id: u64,
    pos: [f64; 3],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.pos[0] - point[0];
        let dy = self.pos[1] - point[1];
        let dz = self.pos[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Find all vessel pairs within `threshold_m` of each other in one bin.
///
/// Duplicate entries for the same vessel keep only the last one, so each
/// vessel contributes a single point. Emitted pairs are canonical
/// (`vessel_id_1 < vessel_id_2`), deduplicated, and sorted.
pub fn pairs_in_bin(
    positions: &[VesselPosition],
    time_bin: DateTime<Utc>,
    threshold_m: f64,
) -> Vec<ProximityEvent> {
    if positions.len() < 2 {
        return Vec::new();
    }

    // One point per vessel: the most recent entry feeding the slot wins.
    let mut by_vessel: HashMap<u64, VesselPosition> = HashMap::with_capacity(positions.len());
    for p in positions {
        by_vessel.insert(p.vessel_id, *p);
    }
    if by_vessel.len() < 2 {
        return Vec::new();
    }

    let mut unique: Vec<VesselPosition> = by_vessel.into_values().collect();
    unique.sort_by_key(|p| p.vessel_id);

    let indexed: Vec<IndexedPoint> = unique
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint {
            idx: i,
            vessel_id: p.vessel_id,
            pos: unit_sphere(p.lat, p.lon),
        })
        .collect();
    let tree = RTree::bulk_load(indexed.clone());

    let radius_sq = chord_radius_squared(threshold_m);

    let mut events = Vec::new();
    for p in &indexed {
        for neighbor in tree.locate_within_distance(p.pos, radius_sq) {
            if neighbor.idx <= p.idx {
                continue;
            }
            if let Some(event) = ProximityEvent::canonical(p.vessel_id, neighbor.vessel_id, time_bin)
            {
                events.push(event);
            }
        }
    }

    events.sort();
    events.dedup();
    events
}

/// Collect per-bin vessel positions from a set of resampled tracks.
///
/// Bins are keyed by grid timestamp; within a bin, positions keep the order
/// the tracks were supplied in (later entries for the same vessel override
/// earlier ones during the pair query).
pub fn collect_bins(tracks: &[ResampledTrack]) -> BTreeMap<DateTime<Utc>, Vec<VesselPosition>> {
    let mut bins: BTreeMap<DateTime<Utc>, Vec<VesselPosition>> = BTreeMap::new();
    for track in tracks {
        for point in &track.points {
            bins.entry(point.time).or_default().push(VesselPosition {
                vessel_id: track.vessel_id,
                lat: point.lat,
                lon: point.lon,
            });
        }
    }
    bins
}

/// Detect proximity events across all bins of a tile.
pub fn detect_events(tracks: &[ResampledTrack], threshold_m: f64) -> Vec<ProximityEvent> {
    let mut events = Vec::new();
    for (time_bin, positions) in collect_bins(tracks) {
        events.extend(pairs_in_bin(&positions, time_bin, threshold_m));
    }
    events
}
