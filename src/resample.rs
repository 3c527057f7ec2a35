//! Uniform-grid track resampling with gap masking.
//!
//! AIS reporting intervals are irregular, so two vessels rarely report at
//! the same instant. Resampling puts every track on a shared time grid so
//! positions can be compared at synchronized timestamps:
//! - the grid runs from `floor(min_t, step)` to `ceil(max_t, step)`
//! - grid points coinciding with an observation take its value
//! - grid points between observations are linearly time-interpolated
//! - grid points strictly between two observations separated by more than
//!   the maximum interpolation gap are left empty, so a plausible-looking
//!   position is never fabricated across a long silence (AIS switched off)
//! - nothing is ever extrapolated before the first or after the last
//!   observation

use chrono::{DateTime, Duration, Utc};

use crate::ingest::Track;

/// One non-empty slot of a resampled track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub time: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    pub speed: Option<f64>,
}

/// A track re-expressed on the uniform grid. Empty slots are simply absent.
#[derive(Debug, Clone)]
pub struct ResampledTrack {
    pub vessel_id: u64,
    pub callsign: Option<String>,
    pub points: Vec<GridPoint>,
}

/// Floor a timestamp to the grid.
pub fn floor_to_step(t: DateTime<Utc>, step: Duration) -> DateTime<Utc> {
    let step_secs = step.num_seconds();
    let rem = t.timestamp().rem_euclid(step_secs);
    t - Duration::seconds(rem) - Duration::nanoseconds(t.timestamp_subsec_nanos() as i64)
}

/// Ceil a timestamp to the grid.
pub fn ceil_to_step(t: DateTime<Utc>, step: Duration) -> DateTime<Utc> {
    let floored = floor_to_step(t, step);
    if floored == t {
        t
    } else {
        floored + step
    }
}

/// Resample one vessel-day track onto the uniform grid.
///
/// Returns `None` for tracks with fewer than two deduplicated observations;
/// those cannot be interpolated and contribute no pairs.
pub fn resample_track(track: &Track, step: Duration, max_gap: Duration) -> Option<ResampledTrack> {
    let obs = &track.points;
    if obs.len() < 2 {
        return None;
    }

    let min_t = obs.first()?.timestamp;
    let max_t = obs.last()?.timestamp;

    let grid_end = ceil_to_step(max_t, step);
    let mut grid_t = floor_to_step(min_t, step);

    let mut points = Vec::new();
    let mut seg = 0usize;

    while grid_t <= grid_end {
        // Interpolation is confined to the observed span.
        if grid_t >= min_t && grid_t <= max_t {
            while seg + 1 < obs.len() && obs[seg + 1].timestamp <= grid_t {
                seg += 1;
            }

            if obs[seg].timestamp == grid_t {
                let o = &obs[seg];
                points.push(GridPoint {
                    time: grid_t,
                    lon: o.lon,
                    lat: o.lat,
                    speed: o.speed,
                });
            } else {
                // obs[seg].timestamp < grid_t < obs[seg + 1].timestamp
                let a = &obs[seg];
                let b = &obs[seg + 1];
                if b.timestamp - a.timestamp <= max_gap {
                    let span_ms = (b.timestamp - a.timestamp).num_milliseconds() as f64;
                    let frac = (grid_t - a.timestamp).num_milliseconds() as f64 / span_ms;
                    let speed = match (a.speed, b.speed) {
                        (Some(sa), Some(sb)) => Some(sa + frac * (sb - sa)),
                        _ => None,
                    };
                    points.push(GridPoint {
                        time: grid_t,
                        lon: a.lon + frac * (b.lon - a.lon),
                        lat: a.lat + frac * (b.lat - a.lat),
                        speed,
                    });
                }
                // Wider gaps leave the slot empty.
            }
        }
        grid_t = grid_t + step;
    }

    Some(ResampledTrack {
        vessel_id: track.vessel_id,
        callsign: track.callsign.clone(),
        points,
    })
}
