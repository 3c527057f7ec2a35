//! # stsdetect
//!
//! Spatio-temporal proximity detection for AIS vessel tracks.
//!
//! Given a batch of timestamped vessel positions, this library finds all
//! pairs of vessels that stay within a small distance of each other for a
//! sustained duration, a proxy for possible ship-to-ship (STS) transfers,
//! despite irregular and gappy AIS reporting.
//!
//! The pipeline has four stages:
//! - Tile partitioning: the coverage region is split into a lat/lon grid so
//!   each tile's working set stays bounded
//! - Track resampling: irregular per-vessel series are put on a uniform time
//!   grid, interpolating only across small gaps
//! - Proximity indexing: per time bin, an R-tree radius query finds all
//!   vessel pairs within the distance threshold
//! - Run stitching: per-bin detections are merged into continuous encounter
//!   runs, keeping only sustained ones
//!
//! ## Features
//!
//! - **`parallel`** - Process tiles in parallel with rayon (default)
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use stsdetect::{Detector, DetectorConfig, InMemorySource, PositionRecord, RegionBounds};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 9, 10, 0, 0).unwrap();
//! let mut records = Vec::new();
//! for i in 0..4 {
//!     let t = t0 + Duration::minutes(10 * i);
//!     records.push(PositionRecord::new(100, t, 5.0, 60.0));
//!     records.push(PositionRecord::new(200, t, 5.0, 60.0003));
//! }
//!
//! let config = DetectorConfig {
//!     region: RegionBounds::new(55.0, 90.0, -10.0, 45.0),
//!     ..DetectorConfig::default()
//! };
//! let detector = Detector::new(config).unwrap();
//! let output = detector.run(&InMemorySource::new(records)).unwrap();
//!
//! assert_eq!(output.runs.len(), 1);
//! assert_eq!(output.runs[0].point_count, 4);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Unified error handling
pub mod error;
pub use error::{Result, StsError};

// Geographic primitives (haversine, unit-sphere conversion)
pub mod geo;
pub use geo::{haversine_distance_m, EARTH_RADIUS_M};

// Region tiling
pub mod tiles;
pub use tiles::TileGrid;

// Record cleaning and per-vessel-day track building
pub mod ingest;
pub use ingest::{Track, TrackPoint};

// Uniform-grid track resampling with gap masking
pub mod resample;
pub use resample::{GridPoint, ResampledTrack};

// Per-bin spatial proximity queries
pub mod proximity;
pub use proximity::{pairs_in_bin, VesselPosition};

// Stitching per-bin detections into encounter runs
pub mod stitch;
pub use stitch::{RunAccumulator, StitchConfig};

// Batch pipeline composing the stages above
pub mod pipeline;
pub use pipeline::{BatchOutput, BatchSummary, CsvSource, Detector, InMemorySource, PositionSource};

// Tabular export of runs and events
pub mod export;

// Reporting-gap survey over raw tracks
pub mod gaps;
pub use gaps::ReportingGap;

// Synthetic AIS scenario generator for tests and stress runs
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A single AIS position report.
///
/// `vessel_id` is the stable numeric identifier (MMSI); `callsign` is an
/// optional secondary identifier carried through to run output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub vessel_id: u64,
    #[serde(default)]
    pub callsign: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl PositionRecord {
    /// Create a bare position report without callsign or speed.
    pub fn new(vessel_id: u64, timestamp: DateTime<Utc>, lon: f64, lat: f64) -> Self {
        Self {
            vessel_id,
            callsign: None,
            timestamp,
            lon,
            lat,
            speed: None,
        }
    }

    /// Check that the coordinates are finite and in range.
    pub fn has_valid_position(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A rectangular lat/lon region with half-open membership
/// `[lat_min, lat_max) × [lon_min, lon_max)`.
///
/// Used both for the overall coverage region and for individual tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl RegionBounds {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Half-open membership test: max edges are exclusive.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat < self.lat_max && lon >= self.lon_min && lon < self.lon_max
    }

    /// Check the bounds are finite, ordered, and within world coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat_min.is_finite()
            && self.lat_max.is_finite()
            && self.lon_min.is_finite()
            && self.lon_max.is_finite()
            && self.lat_min < self.lat_max
            && self.lon_min < self.lon_max
            && self.lat_min >= -90.0
            && self.lat_max <= 90.0
            && self.lon_min >= -180.0
            && self.lon_max <= 180.0
    }
}

/// A detection that two vessels had positions within the distance threshold
/// at one discretized timestamp.
///
/// Pair ordering is canonical: `vessel_id_1 < vessel_id_2`, so `(A, B)` and
/// `(B, A)` are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProximityEvent {
    pub time_bin: DateTime<Utc>,
    pub vessel_id_1: u64,
    pub vessel_id_2: u64,
}

impl ProximityEvent {
    /// Build a canonical event, ordering the pair by id.
    ///
    /// Returns `None` when both ids are the same vessel.
    pub fn canonical(a: u64, b: u64, time_bin: DateTime<Utc>) -> Option<Self> {
        if a == b {
            return None;
        }
        Some(Self {
            time_bin,
            vessel_id_1: a.min(b),
            vessel_id_2: a.max(b),
        })
    }
}

/// A maximal sequence of consecutive proximity detections for one vessel
/// pair: the unit of output of the whole pipeline.
///
/// `end_time` is the last detection bin (inclusive); a run detected at bins
/// 10:00 and 10:10 spans `10:00–10:10` with `point_count = 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterRun {
    pub vessel_id_1: u64,
    pub vessel_id_2: u64,
    pub callsign_1: Option<String>,
    pub callsign_2: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub point_count: u32,
}

impl EncounterRun {
    /// Wall-clock span of the run.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Configuration for the detection pipeline.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Coverage region. Records outside it are never read.
    /// Default: 55°N–90°N, 10°W–45°E (Norwegian/Barents Sea coverage)
    pub region: RegionBounds,

    /// Number of tiles along the latitude axis.
    /// Default: 5
    pub lat_tiles: u32,

    /// Number of tiles along the longitude axis.
    /// Default: 5
    pub lon_tiles: u32,

    /// Grid step used to discretize tracks for synchronized comparison.
    /// Default: 10 minutes
    pub resample_step: Duration,

    /// Maximum reporting gap across which positions are interpolated.
    /// Grid points falling inside a wider gap are left empty rather than
    /// fabricating a position across a long silence.
    /// Default: 30 minutes
    pub max_interpolation_gap: Duration,

    /// Proximity distance threshold in meters.
    /// Default: 50.0
    pub distance_threshold_m: f64,

    /// Minimum number of consecutive detections for a run to be emitted.
    /// Single detached detections are noise, not sustained encounters.
    /// Default: 2
    pub min_point_count: u32,

    /// Optional minimum wall-clock span for a run, applied in addition to
    /// `min_point_count`.
    /// Default: None
    pub min_duration: Option<Duration>,

    /// Optional speed gate: records reporting speed at or below this value
    /// are dropped before pairing, removing moored vessels.
    /// Default: None
    pub min_speed: Option<f64>,

    /// Optional callsign allowlist: when set, only records whose callsign
    /// is in the set are processed.
    /// Default: None
    pub callsign_filter: Option<HashSet<String>>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            region: RegionBounds::new(55.0, 90.0, -10.0, 45.0),
            lat_tiles: 5,
            lon_tiles: 5,
            resample_step: Duration::minutes(10),
            max_interpolation_gap: Duration::minutes(30),
            distance_threshold_m: 50.0,
            min_point_count: 2,
            min_duration: None,
            min_speed: None,
            callsign_filter: None,
        }
    }
}

impl DetectorConfig {
    /// Fail-fast parameter validation, run before any I/O.
    pub fn validate(&self) -> Result<()> {
        if !self.region.is_valid() {
            return Err(StsError::Configuration(format!(
                "invalid region bounds: {:?}",
                self.region
            )));
        }
        if self.lat_tiles == 0 || self.lon_tiles == 0 {
            return Err(StsError::Configuration(format!(
                "tile counts must be positive, got {}x{}",
                self.lat_tiles, self.lon_tiles
            )));
        }
        if self.resample_step <= Duration::zero() {
            return Err(StsError::Configuration(
                "resample step must be positive".to_string(),
            ));
        }
        if self.max_interpolation_gap <= Duration::zero() {
            return Err(StsError::Configuration(
                "max interpolation gap must be positive".to_string(),
            ));
        }
        if self.distance_threshold_m.is_nan() || self.distance_threshold_m <= 0.0 {
            return Err(StsError::Configuration(format!(
                "distance threshold must be positive, got {}",
                self.distance_threshold_m
            )));
        }
        if let Some(d) = self.min_duration {
            if d < Duration::zero() {
                return Err(StsError::Configuration(
                    "minimum run duration must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}
