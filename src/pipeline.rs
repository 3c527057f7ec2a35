//! Batch pipeline composing the detection stages.
//!
//! The detector walks the tile grid, and for each non-empty tile: cleans
//! the records, builds per-vessel-day tracks, resamples them onto the grid,
//! and runs the per-bin proximity queries. Tile event lists are concatenated
//! and stitched globally into encounter runs.
//!
//! Tiles are independent, with no shared mutable state; with the `parallel`
//! feature they are processed with rayon and merged afterwards. Day groups
//! within a tile are independent too and could be parallelized the same way.
//! A tile whose read fails is logged and skipped; the batch always produces
//! a (possibly empty) run list plus a summary of everything skipped or
//! dropped.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::ingest::{build_tracks, clean_records, CleanStats};
use crate::proximity::detect_events;
use crate::resample::{resample_track, ResampledTrack};
use crate::stitch::{RunAccumulator, StitchConfig};
use crate::tiles::TileGrid;
use crate::{
    DetectorConfig, EncounterRun, PositionRecord, ProximityEvent, RegionBounds, Result, StsError,
};

/// A source of position records supporting rectangular predicate pushdown.
///
/// Full scans of a position corpus are prohibitively large, so the pipeline
/// only ever asks for the records inside one tile's bounds.
pub trait PositionSource: Sync {
    fn read_tile(&self, bounds: &RegionBounds) -> Result<Vec<PositionRecord>>;
}

/// In-memory source over an already-loaded record set.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<PositionRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<PositionRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PositionSource for InMemorySource {
    fn read_tile(&self, bounds: &RegionBounds) -> Result<Vec<PositionRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| bounds.contains(r.lat, r.lon))
            .cloned()
            .collect())
    }
}

/// CSV-backed source. Each tile read scans the file and materializes only
/// the rows inside the tile bounds, so peak memory is bounded by the
/// densest tile rather than the whole corpus.
///
/// Rows that fail to parse are dropped and counted; a file that cannot be
/// opened fails that tile's read, which the detector isolates.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    malformed: AtomicUsize,
}

impl CsvSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            malformed: AtomicUsize::new(0),
        }
    }

    /// Unparseable rows seen by a scan of the file. Every tile read scans
    /// the same rows, so this is the per-file count, not a running total.
    pub fn malformed_rows(&self) -> usize {
        self.malformed.load(Ordering::Relaxed)
    }
}

impl PositionSource for CsvSource {
    fn read_tile(&self, bounds: &RegionBounds) -> Result<Vec<PositionRecord>> {
        let file = File::open(&self.path)
            .map_err(|err| StsError::DataAccess(format!("{}: {err}", self.path.display())))?;
        let mut reader = csv::Reader::from_reader(file);

        let mut records = Vec::new();
        let mut malformed = 0usize;
        for row in reader.deserialize::<PositionRecord>() {
            match row {
                Ok(record) => {
                    if bounds.contains(record.lat, record.lon) {
                        records.push(record);
                    }
                }
                Err(err) => {
                    malformed += 1;
                    debug!("dropping malformed row: {err}");
                }
            }
        }
        self.malformed.store(malformed, Ordering::Relaxed);
        Ok(records)
    }
}

/// Counters describing what the batch read, skipped, and produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub tiles_total: usize,
    pub tiles_processed: usize,
    pub tiles_empty: usize,
    pub tiles_failed: usize,
    pub records_read: usize,
    pub records_dropped_invalid: usize,
    pub records_filtered_slow: usize,
    pub records_filtered_callsign: usize,
    pub vessel_days_resampled: usize,
    pub vessel_days_skipped: usize,
    pub events_detected: usize,
    pub runs_emitted: usize,
}

/// Everything a batch produces: the runs, the underlying event stream for
/// replay or debugging, and the summary.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub runs: Vec<EncounterRun>,
    pub events: Vec<ProximityEvent>,
    pub summary: BatchSummary,
}

/// What one tile contributes before the global stitch.
#[derive(Debug, Default)]
struct TileOutcome {
    events: Vec<ProximityEvent>,
    callsigns: HashMap<u64, String>,
    clean: CleanStats,
    resampled: usize,
    skipped: usize,
    empty: bool,
    failed: bool,
}

/// The batch detector. Construction validates the configuration; a detector
/// never starts I/O with bad parameters.
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run the full pipeline over one batch.
    ///
    /// Individual tile failures are isolated; the only fatal runtime error
    /// is losing the source entirely (every tile read failing).
    pub fn run<S: PositionSource>(&self, source: &S) -> Result<BatchOutput> {
        let grid = TileGrid::new(
            self.config.region,
            self.config.lat_tiles,
            self.config.lon_tiles,
        )?;
        let tiles = grid.tiles();
        info!(
            "starting batch over {} tiles ({} x {})",
            tiles.len(),
            self.config.lat_tiles,
            self.config.lon_tiles
        );

        #[cfg(feature = "parallel")]
        let outcomes: Vec<TileOutcome> = tiles
            .par_iter()
            .map(|tile| self.process_tile(source, tile))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<TileOutcome> = tiles
            .iter()
            .map(|tile| self.process_tile(source, tile))
            .collect();

        let mut summary = BatchSummary {
            tiles_total: tiles.len(),
            ..BatchSummary::default()
        };
        let mut events: Vec<ProximityEvent> = Vec::new();
        let mut callsigns: HashMap<u64, String> = HashMap::new();

        for outcome in outcomes {
            if outcome.failed {
                summary.tiles_failed += 1;
                continue;
            }
            if outcome.empty {
                summary.tiles_empty += 1;
            } else {
                summary.tiles_processed += 1;
            }
            summary.records_read += outcome.clean.seen;
            summary.records_dropped_invalid += outcome.clean.dropped_invalid;
            summary.records_filtered_slow += outcome.clean.filtered_slow;
            summary.records_filtered_callsign += outcome.clean.filtered_callsign;
            summary.vessel_days_resampled += outcome.resampled;
            summary.vessel_days_skipped += outcome.skipped;
            events.extend(outcome.events);
            for (id, callsign) in outcome.callsigns {
                callsigns.entry(id).or_insert(callsign);
            }
        }

        if summary.tiles_failed == tiles.len() {
            return Err(StsError::DataAccess(format!(
                "all {} tile reads failed",
                tiles.len()
            )));
        }

        events.sort();
        events.dedup();
        summary.events_detected = events.len();

        let mut accumulator = RunAccumulator::new(StitchConfig {
            step: self.config.resample_step,
            min_point_count: self.config.min_point_count,
            min_duration: self.config.min_duration,
        });
        accumulator.extend(events.iter().copied());
        let runs = accumulator.finish(&callsigns);
        summary.runs_emitted = runs.len();

        info!(
            "batch done: {} events, {} runs ({} tiles processed, {} empty, {} failed)",
            summary.events_detected,
            summary.runs_emitted,
            summary.tiles_processed,
            summary.tiles_empty,
            summary.tiles_failed
        );

        Ok(BatchOutput {
            runs,
            events,
            summary,
        })
    }

    /// Process one tile: read, clean, track, resample, detect.
    fn process_tile<S: PositionSource>(&self, source: &S, tile: &RegionBounds) -> TileOutcome {
        let records = match source.read_tile(tile) {
            Ok(records) => records,
            Err(err) => {
                warn!("skipping tile {tile:?}: {err}");
                return TileOutcome {
                    failed: true,
                    ..TileOutcome::default()
                };
            }
        };

        if records.is_empty() {
            return TileOutcome {
                empty: true,
                ..TileOutcome::default()
            };
        }

        let (cleaned, clean) = clean_records(
            records,
            self.config.min_speed,
            self.config.callsign_filter.as_ref(),
        );

        let tracks = build_tracks(cleaned);
        let mut callsigns: HashMap<u64, String> = HashMap::new();
        for track in &tracks {
            if let Some(c) = &track.callsign {
                callsigns.entry(track.vessel_id).or_insert_with(|| c.clone());
            }
        }

        let mut resampled: Vec<ResampledTrack> = Vec::with_capacity(tracks.len());
        let mut skipped = 0usize;
        for track in &tracks {
            match resample_track(
                track,
                self.config.resample_step,
                self.config.max_interpolation_gap,
            ) {
                Some(r) => resampled.push(r),
                None => skipped += 1,
            }
        }

        let events = detect_events(&resampled, self.config.distance_threshold_m);
        debug!(
            "tile {tile:?}: {} records, {} vessel-days, {} events",
            clean.seen,
            resampled.len(),
            events.len()
        );

        TileOutcome {
            events,
            callsigns,
            clean,
            resampled: resampled.len(),
            skipped,
            empty: false,
            failed: false,
        }
    }
}
