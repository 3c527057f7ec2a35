//! Stitching per-bin detections into encounter runs.
//!
//! The accumulator is scoped to one batch: construct it, feed it the flat
//! event stream (unordered across tiles and timestamps), then finish it to
//! obtain the runs. Continuity is strict: a gap of exactly one grid step
//! between successive detections of a pair means the same run; anything
//! wider starts a new run.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::{EncounterRun, ProximityEvent};

/// Stitching parameters, taken from the detector configuration.
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// Grid step; successive bins exactly this far apart are continuous.
    pub step: Duration,
    /// Minimum detections per run.
    pub min_point_count: u32,
    /// Optional minimum wall-clock span, applied in addition.
    pub min_duration: Option<Duration>,
}

/// Scoped per-batch accumulator mapping pair keys to detection bins.
#[derive(Debug)]
pub struct RunAccumulator {
    config: StitchConfig,
    bins: HashMap<(u64, u64), Vec<DateTime<Utc>>>,
}

impl RunAccumulator {
    pub fn new(config: StitchConfig) -> Self {
        Self {
            config,
            bins: HashMap::new(),
        }
    }

    /// Record one detection. Events arrive canonicalized, so the pair key
    /// is used as-is.
    pub fn push(&mut self, event: ProximityEvent) {
        self.bins
            .entry((event.vessel_id_1, event.vessel_id_2))
            .or_default()
            .push(event.time_bin);
    }

    pub fn extend<I: IntoIterator<Item = ProximityEvent>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    /// Close all in-progress runs and emit the surviving ones.
    ///
    /// Per pair, bins are sorted and exact duplicates (the same pair seen in
    /// overlapping reads) are collapsed before the continuity walk. Runs
    /// below the minimum point count or minimum duration are discarded.
    /// Output is sorted by start time, then pair ids, so identical input
    /// always yields identical output.
    pub fn finish(self, callsigns: &HashMap<u64, String>) -> Vec<EncounterRun> {
        let RunAccumulator { config, bins } = self;
        let mut pairs: Vec<((u64, u64), Vec<DateTime<Utc>>)> = bins.into_iter().collect();
        pairs.sort_by_key(|(key, _)| *key);

        let mut runs = Vec::new();
        for ((id1, id2), mut times) in pairs {
            times.sort();
            times.dedup();

            let mut start = 0usize;
            for i in 1..=times.len() {
                let broke = i == times.len() || times[i] - times[i - 1] != config.step;
                if broke {
                    emit_run(&config, &times[start..i], id1, id2, callsigns, &mut runs);
                    start = i;
                }
            }
        }

        runs.sort_by(|a, b| {
            (a.start_time, a.vessel_id_1, a.vessel_id_2)
                .cmp(&(b.start_time, b.vessel_id_1, b.vessel_id_2))
        });
        runs
    }
}

/// Aggregate one maximal consecutive span into a run, applying filters.
fn emit_run(
    config: &StitchConfig,
    span: &[DateTime<Utc>],
    id1: u64,
    id2: u64,
    callsigns: &HashMap<u64, String>,
    runs: &mut Vec<EncounterRun>,
) {
    if span.is_empty() || (span.len() as u32) < config.min_point_count {
        return;
    }
    let start_time = span[0];
    let end_time = span[span.len() - 1];
    if let Some(min) = config.min_duration {
        if end_time - start_time < min {
            return;
        }
    }
    runs.push(EncounterRun {
        vessel_id_1: id1,
        vessel_id_2: id2,
        callsign_1: callsigns.get(&id1).cloned(),
        callsign_2: callsigns.get(&id2).cloned(),
        start_time,
        end_time,
        point_count: span.len() as u32,
    });
}
