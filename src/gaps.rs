//! Reporting-gap survey.
//!
//! Long silences in a vessel's AIS stream are interesting on their own:
//! transponders switched off, coverage holes, or the same silences the
//! resampler refuses to interpolate across. This walks each vessel's raw
//! record sequence (across day boundaries) and reports every gap exceeding
//! a threshold.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::PositionRecord;

/// One reporting gap: the silence between two consecutive records of a
/// vessel. `start` is the last report before the silence, `end` the first
/// one after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingGap {
    pub vessel_id: u64,
    pub callsign: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub gap_minutes: i64,
}

impl ReportingGap {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Find all per-vessel reporting gaps longer than `threshold`.
///
/// Records with invalid coordinates still count as reports here; the survey
/// is about transmission silence, not position quality. Output is sorted by
/// vessel id, then gap start.
pub fn find_reporting_gaps(records: &[PositionRecord], threshold: Duration) -> Vec<ReportingGap> {
    let mut by_vessel: BTreeMap<u64, Vec<&PositionRecord>> = BTreeMap::new();
    for record in records {
        by_vessel.entry(record.vessel_id).or_default().push(record);
    }

    let mut gaps = Vec::new();
    for (vessel_id, mut group) in by_vessel {
        group.sort_by_key(|r| r.timestamp);
        let callsign = group.iter().find_map(|r| r.callsign.clone());

        for pair in group.windows(2) {
            let silence = pair[1].timestamp - pair[0].timestamp;
            if silence > threshold {
                gaps.push(ReportingGap {
                    vessel_id,
                    callsign: callsign.clone(),
                    start: pair[0].timestamp,
                    end: pair[1].timestamp,
                    gap_minutes: silence.num_minutes(),
                });
            }
        }
    }
    gaps
}
