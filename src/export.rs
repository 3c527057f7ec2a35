//! Tabular export of encounter runs, proximity events, and gap reports.
//!
//! Output is plain CSV with ISO-8601 UTC timestamps, the interchange format
//! consumed by downstream plotting and report-matching tooling. Because run
//! and event lists are deterministically ordered, the same batch always
//! serializes to identical bytes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::gaps::ReportingGap;
use crate::{EncounterRun, ProximityEvent, Result};

/// Write encounter runs as CSV rows.
pub fn write_runs<W: Write>(writer: W, runs: &[EncounterRun]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for run in runs {
        out.serialize(run)?;
    }
    out.flush()?;
    Ok(())
}

/// Write encounter runs to a file path.
pub fn write_runs_to_path<P: AsRef<Path>>(path: P, runs: &[EncounterRun]) -> Result<()> {
    write_runs(File::create(path)?, runs)
}

/// Write the raw proximity event stream as CSV rows, for replay/debugging.
pub fn write_events<W: Write>(writer: W, events: &[ProximityEvent]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for event in events {
        out.serialize(event)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the raw proximity event stream to a file path.
pub fn write_events_to_path<P: AsRef<Path>>(path: P, events: &[ProximityEvent]) -> Result<()> {
    write_events(File::create(path)?, events)
}

/// Write reporting gaps as CSV rows.
pub fn write_gaps<W: Write>(writer: W, gaps: &[ReportingGap]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for gap in gaps {
        out.serialize(gap)?;
    }
    out.flush()?;
    Ok(())
}

/// Write reporting gaps to a file path.
pub fn write_gaps_to_path<P: AsRef<Path>>(path: P, gaps: &[ReportingGap]) -> Result<()> {
    write_gaps(File::create(path)?, gaps)
}
