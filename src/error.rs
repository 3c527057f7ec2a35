//! Unified error handling for the detection pipeline.
//!
//! Only two conditions are fatal: invalid configuration (caught before any
//! I/O) and losing the position source entirely. Per-tile read failures are
//! isolated by the pipeline and surface in the batch summary instead; thin
//! tracks and malformed records are counted, never raised.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StsError>;

#[derive(Error, Debug)]
pub enum StsError {
    /// Invalid pipeline parameters. Fails fast, before any data is read.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A position read failed (missing partition, malformed file).
    #[error("position read failed: {0}")]
    DataAccess(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
