//! Error taxonomy for VCF/BCF table scans.
//!
//! Errors are grouped by the phase that raises them so callers can tell a
//! fatal bind-time problem from an isolated per-shard failure. Conformance
//! findings during schema derivation are warnings, not errors, and never
//! appear here.

use datafusion::common::DataFusionError;
use thiserror::Error;

/// Errors raised by VCF/BCF table binding, scanning, and merging.
#[derive(Debug, Error)]
pub enum VcfTableError {
    /// The header is missing or cannot be parsed. Fatal at bind time.
    #[error("invalid VCF/BCF header: {0}")]
    Header(String),

    /// An index is required but missing or unreadable. Fatal for region
    /// scans; full scans degrade to a single shard instead.
    #[error("index error: {0}")]
    Index(String),

    /// A record could not be decoded against the corrected schema. Fatal for
    /// the shard that hit it.
    #[error("decode error at {contig}:{position}: {message}")]
    Decode {
        /// Contig of the offending record.
        contig: String,
        /// 1-based position of the offending record.
        position: u64,
        /// Underlying decode failure.
        message: String,
    },

    /// A shard worker failed. Isolated: the artifact is excluded from the
    /// merge and the remaining shards continue.
    #[error("shard {shard} failed: {message}")]
    Shard {
        /// Index of the failed shard.
        shard: usize,
        /// Underlying failure.
        message: String,
    },

    /// No shard produced a usable artifact. Terminal, and distinct from an
    /// empty result: an empty input yields an empty dataset, not this error.
    #[error("merge failed: {0}")]
    Merge(String),

    /// Arrow-side failure while assembling record batches.
    #[error(transparent)]
    Arrow(#[from] datafusion::arrow::error::ArrowError),

    /// I/O failure outside the categories above.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<VcfTableError> for DataFusionError {
    fn from(e: VcfTableError) -> Self {
        DataFusionError::Execution(e.to_string())
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, VcfTableError>;
