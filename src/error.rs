//! Error types for msgbench

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Orchestrator error type
///
/// Configuration errors (`UnknownWorkload`, `UnknownDriver`, `Config`)
/// are validated before any run starts and abort the whole request.
/// Store errors abort an in-progress matrix; per-run failures are not
/// errors at all, they are recorded in the [`RunResult`](crate::RunResult).
#[derive(Debug, Error)]
pub enum BenchError {
    /// A requested workload id is not present in the catalog
    #[error("unknown workload: {0}")]
    UnknownWorkload(String),

    /// A requested driver id is not present in the registry
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    /// Configuration is malformed or violates an invariant
    #[error("configuration error: {0}")]
    Config(String),

    /// The result store cannot be read or written
    #[error("result store unavailable: {0}")]
    StoreUnavailable(String),

    /// A result with the same (workload, driver, started_at) key already exists
    #[error("duplicate result for workload {workload}, driver {driver} at {started_at}")]
    DuplicateResult {
        /// Workload id of the rejected record
        workload: String,
        /// Driver id of the rejected record
        driver: String,
        /// Start timestamp of the rejected record
        started_at: DateTime<Utc>,
    },

    /// No results have been recorded for the requested workload
    #[error("no results recorded for workload: {0}")]
    NoDataForWorkload(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
