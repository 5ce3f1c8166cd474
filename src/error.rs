//! Probe error taxonomy
//!
//! Only upstream retrieval failures abort a run. A field missing from an
//! otherwise readable report defaults to zero at composition, and a
//! malformed record is skipped during aggregation; neither surfaces here.

use thiserror::Error;

/// Fatal errors for a probe run. No partial metric set is ever emitted
/// once one of these is raised.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A source command ran but signalled failure.
    #[error("{command} report failed with status {status}")]
    UpstreamCommandFailure { command: &'static str, status: i32 },

    /// A source command could not be started, or a counters file could
    /// not be read.
    #[error("failed to retrieve {source} report: {error}")]
    Retrieval {
        source: &'static str,
        #[source]
        error: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
