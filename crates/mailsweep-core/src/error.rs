//! Error types for the core library.

use thiserror::Error;

use crate::backend::BackendError;
use crate::year::YearError;

/// Errors that end a run.
///
/// Failures of a single message never appear here; they are reported to the
/// [`ReportSink`](crate::ReportSink) and the run continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Every connection attempt failed.
    #[error("Unable to reconnect after {attempts} attempts: {source}")]
    Reconnect {
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the last attempt.
        source: BackendError,
    },

    /// The year search could not be completed.
    #[error("Search failed: {0}")]
    Search(#[source] BackendError),

    /// The requested year is invalid.
    #[error(transparent)]
    Year(#[from] YearError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
