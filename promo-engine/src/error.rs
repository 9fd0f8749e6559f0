use std::fmt;

use common::error::AppError;
use thiserror::Error;
use tokio::task::JoinError;

/// Failure of a single coupon source during an ingestion pass. Terminal for
/// that source only; the pass continues with the remaining sources.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to fetch source: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("remote server returned status code {0}")]
    FetchStatus(reqwest::StatusCode),
    #[error("failed to open local coupon file: {0}")]
    Open(#[source] std::io::Error),
    #[error("invalid gzip stream: {0}")]
    Gzip(#[source] std::io::Error),
    #[error("decompressed size reached the cap of {cap_bytes} bytes, possible malicious file")]
    DecompressBomb { cap_bytes: u64 },
    #[error("scratch file error: {0}")]
    Scratch(#[source] std::io::Error),
    #[error("error scanning decompressed file: {0}")]
    Scan(#[source] std::io::Error),
    #[error("source worker task failed: {0}")]
    Task(#[from] JoinError),
}

/// One failed source, tagged with its position and origin for logging and
/// for callers that inspect what went wrong.
#[derive(Debug)]
pub struct SourceFailure {
    /// Zero-based position in the configured source list.
    pub index: usize,
    pub origin: String,
    pub error: SourceError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source {} ({}): {}",
            self.index + 1,
            self.origin,
            self.error
        )
    }
}

/// Outcome of a failed ingestion pass.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("engine is closed")]
    Closed,
    /// Aborts the pass; batches committed before the failure remain applied.
    #[error("repository write failed: {0}")]
    Repository(#[source] AppError),
    /// Joined per-source failures. Sources that succeeded have already been
    /// aggregated into the repository.
    #[error("{} of {total} sources failed", .failures.len())]
    Sources {
        failures: Vec<SourceFailure>,
        total: usize,
    },
}
