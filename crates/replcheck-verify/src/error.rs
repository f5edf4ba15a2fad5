//! Error types for verification.

use replcheck_core::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur outside a single key's comparison.
///
/// Per-key store faults never surface here; they become
/// [`OutcomeStatus::Error`](replcheck_core::OutcomeStatus::Error) outcomes.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Enumerating keys failed.
    #[error("Key scan failed: {0}")]
    Scan(#[from] StoreError),

    /// Report could not be serialized.
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Report could not be written.
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
