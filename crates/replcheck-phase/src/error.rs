use replcheck_core::StoreError;
use std::time::Duration;

/// Errors raised while waiting on a phase gate.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    /// The acknowledgement input closed before the operator confirmed.
    #[error("Acknowledgement input closed before the phase was confirmed")]
    AcknowledgementClosed,

    #[error("Failed to read acknowledgement: {0}")]
    Io(#[from] std::io::Error),

    /// The convergence probe never reported success within its bound.
    #[error("Replication did not converge within {waited:?}")]
    ConvergenceTimeout { waited: Duration },

    #[error("Convergence probe failed: {0}")]
    Probe(#[from] StoreError),
}
