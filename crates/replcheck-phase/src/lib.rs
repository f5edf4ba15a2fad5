//! Phase synchronization for the replcheck verification harness.
//!
//! The replication engine under test runs asynchronously and does not say
//! when it is done. A [`PhaseGate`] bounds the interval between "data written
//! to the source" and "safe to read the target":
//!
//! - [`ManualGate`] - wait for an operator to acknowledge on an input stream
//! - [`TimedSettle`] - sleep for a configured upper bound, reporting progress
//! - [`PolledConvergence`] - poll a [`ConvergenceProbe`] until it converges
//! - [`NoopGate`] - return immediately (automated tests)

mod error;
mod gate;
mod manual;
mod polled;
mod timed;

pub use error::PhaseError;
pub use gate::{NoopGate, PhaseGate};
pub use manual::ManualGate;
pub use polled::{ConvergenceProbe, MarkerProbe, PolledConvergence};
pub use timed::{ProgressSink, TimedSettle, TracingProgress, DEFAULT_SETTLE, DEFAULT_SETTLE_INTERVAL};
