//! Core types for the replcheck verification harness.
//!
//! This crate provides the foundational types shared by the generator,
//! the phase synchronizer and the equivalence engine:
//!
//! - [`DataKind`] - The six data structures the harness knows how to compare
//! - [`TestRecord`] - A key injected into the source store
//! - [`ComparisonOutcome`] - The verdict for one record after one pass
//! - [`StreamEntryId`] and friends - Stream identifiers, entries and trims
//! - [`KvStore`] - The uniform command surface over a source or target store
//! - `MemoryStore` - An in-process [`KvStore`] used by tests (`test-util` feature)
//!
//! # Architecture
//!
//! ```text
//! replcheck-core (this crate)
//!    │
//!    ├─── replcheck-generator  (writes TestRecords through KvStore)
//!    ├─── replcheck-phase      (waits for convergence, probes through KvStore)
//!    ├─── replcheck-verify     (reads both stores, produces ComparisonOutcomes)
//!    └─── replcheck-redis      (implements KvStore over the redis protocol)
//! ```

pub mod kind;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod outcome;
pub mod record;
pub mod store;
pub mod stream;

// Re-exports for convenience
pub use kind::DataKind;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use outcome::{ComparisonOutcome, OutcomeStatus};
pub use record::TestRecord;
pub use store::{glob_escape, Bytes, KvStore, StoreError, StoreResult};
pub use stream::{
    StreamEntry, StreamEntryId, StreamIdParseError, StreamIdSpec, StreamSummary, StreamTrim,
    TrimStrategy,
};
