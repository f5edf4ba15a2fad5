//! Seed data generator for the replcheck verification harness.
//!
//! This crate provides the [`SeedGenerator`] which writes a deterministic,
//! type-diverse set of keys to the source store while the replication engine
//! under test is mid-transfer. Kinds are assigned round-robin so every
//! supported data structure is covered whenever at least six records are
//! requested.
//!
//! # Architecture
//!
//! ```text
//! (count, prefix, timestamp)
//!        │
//!        ▼
//! ┌─────────────────┐
//! │  SeedGenerator  │──── SeedPayload::build(index) ───▶ source store
//! │                 │
//! │  - prefix       │
//! │  - count        │
//! │  - pacing       │
//! └────────┬────────┘
//!          │
//!          ▼
//!    Vec<TestRecord { key, kind, expected }>
//! ```
//!
//! # Example
//!
//! ```rust
//! use replcheck_core::MemoryStore;
//! use replcheck_generator::SeedGenerator;
//!
//! # tokio_test::block_on(async {
//! let source = MemoryStore::new("source");
//! let generator = SeedGenerator::new("rdb_phase_test:", 12).with_timestamp(1_700_000_000);
//! let records = generator.inject(&source).await.unwrap();
//! assert_eq!(records.len(), 12);
//! assert_eq!(records[7].key, "rdb_phase_test:key_007");
//! # });
//! ```

pub mod generator;
pub mod payload;

// Re-exports for convenience
pub use generator::{GeneratorError, SeedGenerator, DEFAULT_PREFIX, DEFAULT_RECORD_COUNT};
pub use payload::SeedPayload;
