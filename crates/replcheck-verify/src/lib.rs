//! Equivalence engine for the replcheck verification harness.
//!
//! This crate decides, key by key, whether a target store holds the same data
//! as the source store, and folds the per-key outcomes into a [`Summary`] with
//! a pass/fail [`Verdict`].
//!
//! # Example
//!
//! ```ignore
//! use replcheck_verify::{EquivalenceEngine, Summary};
//!
//! let engine = EquivalenceEngine::new(&source, &target);
//! let outcomes = engine.verify_all(&records).await;
//! let summary = Summary::from_outcomes(&outcomes);
//! println!("{}", summary.summary_line());
//! ```

pub mod compare;
pub mod error;
pub mod keyscan;
pub mod report;
pub mod verifier;

pub use compare::{CompareResult, StreamSnapshot};
pub use error::VerifyError;
pub use keyscan::{scan_missing_keys, KeyScanReport};
pub use report::{RunReport, Summary, Verdict};
pub use verifier::EquivalenceEngine;
