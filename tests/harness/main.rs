//! Harness integration tests.
//!
//! These run the full seed -> wait -> verify flow against in-memory stores.
//! Replication is simulated by a gate that mirrors the source prefix onto the
//! target when it opens, optionally damaging the copy afterwards.

mod common;
mod config_resolution;
mod rdb_phase;
mod stream_scenarios;
