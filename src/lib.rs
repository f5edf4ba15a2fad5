//! replcheck library
//!
//! A harness for verifying that a replication engine copies a key-value store
//! faithfully. It writes known data to a source store while the engine under
//! test is mid-transfer, waits for the engine to converge, and compares every
//! key on the target against the source with data-type-aware rules.
//!
//! # Crates
//!
//! - `replcheck_core` - store contract, record/outcome types, in-memory store
//! - `replcheck_redis` - Redis-protocol store adapter
//! - `replcheck_generator` - deterministic seed data
//! - `replcheck_phase` - phase synchronization gates
//! - `replcheck_verify` - equivalence engine and summary
//!
//! # CLI Usage
//!
//! ```bash
//! # Seed keys while the engine is in its RDB phase, wait, verify
//! replcheck rdb-phase --config config.yaml --settle 2m
//!
//! # Stream replication scenarios
//! replcheck stream --config config.yaml --sync marker
//!
//! # Keys present on the source but absent on the target
//! replcheck keys --config config.yaml --prefix "user:"
//! ```

use clap::{Parser, ValueEnum};
use replcheck_core::KvStore;
use replcheck_phase::{
    ManualGate, MarkerProbe, NoopGate, PhaseGate, PolledConvergence, TimedSettle,
    DEFAULT_SETTLE_INTERVAL,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;

pub mod config;
pub mod exit;
pub mod harness;
pub mod render;
pub mod streams;

pub use replcheck_generator::{DEFAULT_PREFIX, DEFAULT_RECORD_COUNT};

/// How the harness waits for the target to catch up before verifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncPolicy {
    /// Wait for the operator to press Enter
    Manual,
    /// Sleep for the settle duration
    Timed,
    /// Poll for a marker key written to the source until it shows up on the target
    Marker,
    /// Do not wait
    None,
}

#[derive(Parser, Clone, Debug)]
pub struct PhaseOpts {
    /// Key namespace for test keys
    #[arg(long, default_value = DEFAULT_PREFIX, env = "REPLCHECK_PREFIX")]
    pub prefix: String,

    /// How to wait for replication before verifying
    #[arg(long, value_enum, default_value = "timed")]
    pub sync: SyncPolicy,

    /// Upper bound on replication convergence time (e.g. "120", "90s", "2m").
    /// Defaults to 120s for rdb-phase and 2s for stream.
    #[arg(long, value_parser = config::parse_duration)]
    pub settle: Option<Duration>,

    /// Progress interval while settling, and poll interval for --sync marker
    #[arg(long, value_parser = config::parse_duration, default_value = "10s")]
    pub settle_interval: Duration,
}

impl PhaseOpts {
    pub fn settle_or(&self, default: Duration) -> Duration {
        self.settle.unwrap_or(default)
    }
}

impl Default for PhaseOpts {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            sync: SyncPolicy::Timed,
            settle: None,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
        }
    }
}

/// Build the gate that separates "written to source" from "safe to compare".
///
/// A manual gate shares `operator`'s input, so one reader serves every prompt.
pub fn settle_gate<R>(
    operator: &ManualGate<R>,
    policy: SyncPolicy,
    settle: Duration,
    interval: Duration,
    source: Arc<dyn KvStore>,
    target: Arc<dyn KvStore>,
    prefix: &str,
) -> Box<dyn PhaseGate>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    match policy {
        SyncPolicy::Manual => Box::new(operator.with_prompt(
            "Press Enter once replication has caught up to start verification...",
        )),
        SyncPolicy::Timed => Box::new(TimedSettle::new(settle, interval)),
        SyncPolicy::Marker => Box::new(PolledConvergence::new(
            MarkerProbe::new(source, target, prefix),
            if interval.is_zero() {
                Duration::from_millis(500)
            } else {
                interval
            },
            settle,
        )),
        SyncPolicy::None => Box::new(NoopGate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replcheck_core::MemoryStore;
    use replcheck_phase::PhaseError;
    use tokio::time::Instant;

    fn operator(input: &'static [u8]) -> ManualGate<&'static [u8]> {
        ManualGate::new("Press Enter to start", input)
    }

    #[test]
    fn test_policy_selects_gate() {
        let source: Arc<dyn KvStore> = Arc::new(MemoryStore::new("source"));
        let target: Arc<dyn KvStore> = Arc::new(MemoryStore::new("target"));
        let gate = |policy| {
            settle_gate(
                &operator(b""),
                policy,
                Duration::from_secs(5),
                Duration::from_secs(1),
                source.clone(),
                target.clone(),
                "t:",
            )
            .describe()
        };
        assert_eq!(gate(SyncPolicy::Manual), "operator acknowledgement");
        assert_eq!(gate(SyncPolicy::None), NoopGate.describe());
        assert_eq!(gate(SyncPolicy::Timed), "timed settle of 5s");
        assert!(gate(SyncPolicy::Marker).starts_with("convergence poll every 1000ms"));
    }

    #[tokio::test]
    async fn test_manual_policy_reads_after_start_gate() {
        let source: Arc<dyn KvStore> = Arc::new(MemoryStore::new("source"));
        let target: Arc<dyn KvStore> = Arc::new(MemoryStore::new("target"));
        let start = operator(b"\n\n");
        let settle = settle_gate(
            &start,
            SyncPolicy::Manual,
            Duration::ZERO,
            Duration::ZERO,
            source,
            target,
            "t:",
        );
        start.wait().await.unwrap();
        settle.wait().await.unwrap();
        assert!(matches!(
            settle.wait().await,
            Err(PhaseError::AcknowledgementClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_policy_waits_for_each_batch() {
        let source = Arc::new(MemoryStore::new("source"));
        let target = Arc::new(MemoryStore::new("target"));
        let settle = settle_gate(
            &operator(b""),
            SyncPolicy::Marker,
            Duration::from_secs(30),
            Duration::from_secs(1),
            source.clone(),
            target.clone(),
            "t:",
        );

        for (round, key) in ["t:first", "t:second"].into_iter().enumerate() {
            source.set(key, b"v", None).await.unwrap();
            let (from, to) = (source.clone(), target.clone());
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                from.replicate_to(&to, "t:");
            });

            let started = Instant::now();
            settle.wait().await.unwrap();
            assert!(
                started.elapsed() >= Duration::from_secs(3),
                "round {round} opened before replication"
            );
            assert!(target.exists(key).await.unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_policy_times_out_without_replication() {
        let source: Arc<dyn KvStore> = Arc::new(MemoryStore::new("source"));
        let target: Arc<dyn KvStore> = Arc::new(MemoryStore::new("target"));
        let settle = settle_gate(
            &operator(b""),
            SyncPolicy::Marker,
            Duration::from_secs(2),
            Duration::from_secs(10),
            source,
            target,
            "t:",
        );
        let started = Instant::now();
        assert!(matches!(
            settle.wait().await,
            Err(PhaseError::ConvergenceTimeout { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
