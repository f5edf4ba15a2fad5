//! RDB-phase consistency run: seed the source while the replication engine
//! is bulk-transferring, wait for convergence, and verify every seeded key.

use anyhow::Context;
use replcheck_core::{KvStore, StoreError};
use replcheck_generator::SeedGenerator;
use replcheck_phase::PhaseGate;
use replcheck_verify::{EquivalenceEngine, Summary};
use tracing::info;

/// Delete every key under `prefix`; returns how many were removed.
pub async fn cleanup_prefix(store: &dyn KvStore, prefix: &str) -> Result<u64, StoreError> {
    let keys = store.keys_with_prefix(prefix).await?;
    if keys.is_empty() {
        info!("No test keys found in {}", store.label());
        return Ok(0);
    }
    let removed = store.delete(&keys).await?;
    info!("Cleaned {} test keys from {}", removed, store.label());
    Ok(removed)
}

/// One RDB-phase run against a source/target pair.
pub struct RdbPhaseRun<'a> {
    pub source: &'a dyn KvStore,
    pub target: &'a dyn KvStore,
    /// Opens once the engine under test has entered the phase being tested.
    pub start_gate: &'a dyn PhaseGate,
    /// Opens once the target is believed to have converged.
    pub settle_gate: &'a dyn PhaseGate,
    pub generator: SeedGenerator,
    /// Remove leftover test keys from both stores before seeding.
    pub pre_clean: bool,
}

impl RdbPhaseRun<'_> {
    /// Run the phases in order and return the verification summary.
    ///
    /// Cleanup, gate and generation failures are fatal and returned as
    /// errors; per-key differences end up in the summary.
    pub async fn run(&self) -> anyhow::Result<Summary> {
        let prefix = self.generator.prefix();

        if self.pre_clean {
            for store in [self.source, self.target] {
                cleanup_prefix(store, prefix)
                    .await
                    .with_context(|| format!("Failed to clean test keys from {}", store.label()))?;
            }
        }

        info!("Waiting for start signal: {}", self.start_gate.describe());
        self.start_gate
            .wait()
            .await
            .context("Start gate failed")?;

        let records = self
            .generator
            .inject(self.source)
            .await
            .context("Could not write test data")?;

        info!("Waiting for convergence: {}", self.settle_gate.describe());
        self.settle_gate
            .wait()
            .await
            .context("Convergence wait failed")?;

        let engine = EquivalenceEngine::new(self.source, self.target);
        let outcomes = engine.verify_all(&records).await;
        Ok(Summary::from_outcomes(&outcomes))
    }

    /// Remove the seeded keys from both stores.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        for store in [self.source, self.target] {
            cleanup_prefix(store, self.generator.prefix())
                .await
                .with_context(|| format!("Failed to clean test keys from {}", store.label()))?;
        }
        Ok(())
    }
}
