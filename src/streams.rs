//! Stream replication scenarios.
//!
//! Each scenario writes to one stream key on the source, waits on the phase
//! gate, and compares that key on both stores with the stream rule. Trims
//! (approximate or exact) are held to exact convergence.

use anyhow::Context;
use replcheck_core::{
    ComparisonOutcome, DataKind, KvStore, OutcomeStatus, StoreError, StreamEntryId, StreamIdSpec,
    StreamTrim, TestRecord,
};
use replcheck_phase::PhaseGate;
use replcheck_verify::{EquivalenceEngine, Summary};
use tracing::{info, warn};

/// The stream scenarios, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamScenario {
    /// Appends with ids 1-0, 2-0, 3-0.
    ExplicitIds,
    /// Three appends with store-assigned ids.
    AutoIds,
    /// 100 appends, then an approximate trim to about 50.
    ApproxMaxLen,
    /// Ids 1-0 through 10-0, then drop everything below 5-0.
    MinId,
    /// One append, then an exact trim to zero entries.
    TrimToZero,
    /// 20 appends, each capping the stream at about 10 entries.
    InlineTrim,
}

impl StreamScenario {
    pub const ALL: [StreamScenario; 6] = [
        StreamScenario::ExplicitIds,
        StreamScenario::AutoIds,
        StreamScenario::ApproxMaxLen,
        StreamScenario::MinId,
        StreamScenario::TrimToZero,
        StreamScenario::InlineTrim,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StreamScenario::ExplicitIds => "basic",
            StreamScenario::AutoIds => "autoid",
            StreamScenario::ApproxMaxLen => "trim_maxlen",
            StreamScenario::MinId => "trim_minid",
            StreamScenario::TrimToZero => "trim_zero",
            StreamScenario::InlineTrim => "inline_trim",
        }
    }

    pub fn key(&self, prefix: &str) -> String {
        format!("{}stream:{}", prefix, self.name())
    }

    /// Perform the scenario's writes against `store`.
    pub async fn apply(&self, store: &dyn KvStore, key: &str) -> Result<(), StoreError> {
        match self {
            StreamScenario::ExplicitIds => {
                let entries: [(u64, &[(&str, &str)]); 3] = [
                    (1, &[("field1", "value1"), ("field2", "value2")]),
                    (2, &[("field3", "value3"), ("field4", "value4")]),
                    (3, &[("field5", "value5")]),
                ];
                for (ms, fields) in entries {
                    let id = StreamIdSpec::Explicit(StreamEntryId::new(ms, 0));
                    store.stream_add(key, id, &pairs(fields), None).await?;
                }
            }
            StreamScenario::AutoIds => {
                for n in 1..=3 {
                    let fields = pairs(&[("auto", format!("entry{n}").as_str())]);
                    store.stream_add(key, StreamIdSpec::Auto, &fields, None).await?;
                }
            }
            StreamScenario::ApproxMaxLen => {
                for seq in 0..100 {
                    let fields = pairs(&[("seq", seq.to_string().as_str())]);
                    store.stream_add(key, StreamIdSpec::Auto, &fields, None).await?;
                }
                store
                    .stream_trim(key, StreamTrim::max_len(50).approximate())
                    .await?;
            }
            StreamScenario::MinId => {
                for seq in 0..10u64 {
                    let id = StreamIdSpec::Explicit(StreamEntryId::new(seq + 1, 0));
                    let fields = pairs(&[("seq", seq.to_string().as_str())]);
                    store.stream_add(key, id, &fields, None).await?;
                }
                store
                    .stream_trim(key, StreamTrim::min_id(StreamEntryId::new(5, 0)))
                    .await?;
            }
            StreamScenario::TrimToZero => {
                let fields = pairs(&[("test", "data")]);
                store.stream_add(key, StreamIdSpec::Auto, &fields, None).await?;
                store.stream_trim(key, StreamTrim::max_len(0)).await?;
            }
            StreamScenario::InlineTrim => {
                for seq in 0..20 {
                    let fields = pairs(&[("seq", seq.to_string().as_str())]);
                    let trim = Some(StreamTrim::max_len(10).approximate());
                    store.stream_add(key, StreamIdSpec::Auto, &fields, trim).await?;
                }
            }
        }
        Ok(())
    }
}

fn pairs(fields: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    fields
        .iter()
        .map(|(f, v)| (f.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

/// Run every scenario and summarize the outcomes.
///
/// A scenario whose writes fail is recorded as an error outcome and the suite
/// moves on; a failing gate aborts the suite.
pub async fn run_stream_suite(
    source: &dyn KvStore,
    target: &dyn KvStore,
    gate: &dyn PhaseGate,
    prefix: &str,
) -> anyhow::Result<Summary> {
    let keys: Vec<String> = StreamScenario::ALL.iter().map(|s| s.key(prefix)).collect();
    for store in [source, target] {
        store
            .delete(&keys)
            .await
            .with_context(|| format!("Failed to clean stream keys from {}", store.label()))?;
    }

    let engine = EquivalenceEngine::new(source, target);
    let mut outcomes = Vec::with_capacity(StreamScenario::ALL.len());
    for scenario in StreamScenario::ALL {
        let key = scenario.key(prefix);
        info!("Stream scenario '{}' on {}", scenario.name(), key);

        if let Err(e) = scenario.apply(source, &key).await {
            warn!("Scenario '{}' could not write to source: {}", scenario.name(), e);
            outcomes.push(ComparisonOutcome::new(
                key,
                DataKind::Stream,
                OutcomeStatus::Error,
                format!("scenario {} failed on source: {e}", scenario.name()),
            ));
            continue;
        }

        gate.wait()
            .await
            .with_context(|| format!("Convergence wait failed in scenario '{}'", scenario.name()))?;

        let outcome = engine
            .verify_record(&TestRecord::new(key, DataKind::Stream))
            .await;
        if outcome.is_failure() {
            warn!("Scenario '{}' failed: {}", scenario.name(), outcome.detail);
        } else {
            info!("Scenario '{}' passed", scenario.name());
        }
        outcomes.push(outcome);
    }
    Ok(Summary::from_outcomes(&outcomes))
}
