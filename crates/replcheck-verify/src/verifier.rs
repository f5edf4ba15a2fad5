//! Per-key equivalence checks between a source and a target store.

use crate::compare::{
    compare_hash, compare_list, compare_scalar, compare_set, compare_sorted_set, compare_stream,
    CompareResult, StreamSnapshot,
};
use replcheck_core::{
    ComparisonOutcome, DataKind, KvStore, OutcomeStatus, StoreError, TestRecord,
};
use tracing::{debug, info, warn};

const ABSENT: &str = "none";

/// Compares records between two stores.
///
/// Each call takes a single snapshot of both sides; nothing is retried.
pub struct EquivalenceEngine<'a> {
    source: &'a dyn KvStore,
    target: &'a dyn KvStore,
}

impl<'a> EquivalenceEngine<'a> {
    pub fn new(source: &'a dyn KvStore, target: &'a dyn KvStore) -> Self {
        Self { source, target }
    }

    /// Compare every record, in order, producing exactly one outcome each.
    ///
    /// The pass always runs to the end; failures are collected, not raised.
    pub async fn verify_all(&self, records: &[TestRecord]) -> Vec<ComparisonOutcome> {
        info!(
            "Verifying {} keys between {} and {}",
            records.len(),
            self.source.label(),
            self.target.label()
        );
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.verify_record(record).await);
        }
        outcomes
    }

    /// Compare one record. Store faults become [`OutcomeStatus::Error`].
    pub async fn verify_record(&self, record: &TestRecord) -> ComparisonOutcome {
        let outcome = match self.compare(record).await {
            Ok(outcome) => outcome,
            Err(e) => ComparisonOutcome::new(
                &record.key,
                record.kind,
                OutcomeStatus::Error,
                format!("verification error: {e}"),
            ),
        };
        if outcome.is_failure() {
            warn!("{}: {} ({})", outcome.key, outcome.status, outcome.detail);
        } else {
            debug!("{}: verified", outcome.key);
        }
        outcome
    }

    async fn compare(&self, record: &TestRecord) -> Result<ComparisonOutcome, StoreError> {
        let key = record.key.as_str();
        let kind = record.kind;
        let source_type = self.source.key_type(key).await?;
        let target_type = self.target.key_type(key).await?;

        // Streams that are absent or empty on both sides have converged.
        if kind == DataKind::Stream {
            let source_empty = self.stream_is_empty(self.source, key, &source_type).await?;
            let target_empty = self.stream_is_empty(self.target, key, &target_type).await?;
            if source_empty && target_empty {
                return Ok(ComparisonOutcome::matched(
                    key,
                    kind,
                    "stream empty or absent on both sides",
                ));
            }
            if source_type == ABSENT && target_type == kind.type_label() {
                return Ok(ComparisonOutcome::new(
                    key,
                    kind,
                    OutcomeStatus::ValueMismatch,
                    "present only on target",
                ));
            }
        }

        if target_type == ABSENT {
            let detail = if source_type == ABSENT {
                "absent on both source and target"
            } else {
                "missing in target"
            };
            return Ok(ComparisonOutcome::new(key, kind, OutcomeStatus::Missing, detail));
        }

        if source_type != target_type {
            return Ok(ComparisonOutcome::new(
                key,
                kind,
                OutcomeStatus::TypeMismatch,
                format!("type mismatch (source={source_type}, target={target_type})"),
            ));
        }

        if source_type != kind.type_label() {
            return Ok(ComparisonOutcome::new(
                key,
                kind,
                OutcomeStatus::TypeMismatch,
                format!(
                    "declared {} but both stores hold {}",
                    kind.type_label(),
                    source_type
                ),
            ));
        }

        let result = self.compare_contents(key, kind).await?;
        Ok(match result {
            CompareResult::Match => ComparisonOutcome::matched(key, kind, "verified"),
            CompareResult::Mismatch { detail } => {
                ComparisonOutcome::new(key, kind, OutcomeStatus::ValueMismatch, detail)
            }
        })
    }

    async fn compare_contents(&self, key: &str, kind: DataKind) -> Result<CompareResult, StoreError> {
        let (source, target) = (self.source, self.target);
        Ok(match kind {
            DataKind::Scalar => compare_scalar(
                source.get(key).await?.as_ref(),
                target.get(key).await?.as_ref(),
            ),
            DataKind::Hash => compare_hash(
                &source.hash_get_all(key).await?,
                &target.hash_get_all(key).await?,
            ),
            DataKind::List => compare_list(
                &source.list_range(key).await?,
                &target.list_range(key).await?,
            ),
            DataKind::Set => compare_set(
                &source.set_members(key).await?,
                &target.set_members(key).await?,
            ),
            DataKind::SortedSet => compare_sorted_set(
                &source.sorted_set_range(key).await?,
                &target.sorted_set_range(key).await?,
            ),
            DataKind::Stream => compare_stream(
                &stream_snapshot(source, key).await?,
                &stream_snapshot(target, key).await?,
            ),
        })
    }

    async fn stream_is_empty(
        &self,
        store: &dyn KvStore,
        key: &str,
        type_label: &str,
    ) -> Result<bool, StoreError> {
        if type_label == ABSENT {
            return Ok(true);
        }
        if type_label != DataKind::Stream.type_label() {
            return Ok(false);
        }
        Ok(store
            .stream_summary(key)
            .await?
            .is_none_or(|summary| summary.length == 0))
    }
}

/// Fetch everything the stream rule compares for one side.
pub async fn stream_snapshot(store: &dyn KvStore, key: &str) -> Result<StreamSnapshot, StoreError> {
    let summary = store.stream_summary(key).await?;
    let entries = match summary {
        Some(_) => store.stream_range(key).await?,
        None => Vec::new(),
    };
    Ok(StreamSnapshot { summary, entries })
}
