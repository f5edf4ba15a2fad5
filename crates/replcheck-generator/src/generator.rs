//! Seed generator that writes test records to the source store.

use crate::payload::{SeedPayload, DEFAULT_SCALAR_EXPIRY};
use replcheck_core::{KvStore, StoreError, StreamIdSpec, TestRecord};
use std::time::Duration;
use tracing::{debug, info};

/// Key namespace used when none is configured.
pub const DEFAULT_PREFIX: &str = "rdb_phase_test:";

/// Number of records written when none is configured.
pub const DEFAULT_RECORD_COUNT: u64 = 20;

const PROGRESS_EVERY: u64 = 5;

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A seed write was rejected; no record from this run is usable.
    #[error("Failed to write seed key {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Writes a deterministic, type-diverse workload to a store.
#[derive(Debug, Clone)]
pub struct SeedGenerator {
    /// Namespace prepended to every key
    prefix: String,
    /// Number of records to write
    count: u64,
    /// Expiry for plain scalar payloads
    scalar_expiry: Option<Duration>,
    /// Delay between writes, spreading them across the replication window
    pacing: Duration,
    /// Fixed timestamp embedded in payloads; wall clock when unset
    timestamp: Option<i64>,
}

impl SeedGenerator {
    pub fn new(prefix: impl Into<String>, count: u64) -> Self {
        Self {
            prefix: prefix.into(),
            count,
            scalar_expiry: Some(DEFAULT_SCALAR_EXPIRY),
            pacing: Duration::ZERO,
            timestamp: None,
        }
    }

    /// Sleep for `pacing` after every write.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_scalar_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.scalar_expiry = expiry;
        self
    }

    /// Pin the timestamp embedded in payloads.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Key for record `index`.
    pub fn key_for(&self, index: u64) -> String {
        format!("{}key_{:03}", self.prefix, index)
    }

    /// The records this generator would write, without touching a store.
    pub fn plan(&self) -> Vec<(TestRecord, SeedPayload)> {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        (0..self.count)
            .map(|index| {
                let payload = SeedPayload::build(index, timestamp, self.scalar_expiry);
                let mut record = TestRecord::new(self.key_for(index), payload.kind());
                if let Some(expected) = payload.expected() {
                    record = record.with_expected(expected.to_vec());
                }
                (record, payload)
            })
            .collect()
    }

    /// Write every record to `store`, in index order.
    ///
    /// Fails fast on the first rejected write; the caller gets no records
    /// back in that case and must not go on to verification.
    pub async fn inject(&self, store: &dyn KvStore) -> Result<Vec<TestRecord>, GeneratorError> {
        info!(
            "Writing {} test keys to {} under '{}'",
            self.count,
            store.label(),
            self.prefix
        );

        let plan = self.plan();
        let mut records = Vec::with_capacity(plan.len());
        for (written, (record, payload)) in plan.into_iter().enumerate() {
            write_payload(store, &record.key, &payload)
                .await
                .map_err(|source| GeneratorError::Write {
                    key: record.key.clone(),
                    source,
                })?;
            debug!("Wrote {} ({})", record.key, record.kind);
            records.push(record);

            let written = written as u64 + 1;
            if written % PROGRESS_EVERY == 0 {
                info!("Written {}/{} keys", written, self.count);
            }
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!("Successfully wrote {} test keys", records.len());
        Ok(records)
    }
}

async fn write_payload(
    store: &dyn KvStore,
    key: &str,
    payload: &SeedPayload,
) -> Result<(), StoreError> {
    match payload {
        SeedPayload::Scalar { value, expiry } => store.set(key, value, *expiry).await,
        SeedPayload::Hash(fields) => store.hash_set(key, fields).await,
        SeedPayload::List(items) => store.list_push_head(key, items).await.map(|_| ()),
        SeedPayload::Set(members) => store.set_add(key, members).await.map(|_| ()),
        SeedPayload::SortedSet(members) => store.sorted_set_add(key, members).await.map(|_| ()),
        SeedPayload::Stream(entries) => {
            for fields in entries {
                store.stream_add(key, StreamIdSpec::Auto, fields, None).await?;
            }
            Ok(())
        }
    }
}
