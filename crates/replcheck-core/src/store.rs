//! The uniform command surface the harness uses against either store.

use crate::stream::{StreamEntry, StreamEntryId, StreamIdSpec, StreamSummary, StreamTrim};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Raw binary-safe value as stored.
pub type Bytes = Vec<u8>;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Could not reach the store.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected the supplied credential.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The store answered a command with an error reply.
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    /// The reply did not have the expected shape.
    #[error("Unexpected reply to {command}: {message}")]
    Protocol { command: String, message: String },

    /// The key holds a different kind of value than the command expects.
    #[error("WRONGTYPE Operation against key '{key}' holding the wrong kind of value")]
    WrongType { key: String },
}

impl StoreError {
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn protocol(command: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Protocol {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Operations the harness needs from a key-value store.
///
/// Implemented over the network by `replcheck-redis` and in-process by
/// `MemoryStore` (`test-util` feature). Methods take `&self`; implementations
/// are expected to be cheap to share between the generator and the verifier.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Short label used in logs ("source", "target", an address...).
    fn label(&self) -> &str;

    /// Round-trip check used right after connecting.
    async fn ping(&self) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Type label as the store reports it, `"none"` when the key is absent.
    async fn key_type(&self, key: &str) -> StoreResult<String>;

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> StoreResult<()>;

    async fn hash_set(&self, key: &str, fields: &[(Bytes, Bytes)]) -> StoreResult<()>;

    async fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<Bytes, Bytes>>;

    /// Push each item onto the head of the list, in argument order.
    async fn list_push_head(&self, key: &str, items: &[Bytes]) -> StoreResult<u64>;

    /// Append each item to the tail of the list, in argument order.
    async fn list_push_tail(&self, key: &str, items: &[Bytes]) -> StoreResult<u64>;

    /// The full list, head first.
    async fn list_range(&self, key: &str) -> StoreResult<Vec<Bytes>>;

    async fn set_add(&self, key: &str, members: &[Bytes]) -> StoreResult<u64>;

    async fn set_members(&self, key: &str) -> StoreResult<BTreeSet<Bytes>>;

    async fn sorted_set_add(&self, key: &str, members: &[(Bytes, f64)]) -> StoreResult<u64>;

    /// Every (member, score) pair, in score order.
    async fn sorted_set_range(&self, key: &str) -> StoreResult<Vec<(Bytes, f64)>>;

    /// Append an entry, optionally trimming in the same command.
    async fn stream_add(
        &self,
        key: &str,
        id: StreamIdSpec,
        fields: &[(Bytes, Bytes)],
        trim: Option<StreamTrim>,
    ) -> StoreResult<StreamEntryId>;

    /// Trim a stream; returns the number of entries removed.
    async fn stream_trim(&self, key: &str, trim: StreamTrim) -> StoreResult<u64>;

    /// The full range of entries, oldest first.
    async fn stream_range(&self, key: &str) -> StoreResult<Vec<StreamEntry>>;

    /// Length and first/last entries, `None` when the stream does not exist.
    async fn stream_summary(&self, key: &str) -> StoreResult<Option<StreamSummary>>;

    /// Delete keys; returns how many existed.
    async fn delete(&self, keys: &[String]) -> StoreResult<u64>;

    /// Every key starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Escape glob metacharacters so a literal prefix can be used in a
/// `MATCH` pattern.
pub fn glob_escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
