//! Records injected into the source store.

use crate::kind::DataKind;
use crate::store::Bytes;
use serde::{Deserialize, Serialize};

/// A key written to the source store by the generator.
///
/// Records are immutable once created and are consumed by exactly one
/// comparison per verification pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Fully qualified key, including the namespace prefix.
    pub key: String,
    /// Declared data structure kind.
    pub kind: DataKind,
    /// Injected payload for kinds where a single value captures it (scalars).
    /// Kept for provenance; equivalence is always judged source against target.
    pub expected: Option<Bytes>,
}

impl TestRecord {
    pub fn new(key: impl Into<String>, kind: DataKind) -> Self {
        Self {
            key: key.into(),
            kind,
            expected: None,
        }
    }

    pub fn with_expected(mut self, value: impl Into<Bytes>) -> Self {
        self.expected = Some(value.into());
        self
    }
}
