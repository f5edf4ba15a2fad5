//! Per-key comparison outcomes.

use crate::kind::DataKind;
use serde::{Deserialize, Serialize};

/// Classification of one key after comparing source and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Source and target hold equivalent data.
    Match,
    /// The key did not survive on the target.
    Missing,
    /// Source and target report different type labels.
    TypeMismatch,
    /// Same type, different contents.
    ValueMismatch,
    /// A store query failed while comparing this key.
    Error,
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, OutcomeStatus::Match)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Match => "match",
            OutcomeStatus::Missing => "missing",
            OutcomeStatus::TypeMismatch => "type_mismatch",
            OutcomeStatus::ValueMismatch => "value_mismatch",
            OutcomeStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of comparing one [`TestRecord`](crate::TestRecord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub key: String,
    pub kind: DataKind,
    pub status: OutcomeStatus,
    pub detail: String,
}

impl ComparisonOutcome {
    pub fn new(
        key: impl Into<String>,
        kind: DataKind,
        status: OutcomeStatus,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            status,
            detail: detail.into(),
        }
    }

    pub fn matched(key: impl Into<String>, kind: DataKind, detail: impl Into<String>) -> Self {
        Self::new(key, kind, OutcomeStatus::Match, detail)
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}
