//! Data structure kinds understood by the harness.

use serde::{Deserialize, Serialize};

/// The kind of data structure stored under a test key.
///
/// Each kind maps to exactly one store type label (the string the store
/// reports from its `TYPE` command), which is how source and target are
/// checked for structural agreement before their contents are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Plain string value.
    Scalar,
    /// Field to value mapping.
    Hash,
    /// Ordered sequence of elements.
    List,
    /// Unordered collection of unique members.
    Set,
    /// Members ordered by a floating point score.
    SortedSet,
    /// Append-only log of id-addressed entries.
    Stream,
}

impl DataKind {
    /// Every kind, in generator round-robin order.
    pub const ALL: [DataKind; 6] = [
        DataKind::Scalar,
        DataKind::Hash,
        DataKind::List,
        DataKind::Set,
        DataKind::SortedSet,
        DataKind::Stream,
    ];

    /// Pick the kind for a generator index, cycling through [`DataKind::ALL`].
    pub fn for_index(index: u64) -> Self {
        Self::ALL[(index % Self::ALL.len() as u64) as usize]
    }

    /// The type label a store reports for keys of this kind.
    pub fn type_label(&self) -> &'static str {
        match self {
            DataKind::Scalar => "string",
            DataKind::Hash => "hash",
            DataKind::List => "list",
            DataKind::Set => "set",
            DataKind::SortedSet => "zset",
            DataKind::Stream => "stream",
        }
    }

    /// Map a store type label back to a kind. Returns `None` for `none`
    /// (missing key) and for labels the harness does not model.
    pub fn from_type_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_label().eq_ignore_ascii_case(label))
    }

    /// Human readable name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Scalar => "scalar",
            DataKind::Hash => "hash",
            DataKind::List => "list",
            DataKind::Set => "set",
            DataKind::SortedSet => "sorted_set",
            DataKind::Stream => "stream",
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
