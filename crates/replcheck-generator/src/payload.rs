//! Kind-specific payloads for seeded keys.

use replcheck_core::{Bytes, DataKind};
use std::time::Duration;

/// Default expiry applied to plain scalar payloads.
pub const DEFAULT_SCALAR_EXPIRY: Duration = Duration::from_secs(600);

/// The data written for one seeded key.
///
/// Payloads are pure functions of the record index and the run timestamp,
/// so two generators configured alike write identical data.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedPayload {
    Scalar {
        value: Bytes,
        expiry: Option<Duration>,
    },
    Hash(Vec<(Bytes, Bytes)>),
    /// Items in push order; they are pushed onto the head, so the stored
    /// list reads back reversed.
    List(Vec<Bytes>),
    Set(Vec<Bytes>),
    SortedSet(Vec<(Bytes, f64)>),
    /// Field lists for each appended entry; ids are assigned by the store.
    Stream(Vec<Vec<(Bytes, Bytes)>>),
}

fn b(s: String) -> Bytes {
    s.into_bytes()
}

impl SeedPayload {
    /// Build the payload for record `index`.
    pub fn build(index: u64, timestamp: i64, scalar_expiry: Option<Duration>) -> Self {
        let i = index;
        match DataKind::for_index(index) {
            DataKind::Scalar => {
                // Alternate scalars carry multi-byte text and no expiry.
                if (i / DataKind::ALL.len() as u64) % 2 == 1 {
                    SeedPayload::Scalar {
                        value: b(format!("special_测试_{i}_🔥_{timestamp}")),
                        expiry: None,
                    }
                } else {
                    SeedPayload::Scalar {
                        value: b(format!("test_value_{i}_timestamp_{timestamp}")),
                        expiry: scalar_expiry,
                    }
                }
            }
            DataKind::Hash => SeedPayload::Hash(vec![
                (b("field1".into()), b(format!("value_{i}_1"))),
                (b("field2".into()), b(format!("value_{i}_2"))),
                (b("counter".into()), b(i.to_string())),
                (b("ts".into()), b(timestamp.to_string())),
            ]),
            DataKind::List => {
                SeedPayload::List((1..=3).map(|n| b(format!("item_{i}_{n}"))).collect())
            }
            DataKind::Set => {
                SeedPayload::Set((1..=3).map(|n| b(format!("member_{i}_{n}"))).collect())
            }
            DataKind::SortedSet => {
                let base = (i * 10) as f64;
                SeedPayload::SortedSet(vec![
                    (b(format!("member_{i}_1")), base),
                    (b(format!("member_{i}_2")), base + 5.0),
                    (b(format!("member_{i}_3")), base + 10.0),
                    (b(format!("fraction_{i}")), i as f64 + 0.1),
                ])
            }
            DataKind::Stream => SeedPayload::Stream(
                (1..=3)
                    .map(|seq| {
                        vec![
                            (b("seq".into()), b(seq.to_string())),
                            (b("index".into()), b(i.to_string())),
                            (b("ts".into()), b(timestamp.to_string())),
                        ]
                    })
                    .collect(),
            ),
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            SeedPayload::Scalar { .. } => DataKind::Scalar,
            SeedPayload::Hash(_) => DataKind::Hash,
            SeedPayload::List(_) => DataKind::List,
            SeedPayload::Set(_) => DataKind::Set,
            SeedPayload::SortedSet(_) => DataKind::SortedSet,
            SeedPayload::Stream(_) => DataKind::Stream,
        }
    }

    /// The single value that captures this payload, if there is one.
    pub fn expected(&self) -> Option<&[u8]> {
        match self {
            SeedPayload::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }
}
