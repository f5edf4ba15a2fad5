//! Stream identifiers, entries, summaries and trim requests.

use crate::store::Bytes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifier of a stream entry: a millisecond time part and a sequence part.
///
/// Ordering is lexicographic over `(ms, seq)`, which the derived `Ord`
/// gives us from the field order. The default is `0-0`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StreamEntryId {
    /// Time component (milliseconds).
    pub ms: u64,
    /// Sequence component within the same millisecond.
    pub seq: u64,
}

impl StreamEntryId {
    /// The smallest possible id.
    pub const MIN: StreamEntryId = StreamEntryId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// The id that immediately follows this one, if any.
    pub fn successor(&self) -> Option<Self> {
        match self.seq.checked_add(1) {
            Some(seq) => Some(Self { ms: self.ms, seq }),
            None => self.ms.checked_add(1).map(|ms| Self { ms, seq: 0 }),
        }
    }
}

impl std::fmt::Display for StreamEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// Error returned when a stream id string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid stream id: {0:?}")]
pub struct StreamIdParseError(pub String);

impl FromStr for StreamEntryId {
    type Err = StreamIdParseError;

    /// Parse `"<ms>-<seq>"`. A bare `"<ms>"` is accepted with sequence 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || StreamIdParseError(s.to_string());
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms, seq),
            None => (s, "0"),
        };
        let ms = ms.parse::<u64>().map_err(|_| err())?;
        let seq = seq.parse::<u64>().map_err(|_| err())?;
        Ok(Self { ms, seq })
    }
}

/// How the id of an appended entry is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamIdSpec {
    /// Let the store assign the next id (`*`).
    Auto,
    /// Use this exact id; must be greater than the stream's last id.
    Explicit(StreamEntryId),
}

/// Which bound a trim enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrimStrategy {
    /// Keep at most this many of the newest entries.
    MaxLen(u64),
    /// Drop every entry whose id is below this one.
    MinId(StreamEntryId),
}

/// A trim request, either standalone or inline with an append.
///
/// `approximate` is a hint to the store that it may keep a few extra
/// entries. The verifier never relaxes its comparison because of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTrim {
    pub strategy: TrimStrategy,
    pub approximate: bool,
}

impl StreamTrim {
    pub fn max_len(len: u64) -> Self {
        Self {
            strategy: TrimStrategy::MaxLen(len),
            approximate: false,
        }
    }

    pub fn min_id(id: StreamEntryId) -> Self {
        Self {
            strategy: TrimStrategy::MinId(id),
            approximate: false,
        }
    }

    pub fn approximate(mut self) -> Self {
        self.approximate = true;
        self
    }
}

/// One stream entry with its field/value pairs in store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub id: StreamEntryId,
    pub fields: Vec<(Bytes, Bytes)>,
}

impl StreamEntry {
    pub fn new(id: StreamEntryId, fields: Vec<(Bytes, Bytes)>) -> Self {
        Self { id, fields }
    }
}

/// What a store reports about a stream as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamSummary {
    pub length: u64,
    pub first_entry: Option<StreamEntry>,
    pub last_entry: Option<StreamEntry>,
}
