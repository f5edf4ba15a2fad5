//! Kind-specific comparison rules.
//!
//! Each function takes the source representation first and the target second,
//! and reports the first difference it finds.

use replcheck_core::{Bytes, StreamEntry, StreamSummary};
use std::collections::{BTreeMap, BTreeSet};

const PREVIEW_CHARS: usize = 48;

/// Result of comparing two representations of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareResult {
    /// Representations are equivalent.
    Match,
    /// Representations differ; `detail` names the first difference.
    Mismatch { detail: String },
}

impl CompareResult {
    fn mismatch(detail: impl Into<String>) -> Self {
        CompareResult::Mismatch {
            detail: detail.into(),
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, CompareResult::Match)
    }
}

/// Render bytes for a detail message, lossy and truncated.
pub fn preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head:?}...")
    } else {
        format!("{text:?}")
    }
}

fn preview_opt(bytes: Option<&Bytes>) -> String {
    bytes.map_or_else(|| "(nil)".to_string(), |b| preview(b))
}

/// Byte-exact equality of a scalar value.
pub fn compare_scalar(source: Option<&Bytes>, target: Option<&Bytes>) -> CompareResult {
    if source == target {
        CompareResult::Match
    } else {
        CompareResult::mismatch(format!(
            "value differs: source={}, target={}",
            preview_opt(source),
            preview_opt(target)
        ))
    }
}

/// Full field map equality, no subset allowed.
pub fn compare_hash(source: &BTreeMap<Bytes, Bytes>, target: &BTreeMap<Bytes, Bytes>) -> CompareResult {
    for (field, value) in source {
        match target.get(field) {
            None => {
                return CompareResult::mismatch(format!(
                    "field {} missing on target",
                    preview(field)
                ))
            }
            Some(other) if other != value => {
                return CompareResult::mismatch(format!(
                    "field {} differs: source={}, target={}",
                    preview(field),
                    preview(value),
                    preview(other)
                ))
            }
            Some(_) => {}
        }
    }
    if let Some(extra) = target.keys().find(|field| !source.contains_key(*field)) {
        return CompareResult::mismatch(format!(
            "field {} only on target ({} vs {} fields)",
            preview(extra),
            source.len(),
            target.len()
        ));
    }
    CompareResult::Match
}

/// Position-by-position equality of the full list.
pub fn compare_list(source: &[Bytes], target: &[Bytes]) -> CompareResult {
    if let Some(index) = source.iter().zip(target).position(|(s, t)| s != t) {
        return CompareResult::mismatch(format!(
            "element {} differs: source={}, target={}",
            index,
            preview(&source[index]),
            preview(&target[index])
        ));
    }
    if source.len() != target.len() {
        return CompareResult::mismatch(format!(
            "length differs: source={}, target={}",
            source.len(),
            target.len()
        ));
    }
    CompareResult::Match
}

/// Membership equality, order independent.
pub fn compare_set(source: &BTreeSet<Bytes>, target: &BTreeSet<Bytes>) -> CompareResult {
    if let Some(member) = source.difference(target).next() {
        return CompareResult::mismatch(format!("member {} missing on target", preview(member)));
    }
    if let Some(member) = target.difference(source).next() {
        return CompareResult::mismatch(format!("member {} only on target", preview(member)));
    }
    CompareResult::Match
}

/// Equality of (member, score) pairs. Scores must be bit-identical.
pub fn compare_sorted_set(source: &[(Bytes, f64)], target: &[(Bytes, f64)]) -> CompareResult {
    let target_scores: BTreeMap<&Bytes, f64> = target.iter().map(|(m, s)| (m, *s)).collect();
    for (member, score) in source {
        match target_scores.get(member) {
            None => {
                return CompareResult::mismatch(format!(
                    "member {} missing on target",
                    preview(member)
                ))
            }
            Some(other) if other.to_bits() != score.to_bits() => {
                return CompareResult::mismatch(format!(
                    "score of {} differs: source={score:?}, target={other:?}",
                    preview(member)
                ))
            }
            Some(_) => {}
        }
    }
    if source.len() != target.len() {
        let source_members: BTreeSet<&Bytes> = source.iter().map(|(m, _)| m).collect();
        let extra = target
            .iter()
            .map(|(m, _)| m)
            .find(|m| !source_members.contains(m));
        return CompareResult::mismatch(match extra {
            Some(member) => format!("member {} only on target", preview(member)),
            None => format!(
                "cardinality differs: source={}, target={}",
                source.len(),
                target.len()
            ),
        });
    }
    CompareResult::Match
}

/// Everything the stream rule looks at for one side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSnapshot {
    /// `None` when the stream does not exist.
    pub summary: Option<StreamSummary>,
    /// Full range, oldest first.
    pub entries: Vec<StreamEntry>,
}

impl StreamSnapshot {
    /// Absent, or present with no entries.
    pub fn is_empty(&self) -> bool {
        self.summary.as_ref().is_none_or(|s| s.length == 0)
    }

    fn length(&self) -> u64 {
        self.summary.as_ref().map_or(0, |s| s.length)
    }
}

fn describe_entry(entry: Option<&StreamEntry>) -> String {
    entry.map_or_else(|| "(none)".to_string(), |e| e.id.to_string())
}

/// Stream equality: reported length, the full ordered range of (id, fields),
/// then the reported first and last entries.
///
/// Two streams that are each either absent or empty are equivalent.
pub fn compare_stream(source: &StreamSnapshot, target: &StreamSnapshot) -> CompareResult {
    if source.is_empty() && target.is_empty() {
        return CompareResult::Match;
    }

    if source.length() != target.length() {
        return CompareResult::mismatch(format!(
            "length differs: source={}, target={}",
            source.length(),
            target.length()
        ));
    }

    for (index, (s, t)) in source.entries.iter().zip(&target.entries).enumerate() {
        if s.id != t.id {
            return CompareResult::mismatch(format!(
                "entry {index} id differs: source={}, target={}",
                s.id, t.id
            ));
        }
        if s.fields != t.fields {
            return CompareResult::mismatch(format!("entry {} fields differ", s.id));
        }
    }
    if source.entries.len() != target.entries.len() {
        return CompareResult::mismatch(format!(
            "range size differs: source={}, target={}",
            source.entries.len(),
            target.entries.len()
        ));
    }

    let (src_first, src_last) = ends(source);
    let (dst_first, dst_last) = ends(target);
    if src_first != dst_first {
        return CompareResult::mismatch(format!(
            "first entry differs: source={}, target={}",
            describe_entry(src_first),
            describe_entry(dst_first)
        ));
    }
    if src_last != dst_last {
        return CompareResult::mismatch(format!(
            "last entry differs: source={}, target={}",
            describe_entry(src_last),
            describe_entry(dst_last)
        ));
    }
    CompareResult::Match
}

fn ends(snapshot: &StreamSnapshot) -> (Option<&StreamEntry>, Option<&StreamEntry>) {
    match &snapshot.summary {
        Some(summary) => (summary.first_entry.as_ref(), summary.last_entry.as_ref()),
        None => (None, None),
    }
}
