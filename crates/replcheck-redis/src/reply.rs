//! Decoding of raw replies into harness types.
//!
//! Replies are decoded by hand rather than through `FromRedisValue` so that
//! both RESP2 (flat arrays) and RESP3 (maps, doubles) shapes are accepted.

use redis::Value;
use replcheck_core::{Bytes, StoreError, StoreResult, StreamEntry, StreamEntryId, StreamSummary};

pub(crate) fn bytes(command: &str, value: &Value) -> StoreResult<Bytes> {
    match value {
        Value::BulkString(b) => Ok(b.clone()),
        Value::SimpleString(s) => Ok(s.clone().into_bytes()),
        Value::Int(i) => Ok(i.to_string().into_bytes()),
        Value::Okay => Ok(b"OK".to_vec()),
        Value::VerbatimString { text, .. } => Ok(text.clone().into_bytes()),
        other => Err(StoreError::protocol(
            command,
            format!("expected a string, got {other:?}"),
        )),
    }
}

pub(crate) fn text(command: &str, value: &Value) -> StoreResult<String> {
    let raw = bytes(command, value)?;
    String::from_utf8(raw).map_err(|e| StoreError::protocol(command, e.to_string()))
}

pub(crate) fn score(command: &str, value: &Value) -> StoreResult<f64> {
    match value {
        Value::Double(d) => Ok(*d),
        other => {
            let raw = text(command, other)?;
            raw.parse::<f64>()
                .map_err(|_| StoreError::protocol(command, format!("invalid score {raw:?}")))
        }
    }
}

pub(crate) fn integer(command: &str, value: &Value) -> StoreResult<u64> {
    match value {
        Value::Int(i) if *i >= 0 => Ok(*i as u64),
        other => {
            let raw = text(command, other)?;
            raw.parse::<u64>()
                .map_err(|_| StoreError::protocol(command, format!("invalid integer {raw:?}")))
        }
    }
}

pub(crate) fn stream_id(command: &str, value: &Value) -> StoreResult<StreamEntryId> {
    let raw = text(command, value)?;
    raw.parse()
        .map_err(|e: replcheck_core::StreamIdParseError| StoreError::protocol(command, e.to_string()))
}

/// Flatten a key/value reply into pairs: a RESP2 flat array or a RESP3 map.
pub(crate) fn pairs(command: &str, value: Value) -> StoreResult<Vec<(Value, Value)>> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Map(pairs) => Ok(pairs),
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(StoreError::protocol(
                    command,
                    format!("odd number of elements ({}) in pair reply", items.len()),
                ));
            }
            let mut out = Vec::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                out.push((k, v));
            }
            Ok(out)
        }
        other => Err(StoreError::protocol(
            command,
            format!("expected pairs, got {other:?}"),
        )),
    }
}

pub(crate) fn byte_pairs(command: &str, value: Value) -> StoreResult<Vec<(Bytes, Bytes)>> {
    pairs(command, value)?
        .iter()
        .map(|(k, v)| Ok((bytes(command, k)?, bytes(command, v)?)))
        .collect()
}

pub(crate) fn items(command: &str, value: Value) -> StoreResult<Vec<Value>> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Array(items) | Value::Set(items) => Ok(items),
        other => Err(StoreError::protocol(
            command,
            format!("expected an array, got {other:?}"),
        )),
    }
}

/// Decode one `[id, [field, value, ...]]` entry.
pub(crate) fn stream_entry(command: &str, value: Value) -> StoreResult<StreamEntry> {
    let mut parts = items(command, value)?.into_iter();
    let (Some(id), Some(fields)) = (parts.next(), parts.next()) else {
        return Err(StoreError::protocol(command, "stream entry must have an id and fields"));
    };
    Ok(StreamEntry::new(
        stream_id(command, &id)?,
        byte_pairs(command, fields)?,
    ))
}

pub(crate) fn stream_entries(command: &str, value: Value) -> StoreResult<Vec<StreamEntry>> {
    items(command, value)?
        .into_iter()
        .map(|entry| stream_entry(command, entry))
        .collect()
}

/// Decode the `XINFO STREAM` reply, keeping only length and first/last entry.
pub(crate) fn stream_summary(command: &str, value: Value) -> StoreResult<StreamSummary> {
    let mut summary = StreamSummary::default();
    for (key, field) in pairs(command, value)? {
        match text(command, &key)?.as_str() {
            "length" => summary.length = integer(command, &field)?,
            "first-entry" if !matches!(field, Value::Nil) => {
                summary.first_entry = Some(stream_entry(command, field)?)
            }
            "last-entry" if !matches!(field, Value::Nil) => {
                summary.last_entry = Some(stream_entry(command, field)?)
            }
            _ => {}
        }
    }
    Ok(summary)
}
