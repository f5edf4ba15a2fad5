//! In-process store used by tests and by harness self-checks.
//!
//! `MemoryStore` follows the observable semantics of a Redis-protocol server
//! closely enough for the harness: type labels, lazy expiry, head/tail list
//! pushes, score-ordered sorted sets, stream id monotonicity and trimming.
//! It also supports fault injection so error paths can be exercised without
//! a network.

use crate::store::{Bytes, KvStore, StoreError, StoreResult};
use crate::stream::{
    StreamEntry, StreamEntryId, StreamIdSpec, StreamSummary, StreamTrim, TrimStrategy,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
enum Value {
    Str(Bytes),
    Hash(BTreeMap<Bytes, Bytes>),
    List(VecDeque<Bytes>),
    Set(BTreeSet<Bytes>),
    SortedSet(BTreeMap<Bytes, f64>),
    Stream(MemStream),
}

impl Value {
    fn type_label(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
            Value::Stream(_) => "stream",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemStream {
    entries: BTreeMap<StreamEntryId, Vec<(Bytes, Bytes)>>,
    last_id: StreamEntryId,
}

impl MemStream {
    fn next_auto_id(&self) -> Option<StreamEntryId> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        if now_ms > self.last_id.ms {
            Some(StreamEntryId::new(now_ms, 0))
        } else {
            self.last_id.successor()
        }
    }

    /// Approximate trims are applied exactly: keeping fewer extra entries is
    /// always within what an approximate trim allows.
    fn trim(&mut self, trim: StreamTrim) -> u64 {
        let before = self.entries.len() as u64;
        match trim.strategy {
            TrimStrategy::MaxLen(max) => {
                while self.entries.len() as u64 > max {
                    self.entries.pop_first();
                }
            }
            TrimStrategy::MinId(min) => {
                self.entries = self.entries.split_off(&min);
            }
        }
        before - self.entries.len() as u64
    }

    fn entry(&self, (id, fields): (&StreamEntryId, &Vec<(Bytes, Bytes)>)) -> StreamEntry {
        StreamEntry::new(*id, fields.clone())
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Slot>,
    faults: HashMap<String, String>,
}

impl Inner {
    fn check_fault(&self, key: &str, command: &str) -> StoreResult<()> {
        match self.faults.get(key) {
            Some(message) => Err(StoreError::command(command, message.clone())),
            None => Ok(()),
        }
    }

    /// Look up a key, dropping it first if its expiry has passed.
    fn live(&mut self, key: &str) -> Option<&mut Slot> {
        let expired = self
            .data
            .get(key)
            .and_then(|slot| slot.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.data.remove(key);
        }
        self.data.get_mut(key)
    }

    /// Fetch an existing value or create it with `init`, failing when the
    /// key already holds another type.
    fn value_or_insert(
        &mut self,
        key: &str,
        init: impl FnOnce() -> Value,
        expected: &'static str,
    ) -> StoreResult<&mut Value> {
        if self.live(key).is_none() {
            self.data.insert(
                key.to_string(),
                Slot {
                    value: init(),
                    expires_at: None,
                },
            );
        }
        let slot = self
            .data
            .get_mut(key)
            .ok_or_else(|| StoreError::protocol("memory", "slot vanished during insert"))?;
        if slot.value.type_label() != expected {
            return Err(StoreError::WrongType {
                key: key.to_string(),
            });
        }
        Ok(&mut slot.value)
    }
}

/// A [`KvStore`] held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    label: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every command touching `key` fail with `message`.
    pub fn inject_fault(&self, key: impl Into<String>, message: impl Into<String>) {
        self.state().faults.insert(key.into(), message.into());
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let mut state = self.state();
        let keys: Vec<String> = state.data.keys().cloned().collect();
        keys.iter().filter(|k| state.live(k).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mirror every key under `prefix` onto `target`, including deletions,
    /// the way a converged replication link would leave it.
    pub fn replicate_to(&self, target: &MemoryStore, prefix: &str) {
        let source: Vec<(String, Slot)> = {
            let mut state = self.state();
            let keys: Vec<String> = state
                .data
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|k| state.live(&k).cloned().map(|slot| (k, slot)))
                .collect()
        };

        let mut target_state = target.state();
        target_state.data.retain(|k, _| !k.starts_with(prefix));
        target_state.data.extend(source);
    }

    fn with_value<T>(
        &self,
        key: &str,
        command: &str,
        read: impl FnOnce(Option<&Value>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.state();
        state.check_fault(key, command)?;
        let value = state.live(key).map(|slot| &slot.value);
        read(value)
    }
}

fn wrong_type<T>(key: &str) -> StoreResult<T> {
    Err(StoreError::WrongType {
        key: key.to_string(),
    })
}

#[async_trait::async_trait]
impl KvStore for MemoryStore {
    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.with_value(key, "EXISTS", |v| Ok(v.is_some()))
    }

    async fn key_type(&self, key: &str) -> StoreResult<String> {
        self.with_value(key, "TYPE", |v| {
            Ok(v.map_or("none", Value::type_label).to_string())
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.with_value(key, "GET", |v| match v {
            None => Ok(None),
            Some(Value::Str(bytes)) => Ok(Some(bytes.clone())),
            Some(_) => wrong_type(key),
        })
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> StoreResult<()> {
        let mut state = self.state();
        state.check_fault(key, "SET")?;
        state.data.insert(
            key.to_string(),
            Slot {
                value: Value::Str(value.to_vec()),
                expires_at: expiry.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn hash_set(&self, key: &str, fields: &[(Bytes, Bytes)]) -> StoreResult<()> {
        let mut state = self.state();
        state.check_fault(key, "HSET")?;
        match state.value_or_insert(key, || Value::Hash(BTreeMap::new()), "hash")? {
            Value::Hash(map) => {
                map.extend(fields.iter().cloned());
                Ok(())
            }
            _ => wrong_type(key),
        }
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<Bytes, Bytes>> {
        self.with_value(key, "HGETALL", |v| match v {
            None => Ok(BTreeMap::new()),
            Some(Value::Hash(map)) => Ok(map.clone()),
            Some(_) => wrong_type(key),
        })
    }

    async fn list_push_head(&self, key: &str, items: &[Bytes]) -> StoreResult<u64> {
        let mut state = self.state();
        state.check_fault(key, "LPUSH")?;
        match state.value_or_insert(key, || Value::List(VecDeque::new()), "list")? {
            Value::List(list) => {
                for item in items {
                    list.push_front(item.clone());
                }
                Ok(list.len() as u64)
            }
            _ => wrong_type(key),
        }
    }

    async fn list_push_tail(&self, key: &str, items: &[Bytes]) -> StoreResult<u64> {
        let mut state = self.state();
        state.check_fault(key, "RPUSH")?;
        match state.value_or_insert(key, || Value::List(VecDeque::new()), "list")? {
            Value::List(list) => {
                list.extend(items.iter().cloned());
                Ok(list.len() as u64)
            }
            _ => wrong_type(key),
        }
    }

    async fn list_range(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.with_value(key, "LRANGE", |v| match v {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list.iter().cloned().collect()),
            Some(_) => wrong_type(key),
        })
    }

    async fn set_add(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        let mut state = self.state();
        state.check_fault(key, "SADD")?;
        match state.value_or_insert(key, || Value::Set(BTreeSet::new()), "set")? {
            Value::Set(set) => Ok(members
                .iter()
                .filter(|m| set.insert((*m).clone()))
                .count() as u64),
            _ => wrong_type(key),
        }
    }

    async fn set_members(&self, key: &str) -> StoreResult<BTreeSet<Bytes>> {
        self.with_value(key, "SMEMBERS", |v| match v {
            None => Ok(BTreeSet::new()),
            Some(Value::Set(set)) => Ok(set.clone()),
            Some(_) => wrong_type(key),
        })
    }

    async fn sorted_set_add(&self, key: &str, members: &[(Bytes, f64)]) -> StoreResult<u64> {
        if members.iter().any(|(_, score)| score.is_nan()) {
            return Err(StoreError::command("ZADD", "value is not a valid float"));
        }
        let mut state = self.state();
        state.check_fault(key, "ZADD")?;
        match state.value_or_insert(key, || Value::SortedSet(BTreeMap::new()), "zset")? {
            Value::SortedSet(zset) => {
                let mut added = 0;
                for (member, score) in members {
                    if zset.insert(member.clone(), *score).is_none() {
                        added += 1;
                    }
                }
                Ok(added)
            }
            _ => wrong_type(key),
        }
    }

    async fn sorted_set_range(&self, key: &str) -> StoreResult<Vec<(Bytes, f64)>> {
        self.with_value(key, "ZRANGE", |v| match v {
            None => Ok(Vec::new()),
            Some(Value::SortedSet(zset)) => {
                let mut pairs: Vec<(Bytes, f64)> =
                    zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
                pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                Ok(pairs)
            }
            Some(_) => wrong_type(key),
        })
    }

    async fn stream_add(
        &self,
        key: &str,
        id: StreamIdSpec,
        fields: &[(Bytes, Bytes)],
        trim: Option<StreamTrim>,
    ) -> StoreResult<StreamEntryId> {
        if fields.is_empty() {
            return Err(StoreError::command(
                "XADD",
                "wrong number of arguments for 'xadd' command",
            ));
        }
        let mut state = self.state();
        state.check_fault(key, "XADD")?;
        match state.value_or_insert(key, || Value::Stream(MemStream::default()), "stream")? {
            Value::Stream(stream) => {
                let id = match id {
                    StreamIdSpec::Auto => stream.next_auto_id().ok_or_else(|| {
                        StoreError::command("XADD", "The stream has exhausted the last possible ID")
                    })?,
                    StreamIdSpec::Explicit(id) => {
                        if id == StreamEntryId::MIN || id <= stream.last_id {
                            return Err(StoreError::command(
                                "XADD",
                                "The ID specified in XADD is equal or smaller than the target stream top item",
                            ));
                        }
                        id
                    }
                };
                stream.entries.insert(id, fields.to_vec());
                stream.last_id = id;
                if let Some(trim) = trim {
                    stream.trim(trim);
                }
                Ok(id)
            }
            _ => wrong_type(key),
        }
    }

    async fn stream_trim(&self, key: &str, trim: StreamTrim) -> StoreResult<u64> {
        let mut state = self.state();
        state.check_fault(key, "XTRIM")?;
        match state.live(key).map(|slot| &mut slot.value) {
            None => Ok(0),
            Some(Value::Stream(stream)) => Ok(stream.trim(trim)),
            Some(_) => wrong_type(key),
        }
    }

    async fn stream_range(&self, key: &str) -> StoreResult<Vec<StreamEntry>> {
        self.with_value(key, "XRANGE", |v| match v {
            None => Ok(Vec::new()),
            Some(Value::Stream(stream)) => {
                Ok(stream.entries.iter().map(|e| stream.entry(e)).collect())
            }
            Some(_) => wrong_type(key),
        })
    }

    async fn stream_summary(&self, key: &str) -> StoreResult<Option<StreamSummary>> {
        self.with_value(key, "XINFO", |v| match v {
            None => Ok(None),
            Some(Value::Stream(stream)) => Ok(Some(StreamSummary {
                length: stream.entries.len() as u64,
                first_entry: stream.entries.first_key_value().map(|e| stream.entry(e)),
                last_entry: stream.entries.last_key_value().map(|e| stream.entry(e)),
            })),
            Some(_) => wrong_type(key),
        })
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        let mut state = self.state();
        let mut removed = 0;
        for key in keys {
            state.check_fault(key, "DEL")?;
            if state.live(key).is_some() {
                state.data.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut state = self.state();
        let candidates: Vec<String> = state
            .data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        let mut keys: Vec<String> = candidates
            .into_iter()
            .filter(|k| state.live(k).is_some())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
