//! Network store adapter.

use crate::reply;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, RedisError, Value};
use replcheck_core::{
    glob_escape, Bytes, KvStore, StoreError, StoreResult, StreamEntry, StreamEntryId,
    StreamIdSpec, StreamSummary, StreamTrim, TrimStrategy,
};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info};

/// Default time allowed to establish the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for any single reply.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

const SCAN_BATCH: u64 = 1000;

/// A [`KvStore`] backed by a Redis-protocol server.
#[derive(Clone)]
pub struct RedisStore {
    label: String,
    addr: String,
    connection: MultiplexedConnection,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("label", &self.label)
            .field("addr", &self.addr)
            .finish()
    }
}

impl RedisStore {
    /// Connect to `addr` (`host:port`), authenticate when a password is
    /// given, and verify the link with a `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the server is unreachable and
    /// [`StoreError::Auth`] if the password is rejected.
    pub async fn connect(
        label: impl Into<String>,
        addr: &str,
        password: Option<&str>,
    ) -> StoreResult<Self> {
        Self::connect_with_timeouts(
            label,
            addr,
            password,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_RESPONSE_TIMEOUT,
        )
        .await
    }

    pub async fn connect_with_timeouts(
        label: impl Into<String>,
        addr: &str,
        password: Option<&str>,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> StoreResult<Self> {
        let label = label.into();
        let client = redis::Client::open(format!("redis://{addr}/").as_str())
            .map_err(|e| StoreError::Connection(format!("invalid address {addr}: {e}")))?;

        let connection = client
            .get_multiplexed_async_connection_with_timeouts(response_timeout, connect_timeout)
            .await
            .map_err(|e| StoreError::Connection(format!("failed to connect to {addr}: {e}")))?;

        let store = Self {
            label,
            addr: addr.to_string(),
            connection,
        };

        if let Some(password) = password.filter(|p| !p.is_empty()) {
            let mut auth = redis::cmd("AUTH");
            auth.arg(password);
            store
                .query::<Value>("AUTH", &auth)
                .await
                .map_err(|e| StoreError::Auth(format!("{addr}: {e}")))?;
        }

        store.ping().await?;
        info!("Connected to {} ({})", store.label, store.addr);
        Ok(store)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn query<T: redis::FromRedisValue>(&self, command: &str, cmd: &Cmd) -> StoreResult<T> {
        let mut connection = self.connection.clone();
        cmd.query_async(&mut connection)
            .await
            .map_err(|e| map_error(command, None, e))
    }

    async fn query_key<T: redis::FromRedisValue>(
        &self,
        command: &str,
        key: &str,
        cmd: &Cmd,
    ) -> StoreResult<T> {
        let mut connection = self.connection.clone();
        cmd.query_async(&mut connection)
            .await
            .map_err(|e| map_error(command, Some(key), e))
    }
}

fn map_error(command: &str, key: Option<&str>, err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        return StoreError::Connection(format!("{command}: {err}"));
    }
    match (err.code(), key) {
        (Some("WRONGTYPE"), Some(key)) => StoreError::WrongType {
            key: key.to_string(),
        },
        (Some("NOAUTH") | Some("WRONGPASS"), _) => StoreError::Auth(err.to_string()),
        _ if err.kind() == redis::ErrorKind::AuthenticationFailed => {
            StoreError::Auth(err.to_string())
        }
        _ => StoreError::command(command, err.to_string()),
    }
}

fn push_trim(cmd: &mut Cmd, trim: &StreamTrim) {
    let operator = if trim.approximate { "~" } else { "=" };
    match trim.strategy {
        TrimStrategy::MaxLen(len) => {
            cmd.arg("MAXLEN").arg(operator).arg(len);
        }
        TrimStrategy::MinId(id) => {
            cmd.arg("MINID").arg(operator).arg(id.to_string());
        }
    }
}

#[async_trait::async_trait]
impl KvStore for RedisStore {
    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> StoreResult<()> {
        let pong: String = self.query("PING", &redis::cmd("PING")).await?;
        debug!("{} answered {}", self.label, pong);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: i64 = self.query_key("EXISTS", key, &cmd).await?;
        Ok(count > 0)
    }

    async fn key_type(&self, key: &str) -> StoreResult<String> {
        let mut cmd = redis::cmd("TYPE");
        cmd.arg(key);
        self.query_key("TYPE", key, &cmd).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query_key("GET", key, &cmd).await
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> StoreResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = expiry {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        let _: Value = self.query_key("SET", key, &cmd).await?;
        Ok(())
    }

    async fn hash_set(&self, key: &str, fields: &[(Bytes, Bytes)]) -> StoreResult<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field.as_slice()).arg(value.as_slice());
        }
        let _: Value = self.query_key("HSET", key, &cmd).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<Bytes, Bytes>> {
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(key);
        let raw: Value = self.query_key("HGETALL", key, &cmd).await?;
        Ok(reply::byte_pairs("HGETALL", raw)?.into_iter().collect())
    }

    async fn list_push_head(&self, key: &str, items: &[Bytes]) -> StoreResult<u64> {
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(key);
        for item in items {
            cmd.arg(item.as_slice());
        }
        self.query_key("LPUSH", key, &cmd).await
    }

    async fn list_push_tail(&self, key: &str, items: &[Bytes]) -> StoreResult<u64> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key);
        for item in items {
            cmd.arg(item.as_slice());
        }
        self.query_key("RPUSH", key, &cmd).await
    }

    async fn list_range(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(0).arg(-1);
        self.query_key("LRANGE", key, &cmd).await
    }

    async fn set_add(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key);
        for member in members {
            cmd.arg(member.as_slice());
        }
        self.query_key("SADD", key, &cmd).await
    }

    async fn set_members(&self, key: &str) -> StoreResult<BTreeSet<Bytes>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        let raw: Value = self.query_key("SMEMBERS", key, &cmd).await?;
        reply::items("SMEMBERS", raw)?
            .iter()
            .map(|member| reply::bytes("SMEMBERS", member))
            .collect()
    }

    async fn sorted_set_add(&self, key: &str, members: &[(Bytes, f64)]) -> StoreResult<u64> {
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key);
        for (member, score) in members {
            cmd.arg(*score).arg(member.as_slice());
        }
        self.query_key("ZADD", key, &cmd).await
    }

    async fn sorted_set_range(&self, key: &str) -> StoreResult<Vec<(Bytes, f64)>> {
        let mut cmd = redis::cmd("ZRANGE");
        cmd.arg(key).arg(0).arg(-1).arg("WITHSCORES");
        let raw: Value = self.query_key("ZRANGE", key, &cmd).await?;
        // RESP3 servers nest [member, score] pairs; RESP2 servers flatten them.
        let items = reply::items("ZRANGE", raw)?;
        if items.iter().all(|item| matches!(item, Value::Array(_))) {
            items
                .into_iter()
                .map(|pair| {
                    let pair = reply::items("ZRANGE", pair)?;
                    match pair.as_slice() {
                        [member, score] => Ok((
                            reply::bytes("ZRANGE", member)?,
                            reply::score("ZRANGE", score)?,
                        )),
                        _ => Err(StoreError::protocol("ZRANGE", "malformed member/score pair")),
                    }
                })
                .collect()
        } else {
            reply::pairs("ZRANGE", Value::Array(items))?
                .iter()
                .map(|(member, score)| {
                    Ok((
                        reply::bytes("ZRANGE", member)?,
                        reply::score("ZRANGE", score)?,
                    ))
                })
                .collect()
        }
    }

    async fn stream_add(
        &self,
        key: &str,
        id: StreamIdSpec,
        fields: &[(Bytes, Bytes)],
        trim: Option<StreamTrim>,
    ) -> StoreResult<StreamEntryId> {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(key);
        if let Some(trim) = &trim {
            push_trim(&mut cmd, trim);
        }
        match id {
            StreamIdSpec::Auto => cmd.arg("*"),
            StreamIdSpec::Explicit(id) => cmd.arg(id.to_string()),
        };
        for (field, value) in fields {
            cmd.arg(field.as_slice()).arg(value.as_slice());
        }
        let raw: Value = self.query_key("XADD", key, &cmd).await?;
        reply::stream_id("XADD", &raw)
    }

    async fn stream_trim(&self, key: &str, trim: StreamTrim) -> StoreResult<u64> {
        let mut cmd = redis::cmd("XTRIM");
        cmd.arg(key);
        push_trim(&mut cmd, &trim);
        self.query_key("XTRIM", key, &cmd).await
    }

    async fn stream_range(&self, key: &str) -> StoreResult<Vec<StreamEntry>> {
        let mut cmd = redis::cmd("XRANGE");
        cmd.arg(key).arg("-").arg("+");
        let raw: Value = self.query_key("XRANGE", key, &cmd).await?;
        reply::stream_entries("XRANGE", raw)
    }

    async fn stream_summary(&self, key: &str) -> StoreResult<Option<StreamSummary>> {
        let mut cmd = redis::cmd("XINFO");
        cmd.arg("STREAM").arg(key);
        let mut connection = self.connection.clone();
        match cmd.query_async::<Value>(&mut connection).await {
            Ok(raw) => reply::stream_summary("XINFO", raw).map(Some),
            Err(e) if e.to_string().to_ascii_lowercase().contains("no such key") => Ok(None),
            Err(e) => Err(map_error("XINFO", Some(key), e)),
        }
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        self.query("DEL", &cmd).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let pattern = format!("{}*", glob_escape(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);
            let (next, batch): (u64, Vec<String>) = self.query("SCAN", &cmd).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once across iterations.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
