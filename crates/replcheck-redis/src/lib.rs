//! Redis-protocol implementation of [`replcheck_core::KvStore`].
//!
//! Works against any server speaking the Redis protocol (Redis, Dragonfly,
//! Valkey...). Each [`RedisStore`] owns one multiplexed connection that is
//! cloned per command, so the store can be shared by reference between the
//! generator and the verifier.
//!
//! ```ignore
//! use replcheck_redis::RedisStore;
//!
//! let source = RedisStore::connect("source", "127.0.0.1:6380", None).await?;
//! source.ping().await?;
//! ```

mod reply;
mod store;

pub use store::{RedisStore, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT};
