use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::SinkError;

/// External key/value store the dist references are published to.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Replace everything stored under `key` with `fields`.
    async fn replace(&self, key: &str, fields: &BTreeMap<String, String>) -> Result<(), SinkError>;
}

/// In-process sink; keeps the last published fields per key.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    reject:  BTreeSet<String>,
}

impl MemorySink {
    pub fn new() -> Self { Self::default() }

    /// A sink that fails every `replace` for the given keys.
    pub fn rejecting(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            entries: Mutex::default(),
            reject:  keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn len(&self) -> usize { self.entries.lock().unwrap_or_else(PoisonError::into_inner).len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn replace(&self, key: &str, fields: &BTreeMap<String, String>) -> Result<(), SinkError> {
        if self.reject.contains(key) {
            return Err(SinkError::Rejected {
                key:    key.to_string(),
                reason: "configured to reject".to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), fields.clone());
        Ok(())
    }
}

#[cfg(feature = "redis")]
mod redis_impl {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use redis::aio::MultiplexedConnection;
    use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

    use super::RecordSink;
    use crate::error::SinkError;

    #[derive(Debug, Clone)]
    pub struct RedisSettings {
        pub host:     String,
        pub port:     u16,
        pub password: Option<String>,
        pub db:       i64,
    }

    impl Default for RedisSettings {
        fn default() -> Self {
            Self {
                host:     "127.0.0.1".to_string(),
                port:     6379,
                password: None,
                db:       0,
            }
        }
    }

    impl RedisSettings {
        fn connection_info(&self) -> ConnectionInfo {
            ConnectionInfo {
                addr:  ConnectionAddr::Tcp(self.host.clone(), self.port),
                redis: RedisConnectionInfo {
                    db: self.db,
                    password: self.password.clone().filter(|p| !p.is_empty()),
                    ..Default::default()
                },
            }
        }

        pub async fn connect(&self) -> Result<RedisSink, SinkError> {
            let client = redis::Client::open(self.connection_info())?;
            let conn = client.get_multiplexed_async_connection().await?;
            tracing::info!(host = %self.host, port = self.port, db = self.db, "connected to redis");
            Ok(RedisSink { conn })
        }
    }

    /// One Redis hash per key; `replace` is `DEL` + `HSET` in a MULTI block.
    #[derive(Clone)]
    pub struct RedisSink {
        conn: MultiplexedConnection,
    }

    #[async_trait]
    impl RecordSink for RedisSink {
        async fn replace(
            &self,
            key: &str,
            fields: &BTreeMap<String, String>,
        ) -> Result<(), SinkError> {
            let mut conn = self.conn.clone();
            let items: Vec<(&str, &str)> =
                fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

            let mut pipe = redis::pipe();
            pipe.atomic().del(key).ignore();
            if !items.is_empty() {
                pipe.hset_multiple(key, items.as_slice()).ignore();
            }
            let () = pipe.query_async(&mut conn).await?;
            Ok(())
        }
    }
}

#[cfg(feature = "redis")]
pub use redis_impl::{RedisSettings, RedisSink};
