//! TTL cache for upstream responses.
//!
//! Values live in process memory unless a Redis URL is configured, in which
//! case Redis is used and memory only serves as the fallback when Redis is
//! unreachable. Cache errors are logged and never surface to callers.

use crate::Result;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Entries above this count trigger a sweep of expired keys on insert
const MEMORY_SWEEP_THRESHOLD: usize = 1024;

struct CacheEntry {
    stored_at: Instant,
    ttl: Duration,
    value: Value,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

#[derive(Clone)]
pub struct CacheClient {
    memory: Arc<RwLock<HashMap<String, CacheEntry>>>,
    redis_url: Option<String>,
    async_redis_conn: Arc<Mutex<Option<MultiplexedConnection>>>,
}

/// Cache backend report for the health endpoint
#[derive(Debug, serde::Serialize)]
pub struct CacheStatus {
    pub backend: &'static str,
    pub status: String,
}

impl CacheClient {
    pub fn new(redis_url: Option<&str>) -> Self {
        Self {
            memory: Arc::new(RwLock::new(HashMap::new())),
            redis_url: redis_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(ToOwned::to_owned),
            async_redis_conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Get async Redis connection (creates one if it doesn't exist)
    async fn get_async_redis_conn(&self, redis_url: &str) -> Result<MultiplexedConnection> {
        let mut conn_guard = self.async_redis_conn.lock().await;

        if let Some(conn) = conn_guard.as_ref() {
            return Ok(conn.clone());
        }

        let client = redis::Client::open(redis_url)?;
        let multiplexed_conn = client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(multiplexed_conn.clone());
        Ok(multiplexed_conn)
    }

    /// Drops the shared connection so the next call reconnects
    async fn reset_redis_conn(&self) {
        *self.async_redis_conn.lock().await = None;
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(redis_url) = &self.redis_url {
            match self.redis_get(redis_url, key).await {
                Ok(Some(raw)) => {
                    return serde_json::from_str(&raw)
                        .map_err(|err| warn!("Discarding undecodable cache entry {}: {}", key, err))
                        .ok();
                }
                Ok(None) => return None,
                Err(err) => {
                    warn!("Redis GET failed for {}, using memory cache: {}", key, err);
                    self.reset_redis_conn().await;
                }
            }
        }

        let memory = self.memory.read().await;
        let entry = memory.get(key).filter(|entry| entry.is_fresh())?;
        debug!("Cache hit for {}", key);
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to serialize cache entry {}: {}", key, err);
                return;
            }
        };

        if let Some(redis_url) = &self.redis_url {
            match self.redis_set(redis_url, key, &value, ttl).await {
                Ok(()) => return,
                Err(err) => {
                    warn!("Redis SET failed for {}, using memory cache: {}", key, err);
                    self.reset_redis_conn().await;
                }
            }
        }

        let mut memory = self.memory.write().await;
        if memory.len() >= MEMORY_SWEEP_THRESHOLD {
            memory.retain(|_, entry| entry.is_fresh());
        }
        memory.insert(
            key.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                ttl,
                value,
            },
        );
    }

    async fn redis_get(&self, redis_url: &str, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_async_redis_conn(redis_url).await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn redis_set(&self, redis_url: &str, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let mut conn = self.get_async_redis_conn(redis_url).await?;
        let raw = serde_json::to_string(value)?;
        let _: () = conn.set_ex(key, raw, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    pub async fn status(&self) -> CacheStatus {
        match &self.redis_url {
            None => CacheStatus {
                backend: "memory",
                status: "ok".to_string(),
            },
            Some(redis_url) => match self.get_async_redis_conn(redis_url).await {
                Ok(_) => CacheStatus {
                    backend: "redis",
                    status: "connected".to_string(),
                },
                Err(err) => CacheStatus {
                    backend: "redis",
                    status: format!("error: {err}"),
                },
            },
        }
    }
}
