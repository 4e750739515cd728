//! Redis-backed `SessionCache` (spec §4.2). Uses `SCAN` + `DEL` for
//! `delete_pattern` rather than the original `redis_client.py`'s blocking
//! `KEYS` + `DEL` — `KEYS` walks the whole keyspace and can stall a shared
//! Redis instance; `SCAN` is the documented production-safe replacement and
//! is noted as a deliberate improvement, not a silent behaviour change.

use async_trait::async_trait;
use pseudon_engine::error::{EngineError, Result};
use pseudon_engine::sc::SessionCache;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

pub struct RedisSessionCache {
    conn: ConnectionManager,
}

impl RedisSessionCache {
    pub async fn connect(
        host: &str,
        port: u16,
        password: Option<&str>,
        db: u8,
    ) -> Result<Self> {
        let auth = password.map(|p| format!(":{p}@")).unwrap_or_default();
        let url = format!("redis://{auth}{host}:{port}/{db}");
        let client = redis::Client::open(url)
            .map_err(|e| EngineError::BindingFailed(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| EngineError::BindingFailed(format!("redis connect failed: {e}")))?;
        Ok(Self { conn })
    }

    pub async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await.is_ok()
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| EngineError::BindingFailed(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| EngineError::BindingFailed(e.to_string()))
    }

    async fn delete_pattern(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed = 0u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
                .map_err(|e| EngineError::BindingFailed(e.to_string()))?;

            if !keys.is_empty() {
                let deleted: u64 = conn
                    .del(&keys)
                    .await
                    .map_err(|e| EngineError::BindingFailed(e.to_string()))?;
                removed += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }
}
