//! Session Cache (spec §4.2) — forward and reverse bindings with TTL, plus
//! key-pattern deletion for session teardown. `pseudon-engine` only depends
//! on the trait; `pseudon-service` supplies a Redis-backed implementation.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    /// Remove every key beginning with `prefix`. Returns the count removed.
    async fn delete_pattern(&self, prefix: &str) -> Result<u64>;
}

/// Canonical key shapes (spec §4.2).
pub fn forward_key(session_id: &str, entity_type_prefix: &str, real_value_key: &str) -> String {
    format!("{session_id}:forward:{entity_type_prefix}:{real_value_key}")
}

pub fn reverse_key(session_id: &str, token: &str) -> String {
    format!("{session_id}:reverse:{token}")
}

/// Reference `SessionCache` for tests and a dependency-free dev mode.
/// Expired entries are swept lazily on access, mirroring the Redis
/// server-side TTL behaviour this stands in for.
#[derive(Default)]
pub struct InMemorySessionCache {
    store: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut store = self.store.lock().await;
        match store.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                store.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut store = self.store.lock().await;
        store.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete_pattern(&self, prefix: &str) -> Result<u64> {
        let mut store = self.store.lock().await;
        let keys: Vec<String> = store
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for k in &keys {
            store.remove(k);
        }
        Ok(keys.len() as u64)
    }
}
