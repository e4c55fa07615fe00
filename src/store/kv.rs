//! Shared key-value cache with per-entry TTL.
//!
//! A string-keyed, JSON-valued store every component reads/writes
//! (`repo:{fullName}`, `cohesiveness:{fullName}`, `skipped:{id}`,
//! `escalated:{id}`, `report:daily:{date}`, `metrics:*`). A `None` TTL means
//! the entry never expires.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// Best-effort shared cache. Entries past their TTL are treated as absent on
/// read and lazily swept; nothing guarantees prompt eviction.
pub struct KvStore {
    entries: RwLock<HashMap<String, Entry>>,
    now: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl KvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock(now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            now: Box::new(now),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| (self.now)() + d);
        self.entries.write().await.insert(key.into(), Entry { value, expires_at });
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if let Some(expires_at) = entry.expires_at {
            if expires_at <= (self.now)() {
                return None;
            }
        }
        Some(entry.value.clone())
    }

    pub async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    pub async fn sweep_expired(&self) -> usize {
        let now = (self.now)();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at.is_none_or(|exp| exp > now));
        before - entries.len()
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_and_get_round_trips() {
        let store = KvStore::new();
        store.set("k", json!({"a": 1}), None).await;
        assert_eq!(store.get("k").await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = KvStore::new();
        assert_eq!(store.get("nope").await, None);
    }

    #[tokio::test]
    async fn ttl_expiry_hides_entry() {
        use std::sync::atomic::{AtomicI64, Ordering};
        use std::sync::Arc;

        let clock_secs = Arc::new(AtomicI64::new(0));
        let clock_for_store = clock_secs.clone();
        let store = KvStore::with_clock(move || {
            DateTime::from_timestamp(clock_for_store.load(Ordering::SeqCst), 0).unwrap_or_default()
        });

        store.set("k", json!(1), Some(Duration::seconds(10))).await;
        assert!(store.get("k").await.is_some());

        clock_secs.store(11, Ordering::SeqCst);
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = KvStore::new();
        store.set("k", json!(1), None).await;
        store.delete("k").await;
        assert_eq!(store.get("k").await, None);
    }
}
