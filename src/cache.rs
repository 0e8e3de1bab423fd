//! Process-local response cache for PSA API calls
//!
//! Entries are keyed by (connection id, endpoint, canonicalized params) and
//! carry an absolute expiry. The store is bounded: on overflow the single
//! oldest-inserted entry is evicted. This is a memory bound, not an LRU
//! guarantee, and the cache is purely additive to correctness: every caller
//! must behave identically with a cold or disabled cache.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;
use uuid::Uuid;

/// Recommended TTL tiers (seconds) by data volatility.
pub const TTL_CONFIGURATION: u64 = 300;
pub const TTL_SCHEMA: u64 = 600;
pub const TTL_LOOKUP: u64 = 120;
pub const TTL_REPORTS: u64 = 180;
pub const TTL_TICKETS: u64 = 30;
pub const TTL_REALTIME: u64 = 10;

/// Default bound on the number of live entries.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // Insertion order for coarse oldest-first eviction. Kept in lockstep
    // with `entries`: every removal path drops the queue entry too.
    insertion_order: VecDeque<String>,
}

/// TTL-based response cache shared across requests within one process.
///
/// Explicitly constructed and dependency-injected by the composition root;
/// key space is partitioned by connection id so tenants never collide.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Derive the composite cache key. Params are serialized through a
    /// `BTreeMap` so identical sets in different insertion order hash
    /// identically.
    fn cache_key(connection_id: Uuid, endpoint: &str, params: &[(String, String)]) -> String {
        let canonical: BTreeMap<&str, &str> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let params_json =
            serde_json::to_string(&canonical).unwrap_or_else(|_| "{}".to_string());
        format!("{connection_id}:{endpoint}:{params_json}")
    }

    /// Look up a cached value, evicting it on read if expired.
    pub fn get(
        &self,
        connection_id: Uuid,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Option<Value> {
        let key = Self::cache_key(connection_id, endpoint, params);
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        match inner.entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                inner.entries.remove(&key);
                inner.insertion_order.retain(|k| k != &key);
                None
            }
            None => None,
        }
    }

    /// Insert a value with the given TTL, evicting the oldest-inserted entry
    /// if the store is at capacity.
    pub fn set(
        &self,
        connection_id: Uuid,
        endpoint: &str,
        value: Value,
        ttl_seconds: u64,
        params: &[(String, String)],
    ) {
        let key = Self::cache_key(connection_id, endpoint, params);
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        };

        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if inner.entries.contains_key(&key) {
            // Overwrite in place; original insertion position is kept.
            inner.entries.insert(key, entry);
            return;
        }

        while inner.entries.len() >= self.max_entries {
            match inner.insertion_order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.insertion_order.push_back(key.clone());
        inner.entries.insert(key, entry);
    }

    /// Remove one entry.
    pub fn invalidate(&self, connection_id: Uuid, endpoint: &str, params: &[(String, String)]) {
        let key = Self::cache_key(connection_id, endpoint, params);
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.remove(&key);
        inner.insertion_order.retain(|k| k != &key);
    }

    /// Remove every entry belonging to one connection.
    pub fn invalidate_connection(&self, connection_id: Uuid) {
        let prefix = format!("{connection_id}:");
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.retain(|key, _| !key.starts_with(&prefix));
        inner
            .insertion_order
            .retain(|key| !key.starts_with(&prefix));
    }

    /// Remove every entry for a connection whose endpoint starts with the
    /// given prefix.
    pub fn invalidate_prefix(&self, connection_id: Uuid, endpoint_prefix: &str) {
        let prefix = format!("{connection_id}:{endpoint_prefix}");
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.retain(|key, _| !key.starts_with(&prefix));
        inner
            .insertion_order
            .retain(|key| !key.starts_with(&prefix));
    }

    /// Number of live (possibly expired-but-unread) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
