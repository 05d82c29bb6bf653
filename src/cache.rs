//! Time-bounded cache for upstream source payloads.
//!
//! Entries expire `ttl` after insertion. Eviction is lazy: an expired entry
//! is removed by the read that finds it, and nothing sweeps in the
//! background. Writers to the same key overwrite each other (last write
//! wins); every write for a key carries an equally fresh payload.
//!
//! # Clock injection
//! `get_at` / `set_at` take `now` explicitly so expiry is deterministic in
//! tests. `get` / `set` are thin wrappers over `Utc::now()`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::weeks(52 * 100)),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new(std::time::Duration::from_secs(secs))
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value for `key` if it is no older than the TTL at `now`.
    ///
    /// Staleness is strictly greater than: an entry exactly `ttl` old is
    /// still served.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => now - entry.inserted_at > self.ttl,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    pub fn set_at(&self, key: impl Into<String>, value: V, now: DateTime<Utc>) {
        self.entries().insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key, value, Utc::now())
    }

    /// Like `get_at` but without cloning the value.
    pub fn contains_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries();
        let expired = match entries.get(key) {
            None => return false,
            Some(entry) => now - entry.inserted_at > self.ttl,
        };
        if expired {
            entries.remove(key);
        }
        !expired
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
