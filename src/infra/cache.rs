//! Process-local TTL cache.
//!
//! Entries expire lazily: an entry older than its TTL is treated as absent
//! and removed the next time it is read. There is no size-based eviction and
//! no background sweep. Instances live for the whole process and are never
//! persisted; they are built in `infra::setup` and injected where needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::application::ports::clock::Clock;
use crate::domain::entities::principal::Principal;

/// Subject id to resolved principal.
pub type IdentityCache = TtlCache<Principal>;

/// Subject id to computed subscription validity.
pub type SubscriptionStatusCache = TtlCache<bool>;

struct CachedEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl<V> CachedEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.inserted_at + self.ttl
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct TtlCache<V> {
    entries: DashMap<String, CachedEntry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Bumped by every `invalidate`.
    generation: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        // Read under the shard guard, drop it before a possible removal.
        let lookup = self.entries.get(key).map(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        });

        match lookup {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some(None) => {
                self.entries
                    .remove_if(key, |_, entry| entry.is_expired(self.clock.now()));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: &str, value: V, ttl: Duration) {
        self.entries
            .insert(key.to_string(), self.new_entry(value, ttl));
    }

    /// Insert with the cache's default TTL.
    pub fn insert(&self, key: &str, value: V) {
        self.put(key, value, self.default_ttl);
    }

    pub fn invalidate(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(key);
    }

    /// Read before computing a value that will be passed to `insert_if_current`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Insert unless an invalidation happened since `seen` was read.
    ///
    /// The check runs under the entry's shard lock, so an invalidation either
    /// is observed here or removes the entry afterwards.
    pub fn insert_if_current(&self, key: &str, value: V, seen: u64) -> bool {
        let entry = self.entries.entry(key.to_string());
        if self.generation() != seen {
            return false;
        }
        entry.insert(self.new_entry(value, self.default_ttl));
        true
    }

    fn new_entry(&self, value: V, ttl: Duration) -> CachedEntry<V> {
        CachedEntry {
            value,
            inserted_at: self.clock.now(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
