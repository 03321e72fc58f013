//! Process-local key-value store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::traits::KeyValueStore;

/// Counters of the commands a [`MemoryStore`] has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOps {
    pub gets: u64,
    pub sets: u64,
    pub deletes: u64,
    pub set_adds: u64,
    pub set_reads: u64,
    pub expires: u64,
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Entry<T> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Tables {
    values: HashMap<String, Entry<String>>,
    sets: HashMap<String, Entry<HashSet<String>>>,
}

impl Tables {
    fn purge(&mut self, key: &str, now: Instant) {
        if self.values.get(key).is_some_and(|e| !e.is_live(now)) {
            self.values.remove(key);
        }
        if self.sets.get(key).is_some_and(|e| !e.is_live(now)) {
            self.sets.remove(key);
        }
    }
}

#[derive(Default)]
struct Counters {
    gets: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    set_adds: AtomicU64,
    set_reads: AtomicU64,
    expires: AtomicU64,
}

/// In-memory [`KeyValueStore`] with TTL support.
///
/// Expiry follows tokio's clock, so tests running with a paused runtime can
/// advance time to expire entries. The store can be switched to unavailable
/// to exercise degraded paths.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    available: AtomicBool,
    counters: Counters,
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            available: AtomicBool::new(true),
            counters: Counters::default(),
        }
    }

    /// Makes every subsequent command fail with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the command counters.
    pub fn ops(&self) -> StoreOps {
        let c = &self.counters;
        StoreOps {
            gets: c.gets.load(Ordering::Relaxed),
            sets: c.sets.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            set_adds: c.set_adds.load(Ordering::Relaxed),
            set_reads: c.set_reads.load(Ordering::Relaxed),
            expires: c.expires.load(Ordering::Relaxed),
        }
    }

    /// Returns true if a live value or set exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        let tables = self.tables.lock();
        tables.values.get(key).is_some_and(|e| e.is_live(now))
            || tables.sets.get(key).is_some_and(|e| e.is_live(now))
    }

    /// Remaining time-to-live of a key, `None` if absent or without expiry.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let tables = self.tables.lock();
        let expires_at = tables
            .values
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at)
            .or_else(|| {
                tables
                    .sets
                    .get(key)
                    .filter(|e| e.is_live(now))
                    .map(|e| e.expires_at)
            })??;
        Some(expires_at.saturating_duration_since(now))
    }

    /// Number of live keys, values and sets together.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let tables = self.tables.lock();
        tables.values.values().filter(|e| e.is_live(now)).count()
            + tables.sets.values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if no live key exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store switched off"))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let now = Instant::now();
        let mut tables = self.tables.lock();
        tables.purge(key, now);
        Ok(tables.values.get(key).map(|e| e.value.clone()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let mut tables = self.tables.lock();
        tables.sets.remove(key);
        tables.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let now = Instant::now();
        let mut tables = self.tables.lock();
        let mut removed = 0;
        for key in keys {
            tables.purge(key, now);
            let existed = tables.values.remove(key).is_some() | tables.sets.remove(key).is_some();
            if existed {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StoreError> {
        self.counters.set_adds.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let now = Instant::now();
        let mut tables = self.tables.lock();
        tables.purge(set_key, now);
        tables
            .sets
            .entry(set_key.to_string())
            .or_insert_with(|| Entry {
                value: HashSet::new(),
                expires_at: None,
            })
            .value
            .insert(member.to_string());
        Ok(())
    }

    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StoreError> {
        self.counters.set_reads.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let now = Instant::now();
        let mut tables = self.tables.lock();
        tables.purge(set_key, now);
        let mut members: Vec<String> = tables
            .sets
            .get(set_key)
            .map(|e| e.value.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        self.counters.expires.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let now = Instant::now();
        let expires_at = Some(now + Duration::from_secs(seconds));
        let mut tables = self.tables.lock();
        tables.purge(key, now);
        if let Some(entry) = tables.values.get_mut(key) {
            entry.expires_at = expires_at;
        }
        if let Some(entry) = tables.sets.get_mut(key) {
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
