//! Per-session schedule cache, fetch locks and the backend circuit breaker.
//!
//! Every bearer token gets its own cache entry and fetch lock, so both maps
//! are swept periodically; tokens are arbitrary client input.

use super::types::WeeklySchedule;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Cache key derived from a session's bearer token.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey(String);

impl SessionKey {
    /// Hashes the token so raw credentials never sit in the cache or the logs.
    pub fn from_token(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        Self(digest[..16].iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

struct CachedSchedules {
    schedules: Arc<Vec<WeeklySchedule>>,
    fetched_at: Instant,
}

/// Schedule lists per session, valid for a fixed TTL after the fetch.
pub struct ScheduleCache {
    entries: DashMap<SessionKey, CachedSchedules>,
    ttl: Duration,
}

impl ScheduleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_fresh(&self, entry: &CachedSchedules) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }

    /// Gets the cached schedules if present and not expired.
    pub fn get(&self, key: &SessionKey) -> Option<Arc<Vec<WeeklySchedule>>> {
        let entry = self.entries.get(key)?;
        if self.is_fresh(&entry) {
            return Some(entry.schedules.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: SessionKey, schedules: Arc<Vec<WeeklySchedule>>) {
        self.entries.insert(
            key,
            CachedSchedules {
                schedules,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &SessionKey) {
        self.entries.remove(key);
    }

    /// Removes expired entries and returns how many were dropped.
    fn remove_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }
}

/// Snapshot reported by `GET /cache/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    pub session_locks: usize,
    pub breaker_failures: u32,
    pub breaker_open: bool,
}

/// Stops calling the backend after repeated failures until it has had time to recover.
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    last_failure: Mutex<Option<Instant>>,
    threshold: u32,
    recovery_time: Duration,
}

impl CircuitBreaker {
    /// - `threshold`: Number of failures before the breaker opens
    /// - `recovery_time`: How long to wait before allowing requests again
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            threshold,
            recovery_time,
        }
    }

    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }

        let recovered = match self.last_failure.lock() {
            Ok(guard) => guard.map_or(false, |last| last.elapsed() > self.recovery_time),
            Err(_) => false,
        };
        if recovered {
            self.reset();
        }
        !recovered
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_failure.lock() {
            *guard = Some(Instant::now());
        }
    }

    fn reset(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_failure.lock() {
            *guard = None;
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }
}

type SessionLock = Arc<tokio::sync::Mutex<()>>;

/// Cache, breaker and per-session fetch locks shared by the backend client.
pub struct ScheduleCacheState {
    pub cache: ScheduleCache,
    pub circuit_breaker: CircuitBreaker,
    session_locks: DashMap<SessionKey, SessionLock>,
}

impl ScheduleCacheState {
    pub fn new(ttl: Duration, breaker: CircuitBreaker) -> Self {
        Self {
            cache: ScheduleCache::new(ttl),
            circuit_breaker: breaker,
            session_locks: DashMap::new(),
        }
    }

    /// Gets or creates the fetch lock for a session.
    ///
    /// Hand the lock back through `release_session_lock` once the fetch is done.
    pub fn acquire_session_lock(&self, key: &SessionKey) -> SessionLock {
        self.session_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the map's lock entry when the caller holds the last outside clone.
    ///
    /// `remove_if` runs under the shard lock that `acquire_session_lock` also
    /// needs, so no new waiter can pick the entry up during the check.
    pub fn release_session_lock(&self, key: &SessionKey, lock: SessionLock) {
        self.session_locks
            .remove_if(key, |_, held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) <= 2);
    }

    /// Prunes expired cache entries and locks nobody is waiting on.
    pub fn sweep(&self) {
        let expired = self.cache.remove_expired();
        let locks_before = self.session_locks.len();
        self.session_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let idle_locks = locks_before.saturating_sub(self.session_locks.len());

        if expired > 0 || idle_locks > 0 {
            debug!(expired, idle_locks, "Swept schedule cache");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.cache.entries.len();
        let expired = self
            .cache
            .entries
            .iter()
            .filter(|entry| !self.cache.is_fresh(entry.value()))
            .count();

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total.saturating_sub(expired),
            session_locks: self.session_locks.len(),
            breaker_failures: self.circuit_breaker.failure_count(),
            breaker_open: self.circuit_breaker.is_open(),
        }
    }
}

/// Runs `sweep` every `interval` on the current tokio runtime.
pub fn spawn_sweeper(state: Arc<ScheduleCacheState>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            state.sweep();
        }
    })
}
