//! Active contract cache
//!
//! Memoizes the contract version resolved for a tenant at "now", so repeated
//! contract inspection does not hit the repository. Bounded by tenant count
//! with least-recently-used eviction.
//!
//! Entries never expire on their own. A renewal is not observed through this
//! path until the tenant is evicted, invalidated, or the process restarts.

use crate::contracts::{resolve, TripRepository};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleetbill_common::{BillingError, Result, RuleDocument};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Source of "now" for contract resolution
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug)]
struct CachedContract {
    document: Arc<RuleDocument>,
    last_access: AtomicU64,
    resolved_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Number of cached tenants
    pub entry_count: u64,
    pub capacity: u64,
}

/// Bounded LRU cache of resolved contract versions keyed by tenant
pub struct ContractCache<C: Clock = SystemClock> {
    entries: DashMap<String, CachedContract>,
    capacity: usize,
    clock: C,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ContractCache<SystemClock> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<C: Clock> ContractCache<C> {
    /// Create a cache resolving "now" from `clock`
    pub fn with_clock(capacity: usize, clock: C) -> Result<Self> {
        if capacity == 0 {
            return Err(BillingError::Config(
                "contract cache capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            entries: DashMap::with_capacity(capacity),
            capacity,
            clock,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Cached contract for a tenant, resolving and storing it on a miss.
    ///
    /// Concurrent misses for the same tenant may both resolve; the result
    /// is identical so the last writer wins harmlessly. Resolution errors
    /// are not cached.
    #[instrument(skip(self, repository))]
    pub async fn get_or_resolve(
        &self,
        client_id: &str,
        repository: &dyn TripRepository,
    ) -> Result<Arc<RuleDocument>> {
        if let Some(document) = self.get(client_id) {
            return Ok(document);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(client_id, "Contract cache miss");

        let candidates = repository
            .fetch_candidate_rule_documents(client_id, None)
            .await?;
        let now = self.clock.now();
        let document = Arc::new(resolve(client_id, &candidates, now)?.clone());

        self.insert(client_id, document.clone(), now);
        Ok(document)
    }

    /// Cached contract without any I/O
    pub fn get(&self, client_id: &str) -> Option<Arc<RuleDocument>> {
        let entry = self.entries.get(client_id)?;
        entry.last_access.store(self.next_tick(), Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(
            client_id,
            version = entry.document.version_number,
            resolved_at = %entry.resolved_at,
            "Contract cache hit"
        );
        Some(entry.document.clone())
    }

    fn insert(&self, client_id: &str, document: Arc<RuleDocument>, resolved_at: DateTime<Utc>) {
        self.entries.insert(
            client_id.to_string(),
            CachedContract {
                document,
                last_access: AtomicU64::new(self.next_tick()),
                resolved_at,
            },
        );

        while self.entries.len() > self.capacity {
            if !self.evict_lru(client_id) {
                break;
            }
        }
    }

    /// Evict the least recently used tenant other than `keep`
    fn evict_lru(&self, keep: &str) -> bool {
        let victim = self
            .entries
            .iter()
            .filter(|entry| entry.key() != keep)
            .min_by_key(|entry| entry.value().last_access.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());

        match victim {
            Some(key) => {
                if self.entries.remove(&key).is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(client_id = %key, "Evicted contract from cache");
                }
                true
            }
            None => false,
        }
    }

    /// Drop a tenant's cached contract, e.g. after a renewal
    pub fn invalidate(&self, client_id: &str) -> bool {
        let removed = self.entries.remove(client_id).is_some();
        debug!(client_id, removed, "Invalidated cached contract");
        removed
    }

    /// Drop all cached contracts
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.entries.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            capacity: self.capacity as u64,
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }
}
