//! In-memory tenant lookup cache with TTL
//!
//! Caches label-to-tenant answers so repeated page loads on the same tenant do
//! not hit the directory. Only answers are cached: a directory that could not
//! be reached leaves the cache untouched.

use async_trait::async_trait;
use blogdesk_shared::{LookupError, Tenant};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::gateway::TenantLookupGateway;

/// Default cache TTL (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default bound on cached labels
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

#[derive(Clone)]
struct CachedAnswer {
    tenant: Option<Tenant>,
    expires_at: Instant,
}

impl CachedAnswer {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe label -> tenant cache
pub struct LookupCache {
    /// `None` records that the directory has no tenant for the label
    entries: RwLock<HashMap<String, CachedAnswer>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }
}

impl LookupCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Returns `Some(Some(_))` for a cached tenant, `Some(None)` for a cached
    /// miss, and `None` when nothing fresh is cached.
    pub fn get(&self, label: &str) -> Option<Option<Tenant>> {
        let entries = self.entries.read().ok()?;
        let answer = entries.get(label)?;

        (!answer.is_expired()).then(|| answer.tenant.clone())
    }

    /// Cache an answer. When the cache is full, expired entries are dropped
    /// first; if it is still full a miss is not cached, and a found tenant
    /// displaces the cached misses.
    pub fn insert(&self, label: &str, tenant: Option<Tenant>) {
        if self.ttl.is_zero() || self.max_entries == 0 {
            return;
        }
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.max_entries && !entries.contains_key(label) {
            entries.retain(|_, answer| !answer.is_expired());

            if entries.len() >= self.max_entries {
                if tenant.is_none() {
                    tracing::debug!(label, "Tenant cache full, not caching miss");
                    return;
                }
                entries.retain(|_, answer| answer.tenant.is_some());
                if entries.len() >= self.max_entries {
                    tracing::debug!(label, "Tenant cache full of tenants");
                    return;
                }
            }
        }

        entries.insert(
            label.to_string(),
            CachedAnswer {
                tenant,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Remove expired entries; run periodically
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, answer| !answer.is_expired());
        }
    }

    pub fn stats(&self) -> CacheStats {
        let Ok(entries) = self.entries.read() else {
            return CacheStats::default();
        };

        let mut stats = CacheStats {
            total_entries: entries.len(),
            ..CacheStats::default()
        };
        for answer in entries.values() {
            if answer.is_expired() {
                stats.expired_entries += 1;
            } else if answer.tenant.is_none() {
                stats.negative_entries += 1;
            }
        }
        stats.active_entries = stats.total_entries - stats.expired_entries;
        stats
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    /// Fresh entries recording "no such tenant"
    pub negative_entries: usize,
}

/// A gateway that consults a `LookupCache` before the wrapped gateway
pub struct CachedGateway<G> {
    inner: G,
    cache: std::sync::Arc<LookupCache>,
}

impl<G> CachedGateway<G> {
    pub fn new(inner: G, cache: std::sync::Arc<LookupCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }
}

#[async_trait]
impl<G: TenantLookupGateway> TenantLookupGateway for CachedGateway<G> {
    async fn lookup(&self, label: &str) -> Result<Option<Tenant>, LookupError> {
        if let Some(answer) = self.cache.get(label) {
            tracing::trace!(label, hit = answer.is_some(), "Tenant cache hit");
            return Ok(answer);
        }

        let answer = self.inner.lookup(label).await?;
        self.cache.insert(label, answer.clone());
        Ok(answer)
    }

    async fn ping(&self) -> Result<(), LookupError> {
        self.inner.ping().await
    }
}
