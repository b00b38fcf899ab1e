//! Shared application state

use std::sync::Arc;

use crate::config::Config;
use crate::routing::{
    CachedGateway, LookupCache, RoutingPolicy, TenantDirectory, TenantLookupGateway,
};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<RoutingPolicy>,
    /// Cached label lookups; page loads go through here
    pub gateway: Arc<dyn TenantLookupGateway>,
    /// Uncached directory for settings reads and writes
    pub directory: Arc<dyn TenantDirectory>,
    pub cache: Arc<LookupCache>,
}

impl AppState {
    pub fn new(config: Config, directory: Arc<dyn TenantDirectory>) -> Self {
        let policy = Arc::new(config.routing_policy());
        let cache = Arc::new(
            LookupCache::with_ttl(config.tenant_cache_ttl)
                .with_max_entries(config.tenant_cache_max_entries),
        );
        let gateway: Arc<dyn TenantLookupGateway> =
            Arc::new(CachedGateway::new(directory.clone(), cache.clone()));

        Self {
            config: Arc::new(config),
            policy,
            gateway,
            directory,
            cache,
        }
    }
}
