//! Host-based tenant routing
//!
//! Turns the request's host and query string into the view to render:
//! - Tenant subdomains: jean.newsai.fun
//! - Query fallback where wildcards are unavailable: my-app.netlify.app/?blog=jean
//! - Everything else: the admin application
//!
//! and builds the public link a tenant hands out, such that following the link
//! routes back to the same tenant.

mod cache;
mod classifier;
mod gateway;
mod policy;
mod public_url;
mod resolver;
mod view;

pub use cache::{
    CacheStats, CachedGateway, LookupCache, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL,
};
pub use classifier::{
    classify, is_ipv4_shape, split_host_port, supports_wildcard, HostClassification, HostKind,
};
pub use gateway::{
    InMemoryTenantDirectory, PgTenantDirectory, SettingsStore, SupabaseTenantDirectory,
    TenantDirectory, TenantLookupGateway,
};
pub use policy::{
    RoutingPolicy, BLOG_QUERY_PARAM, DEFAULT_PROVIDER_SUFFIXES, DEFAULT_RESERVED_LABELS,
    LOOPBACK_LABEL, PREVIEW_QUERY_PARAM, WWW_LABEL,
};
pub use public_url::{
    build as build_public_url, build_for_origin, home_url, CurrentOrigin, PublicUrl,
    PublicUrlError, UrlMode,
};
pub use resolver::{
    resolve, resolve_context, LabelSource, NavigationOutcome, PendingLookup, RequestContext,
    Resolution, RoutingDecision,
};
pub use view::{AdminView, UnknownView};
