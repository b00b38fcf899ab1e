//! Common types used across Blogdesk

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Tenant (blog) ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Tenants
// =============================================================================

/// A blog as known to the tenant directory.
///
/// `label` is the routing slug: unique across the platform and never changed
/// once chosen. Routing code treats the whole record as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub label: String,
    pub display_name: String,
}

impl Tenant {
    pub fn new(label: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            label: label.into(),
            display_name: display_name.into(),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Which public link style a tenant hands out.
///
/// Stored in the tenant's settings record. `false` (the default) produces
/// `origin/?blog=label` links, `true` produces `label.root-domain` links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingModeConfig {
    pub use_subdomains: bool,
}

impl RoutingModeConfig {
    pub const fn subdomains() -> Self {
        Self {
            use_subdomains: true,
        }
    }

    pub const fn query_param() -> Self {
        Self {
            use_subdomains: false,
        }
    }
}
