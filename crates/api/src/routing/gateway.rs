//! Tenant directory access
//!
//! The record store is an external collaborator. Routing needs two things from
//! it: turn a label into a tenant, and read (or, from the settings screen,
//! write) a tenant's routing mode. Implementations:
//!
//! - `PgTenantDirectory`: direct Postgres through sqlx
//! - `SupabaseTenantDirectory`: the hosted PostgREST endpoint over HTTPS
//! - `InMemoryTenantDirectory`: fixtures for tests and local runs

use async_trait::async_trait;
use blogdesk_shared::{LookupError, RoutingModeConfig, Tenant, TenantId};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Resolves tenant labels to tenants.
///
/// `Ok(None)` means the directory answered and no tenant owns the label.
/// `Err` means the directory could not answer.
#[async_trait]
pub trait TenantLookupGateway: Send + Sync {
    async fn lookup(&self, label: &str) -> Result<Option<Tenant>, LookupError>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> Result<(), LookupError> {
        Ok(())
    }
}

/// Per-tenant routing mode storage
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Tenants without a settings record use the default mode
    async fn routing_mode(&self, tenant: TenantId) -> Result<RoutingModeConfig, LookupError>;

    async fn set_routing_mode(
        &self,
        tenant: TenantId,
        mode: RoutingModeConfig,
    ) -> Result<(), LookupError>;
}

/// Everything the service needs from the record store
pub trait TenantDirectory: TenantLookupGateway + SettingsStore {}

impl<T: TenantLookupGateway + SettingsStore> TenantDirectory for T {}

#[async_trait]
impl<T: TenantLookupGateway + ?Sized> TenantLookupGateway for Arc<T> {
    async fn lookup(&self, label: &str) -> Result<Option<Tenant>, LookupError> {
        (**self).lookup(label).await
    }

    async fn ping(&self) -> Result<(), LookupError> {
        (**self).ping().await
    }
}

/// Tenant row as stored in `blogs`
#[derive(Debug, Deserialize, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    slug: String,
    name: String,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: TenantId(row.id),
            label: row.slug,
            display_name: row.name,
        }
    }
}

// =============================================================================
// Postgres
// =============================================================================

/// Directory backed by a direct Postgres connection
#[derive(Clone)]
pub struct PgTenantDirectory {
    pool: PgPool,
}

impl PgTenantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantLookupGateway for PgTenantDirectory {
    async fn lookup(&self, label: &str) -> Result<Option<Tenant>, LookupError> {
        let row: Option<TenantRow> =
            sqlx::query_as("SELECT id, slug, name FROM blogs WHERE slug = $1")
                .bind(label)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Tenant::from))
    }

    async fn ping(&self) -> Result<(), LookupError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for PgTenantDirectory {
    async fn routing_mode(&self, tenant: TenantId) -> Result<RoutingModeConfig, LookupError> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT use_subdomains FROM blog_settings WHERE blog_id = $1")
                .bind(tenant.0)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .map(|(use_subdomains,)| RoutingModeConfig { use_subdomains })
            .unwrap_or_default())
    }

    async fn set_routing_mode(
        &self,
        tenant: TenantId,
        mode: RoutingModeConfig,
    ) -> Result<(), LookupError> {
        sqlx::query(
            r#"
            INSERT INTO blog_settings (blog_id, use_subdomains)
            VALUES ($1, $2)
            ON CONFLICT (blog_id)
            DO UPDATE SET use_subdomains = EXCLUDED.use_subdomains, updated_at = NOW()
            "#,
        )
        .bind(tenant.0)
        .bind(mode.use_subdomains)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Supabase (PostgREST)
// =============================================================================

const DEFAULT_MAX_RETRIES: usize = 2;
const DEFAULT_RETRY_BASE_MS: u64 = 50;
const RETRY_MAX_DELAY: Duration = Duration::from_secs(1);

/// Directory reached through the hosted database's REST interface
#[derive(Clone)]
pub struct SupabaseTenantDirectory {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    max_retries: usize,
    retry_base_ms: u64,
}

#[derive(Serialize, Deserialize)]
struct SettingsRow {
    blog_id: Uuid,
    use_subdomains: bool,
}

#[derive(Deserialize)]
struct ModeRow {
    use_subdomains: bool,
}

impl SupabaseTenantDirectory {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
        })
    }

    /// Override the retry schedule for transient failures
    pub fn with_retries(mut self, max_retries: usize, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_ms = u64::try_from(base_delay.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    /// Send a request built by `make`, retrying transport failures and 5xx
    /// responses with exponential backoff
    async fn send_with_retry<F>(&self, make: F) -> Result<reqwest::Response, LookupError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        use tokio_retry::strategy::{jitter, ExponentialBackoff};
        use tokio_retry::Retry;

        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(self.retry_base_ms)
            .max_delay(RETRY_MAX_DELAY)
            .take(self.max_retries)
            .map(jitter);

        let this = self;
        let make = &make;

        Retry::spawn(retry_strategy, move || async move {
            let result = send_once(this.authorized(make())).await;

            match &result {
                Ok(_) => Ok(result),
                Err(e) if e.is_transient() => {
                    tracing::debug!(error = %e, "Transient directory error - will retry");
                    Err(result)
                }
                Err(_) => Ok(result),
            }
        })
        .await
        .unwrap_or_else(|e| e)
    }
}

async fn send_once(request: reqwest::RequestBuilder) -> Result<reqwest::Response, LookupError> {
    let response = request
        .send()
        .await
        .map_err(|e| LookupError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_server_error() {
        return Err(LookupError::Transport(format!("directory returned {status}")));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LookupError::Rejected(format!("{status}: {body}")));
    }
    Ok(response)
}

#[async_trait]
impl TenantLookupGateway for SupabaseTenantDirectory {
    async fn lookup(&self, label: &str) -> Result<Option<Tenant>, LookupError> {
        let url = self.table_url("blogs");
        let slug_filter = format!("eq.{label}");

        let response = self
            .send_with_retry(|| {
                self.client.get(&url).query(&[
                    ("slug", slug_filter.as_str()),
                    ("select", "id,slug,name"),
                    ("limit", "1"),
                ])
            })
            .await?;

        let rows: Vec<TenantRow> = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(rows.into_iter().next().map(Tenant::from))
    }

    async fn ping(&self) -> Result<(), LookupError> {
        let url = self.table_url("blogs");
        self.send_with_retry(|| {
            self.client
                .get(&url)
                .query(&[("select", "id"), ("limit", "1")])
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SupabaseTenantDirectory {
    async fn routing_mode(&self, tenant: TenantId) -> Result<RoutingModeConfig, LookupError> {
        let url = self.table_url("blog_settings");
        let id_filter = format!("eq.{}", tenant.0);

        let response = self
            .send_with_retry(|| {
                self.client.get(&url).query(&[
                    ("blog_id", id_filter.as_str()),
                    ("select", "use_subdomains"),
                    ("limit", "1"),
                ])
            })
            .await?;

        let rows: Vec<ModeRow> = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| RoutingModeConfig {
                use_subdomains: row.use_subdomains,
            })
            .unwrap_or_default())
    }

    async fn set_routing_mode(
        &self,
        tenant: TenantId,
        mode: RoutingModeConfig,
    ) -> Result<(), LookupError> {
        let url = self.table_url("blog_settings");
        let body = [SettingsRow {
            blog_id: tenant.0,
            use_subdomains: mode.use_subdomains,
        }];

        self.send_with_retry(|| {
            self.client
                .post(&url)
                .query(&[("on_conflict", "blog_id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&body)
        })
        .await?;

        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Directory held in process memory
#[derive(Default)]
pub struct InMemoryTenantDirectory {
    tenants: RwLock<HashMap<String, Tenant>>,
    modes: RwLock<HashMap<TenantId, RoutingModeConfig>>,
    failure: RwLock<Option<LookupError>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        let directory = Self::new();
        for tenant in tenants {
            directory.insert(tenant);
        }
        directory
    }

    pub fn insert(&self, tenant: Tenant) {
        if let Ok(mut tenants) = self.tenants.write() {
            tenants.insert(tenant.label.clone(), tenant);
        }
    }

    /// Make every call fail as if the directory were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_with(unavailable.then(|| LookupError::Transport("directory offline".to_string())));
    }

    /// Make every call fail with `error`; `None` restores normal answers
    pub fn fail_with(&self, error: Option<LookupError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = error;
        }
    }

    fn check_available(&self) -> Result<(), LookupError> {
        match self.failure.read() {
            Ok(failure) => failure.clone().map_or(Ok(()), Err),
            Err(_) => Err(LookupError::Transport("directory lock poisoned".to_string())),
        }
    }
}

#[async_trait]
impl TenantLookupGateway for InMemoryTenantDirectory {
    async fn lookup(&self, label: &str) -> Result<Option<Tenant>, LookupError> {
        self.check_available()?;
        let tenants = self
            .tenants
            .read()
            .map_err(|_| LookupError::Transport("directory lock poisoned".to_string()))?;
        Ok(tenants.get(label).cloned())
    }

    async fn ping(&self) -> Result<(), LookupError> {
        self.check_available()
    }
}

#[async_trait]
impl SettingsStore for InMemoryTenantDirectory {
    async fn routing_mode(&self, tenant: TenantId) -> Result<RoutingModeConfig, LookupError> {
        self.check_available()?;
        let modes = self
            .modes
            .read()
            .map_err(|_| LookupError::Transport("directory lock poisoned".to_string()))?;
        Ok(modes.get(&tenant).copied().unwrap_or_default())
    }

    async fn set_routing_mode(
        &self,
        tenant: TenantId,
        mode: RoutingModeConfig,
    ) -> Result<(), LookupError> {
        self.check_available()?;
        let mut modes = self
            .modes
            .write()
            .map_err(|_| LookupError::Transport("directory lock poisoned".to_string()))?;
        modes.insert(tenant, mode);
        Ok(())
    }
}
