//! Blogdesk API server

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blogdesk_api::config::{DirectoryBackend, LogFormat};
use blogdesk_api::routing::{PgTenantDirectory, SupabaseTenantDirectory, TenantDirectory};
use blogdesk_api::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    let directory = connect_directory(&config).await?;
    let state = AppState::new(config.clone(), directory);

    // Expired cache entries are only dropped on read otherwise
    let cache = state.cache.clone();
    let cleanup_every = config.tenant_cache_ttl.max(std::time::Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;
            cache.cleanup();
            tracing::trace!(stats = ?cache.stats(), "Tenant cache cleanup");
        }
    });

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!(address = %config.bind_address, "Blogdesk API listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blogdesk_api=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn connect_directory(config: &Config) -> anyhow::Result<Arc<dyn TenantDirectory>> {
    match &config.directory {
        DirectoryBackend::Postgres {
            url,
            max_connections,
        } => {
            let pool = blogdesk_shared::db::create_pool(url, *max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            tracing::info!("Tenant directory: Postgres");
            Ok(Arc::new(PgTenantDirectory::new(pool)))
        }
        DirectoryBackend::Supabase {
            url,
            service_role_key,
        } => {
            let directory =
                SupabaseTenantDirectory::new(url.as_str(), service_role_key.as_str(), config.lookup_timeout)
                    .context("Failed to build Supabase client")?;
            tracing::info!(url = %url, "Tenant directory: Supabase REST");
            Ok(Arc::new(directory))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
