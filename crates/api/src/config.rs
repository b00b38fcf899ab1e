//! Application configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::routing::{
    RoutingPolicy, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_PROVIDER_SUFFIXES, DEFAULT_RESERVED_LABELS,
};

/// Minimum length accepted for the admin API token
pub const MIN_ADMIN_TOKEN_LEN: usize = 32;

/// Where tenant records live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryBackend {
    /// Direct Postgres connection
    Postgres { url: String, max_connections: u32 },
    /// Hosted database reached through its REST interface
    Supabase { url: String, service_role_key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub public_protocol: String,

    // Tenant directory
    pub directory: DirectoryBackend,
    pub lookup_timeout: Duration,
    pub tenant_cache_ttl: Duration,
    pub tenant_cache_max_entries: usize,

    // Routing tables; `None` keeps the built-in defaults
    pub reserved_labels: Option<Vec<String>>,
    pub provider_suffixes: Option<Vec<String>>,

    // Settings write endpoint is disabled without a token
    pub admin_api_token: Option<String>,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_protocol: "https".to_string(),
            directory: DirectoryBackend::Postgres {
                url: "postgres://localhost/blogdesk".to_string(),
                max_connections: 10,
            },
            lookup_timeout: Duration::from_millis(5000),
            tenant_cache_ttl: Duration::from_secs(300),
            tenant_cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            reserved_labels: None,
            provider_suffixes: None,
            admin_api_token: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let public_protocol = env::var("PUBLIC_PROTOCOL")
            .map(|p| p.trim().trim_end_matches(':').to_ascii_lowercase())
            .unwrap_or(defaults.public_protocol);
        if public_protocol != "http" && public_protocol != "https" {
            return Err(ConfigError::Invalid {
                var: "PUBLIC_PROTOCOL",
                reason: format!("expected http or https, got {public_protocol:?}"),
            });
        }

        let admin_api_token = non_empty_var("ADMIN_API_TOKEN");
        if let Some(token) = &admin_api_token {
            if token.len() < MIN_ADMIN_TOKEN_LEN {
                return Err(ConfigError::WeakSecret(
                    "ADMIN_API_TOKEN must be at least 32 characters",
                ));
            }
        }

        let log_format = match non_empty_var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("expected json or pretty, got {other:?}"),
                })
            }
        };

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            public_protocol,
            directory: directory_from_env()?,
            lookup_timeout: Duration::from_millis(parse_var("LOOKUP_TIMEOUT_MS", 5000)?),
            tenant_cache_ttl: Duration::from_secs(parse_var("TENANT_CACHE_TTL_SECS", 300)?),
            tenant_cache_max_entries: parse_var(
                "TENANT_CACHE_MAX_ENTRIES",
                defaults.tenant_cache_max_entries,
            )?,
            reserved_labels: list_var("RESERVED_LABELS"),
            provider_suffixes: list_var("PROVIDER_SUFFIXES"),
            admin_api_token,
            log_format,
        })
    }

    /// Routing tables with configured overrides applied
    pub fn routing_policy(&self) -> RoutingPolicy {
        let defaults = |table: &[&str]| table.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        RoutingPolicy::new(
            self.provider_suffixes
                .clone()
                .unwrap_or_else(|| defaults(DEFAULT_PROVIDER_SUFFIXES)),
            self.reserved_labels
                .clone()
                .unwrap_or_else(|| defaults(DEFAULT_RESERVED_LABELS)),
        )
    }
}

/// Postgres wins when both backends are configured
fn directory_from_env() -> Result<DirectoryBackend, ConfigError> {
    if let Some(url) = non_empty_var("DATABASE_URL") {
        return Ok(DirectoryBackend::Postgres {
            url,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
        });
    }

    match (
        non_empty_var("SUPABASE_URL"),
        non_empty_var("SUPABASE_SERVICE_ROLE_KEY"),
    ) {
        (Some(url), Some(service_role_key)) => Ok(DirectoryBackend::Supabase {
            url,
            service_role_key,
        }),
        (Some(_), None) => Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
        (None, _) => Err(ConfigError::Missing("DATABASE_URL or SUPABASE_URL")),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: name,
            reason: format!("could not parse {raw:?}"),
        }),
    }
}

/// Comma-separated list; unset or blank means "use the defaults"
fn list_var(name: &str) -> Option<Vec<String>> {
    non_empty_var(name).map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}
