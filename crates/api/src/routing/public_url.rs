//! Public link generation
//!
//! Produces the URL an operator shares for their blog. Two forms exist and both
//! are permanent public contracts:
//!
//! - subdomain: `https://jean.newsai.fun`
//! - query parameter: `https://newsai.fun/?blog=jean`
//!
//! Every link built here resolves back to the same label through
//! [`resolve`](super::resolver::resolve). A subdomain link that would not
//! (reserved label, single-label host, upper-case label) is replaced by the
//! query form, which always does.

use blogdesk_shared::RoutingModeConfig;
use serde::Serialize;
use url::Url;

use super::classifier::{classify, split_host_port, supports_wildcard};
use super::policy::{RoutingPolicy, BLOG_QUERY_PARAM, WWW_LABEL};

/// Origin of the page the link is generated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentOrigin {
    scheme: String,
    hostname: String,
    host: String,
}

impl CurrentOrigin {
    /// `protocol` may be given browser-style (`https:`) or bare (`https`);
    /// `host` may carry a port.
    pub fn new(protocol: &str, host: &str) -> Result<Self, PublicUrlError> {
        let scheme = protocol.trim().trim_end_matches(':').to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(PublicUrlError::InvalidOrigin(format!(
                "unsupported protocol {protocol:?}"
            )));
        }

        let host = host.trim().to_ascii_lowercase();
        let (hostname, _) = split_host_port(&host);
        if hostname.is_empty() {
            return Err(PublicUrlError::InvalidOrigin("empty host".to_string()));
        }

        Ok(Self {
            scheme,
            hostname: hostname.to_string(),
            host,
        })
    }

    pub fn from_url(url: &Url) -> Result<Self, PublicUrlError> {
        let hostname = url
            .host_str()
            .ok_or_else(|| PublicUrlError::InvalidOrigin(format!("{url} has no host")))?;
        Self::new(url.scheme(), &with_port(hostname, url.port().map(|p| p.to_string()).as_deref()))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Hostname without port
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Hostname with port, if any
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<&str> {
        split_host_port(&self.host).1
    }

    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Which link form was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlMode {
    Subdomain,
    QueryParam,
}

/// A shareable blog link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUrl {
    pub url: String,
    /// Shorter text for display: no protocol, no port
    pub display_text: String,
    pub mode: UrlMode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublicUrlError {
    #[error("Tenant label is empty")]
    EmptyLabel,

    #[error("Tenant label cannot appear in a link: {0:?}")]
    InvalidLabel(String),

    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),
}

/// Build the public link for `label`.
///
/// `supports_wildcard` describes the *current* host (see
/// [`supports_wildcard`](super::classifier::supports_wildcard)); subdomain links
/// are only produced when both it and the tenant's mode allow them.
pub fn build(
    label: &str,
    origin: &CurrentOrigin,
    mode: RoutingModeConfig,
    supports_wildcard: bool,
    policy: &RoutingPolicy,
) -> Result<PublicUrl, PublicUrlError> {
    validate_label(label)?;

    if mode.use_subdomains && supports_wildcard {
        if let Some(url) = subdomain_url(label, origin, policy) {
            return Ok(url);
        }
        tracing::debug!(
            label,
            host = %origin.host(),
            "Subdomain link would not route back to its tenant, using query link"
        );
    }

    query_url(label, origin, policy)
}

/// [`build`] with wildcard support derived from the origin itself
pub fn build_for_origin(
    label: &str,
    origin: &CurrentOrigin,
    mode: RoutingModeConfig,
    policy: &RoutingPolicy,
) -> Result<PublicUrl, PublicUrlError> {
    let wildcard = supports_wildcard(origin.hostname(), policy);
    build(label, origin, mode, wildcard, policy)
}

/// Root of the deployment the origin belongs to: where a visitor lands after
/// asking for a tenant that does not exist
pub fn home_url(origin: &CurrentOrigin, policy: &RoutingPolicy) -> String {
    let hostname = tenantless_hostname(origin.hostname(), policy);
    format!(
        "{}://{}/",
        origin.scheme(),
        with_port(&hostname, origin.port())
    )
}

fn subdomain_url(label: &str, origin: &CurrentOrigin, policy: &RoutingPolicy) -> Option<PublicUrl> {
    let current = classify(origin.hostname(), policy);
    let base = match current.candidate_label() {
        // Already on a tenant host: build a sibling, not a grandchild
        Some(_) => with_port(current.root_domain(), origin.port()),
        None => {
            let www = format!("{WWW_LABEL}.");
            origin
                .host()
                .strip_prefix(www.as_str())
                .unwrap_or(origin.host())
                .to_string()
        }
    };

    let host = format!("{label}.{base}");
    let (hostname, _) = split_host_port(&host);
    if classify(hostname, policy).candidate_label() != Some(label) {
        return None;
    }

    // URL parsing may rewrite the host (IDNA, numeric last label)
    let url = format!("{}://{}", origin.scheme(), host);
    if Url::parse(&url).ok()?.host_str() != Some(hostname) {
        return None;
    }

    Some(PublicUrl {
        url,
        display_text: hostname.to_string(),
        mode: UrlMode::Subdomain,
    })
}

fn query_url(
    label: &str,
    origin: &CurrentOrigin,
    policy: &RoutingPolicy,
) -> Result<PublicUrl, PublicUrlError> {
    // A host label would shadow the parameter, so link from a host without one
    let hostname = tenantless_hostname(origin.hostname(), policy);
    let base = format!("{}://{}/", origin.scheme(), with_port(&hostname, origin.port()));

    let mut url = Url::parse(&base).map_err(|e| PublicUrlError::InvalidOrigin(e.to_string()))?;
    url.query_pairs_mut().append_pair(BLOG_QUERY_PARAM, label);

    Ok(PublicUrl {
        url: url.to_string(),
        display_text: format!("{hostname}/?{BLOG_QUERY_PARAM}={label}"),
        mode: UrlMode::QueryParam,
    })
}

/// Strip tenant labels until the host carries none
fn tenantless_hostname(hostname: &str, policy: &RoutingPolicy) -> String {
    let mut host = hostname.to_string();
    let mut current = classify(&host, policy);
    while current.candidate_label().is_some() {
        host = current.root_domain().to_string();
        current = classify(&host, policy);
    }
    host
}

fn with_port(hostname: &str, port: Option<&str>) -> String {
    match port {
        Some(port) => format!("{hostname}:{port}"),
        None => hostname.to_string(),
    }
}

fn validate_label(label: &str) -> Result<(), PublicUrlError> {
    if label.is_empty() {
        return Err(PublicUrlError::EmptyLabel);
    }
    if label.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(PublicUrlError::InvalidLabel(label.to_string()));
    }
    Ok(())
}
