//! Hostname classification
//!
//! Decides what shape of host a request arrived on and whether that shape can
//! carry a tenant label. Rules are applied in a fixed order and the first match
//! wins:
//!
//! 1. Hosting-provider sandbox (`my-app.netlify.app`) - no label
//! 2. IP literal (`127.0.0.1`, `[::1]`) - no label
//! 3. Loopback (`jean.localhost`) - first label unless it is `www`
//! 4. Production domain: three or more labels, first label not `www` and not
//!    reserved (`jean.newsai.fun`); two labels is a bare root domain
//!
//! Provider and IP checks run first because both would otherwise look like
//! multi-label tenant domains. Classification is total: malformed input falls
//! through to `BareRootDomain` with no label.

use serde::Serialize;
use std::net::Ipv6Addr;

use super::policy::{RoutingPolicy, LOOPBACK_LABEL, WWW_LABEL};

/// Shape of a request hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    ProviderSandbox,
    IpLiteral,
    LoopbackWithLabel,
    MultiLabelDomain,
    BareRootDomain,
}

impl HostKind {
    /// Whether hosts of this kind can be given wildcard subdomains
    pub fn supports_wildcard(self) -> bool {
        !matches!(self, HostKind::ProviderSandbox | HostKind::IpLiteral)
    }
}

/// Result of classifying one hostname.
///
/// `candidate_label` is present exactly when `kind` is `LoopbackWithLabel` or
/// `MultiLabelDomain`; the constructors below are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostClassification {
    kind: HostKind,
    candidate_label: Option<String>,
    root_domain: String,
}

impl HostClassification {
    fn labelled(kind: HostKind, label: &str, root_domain: String) -> Self {
        debug_assert!(matches!(
            kind,
            HostKind::LoopbackWithLabel | HostKind::MultiLabelDomain
        ));
        Self {
            kind,
            candidate_label: Some(label.to_string()),
            root_domain,
        }
    }

    fn unlabelled(kind: HostKind, root_domain: impl Into<String>) -> Self {
        Self {
            kind,
            candidate_label: None,
            root_domain: root_domain.into(),
        }
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn candidate_label(&self) -> Option<&str> {
        self.candidate_label.as_deref()
    }

    /// Suffix that sibling tenant hosts are built on
    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn into_candidate_label(self) -> Option<String> {
        self.candidate_label
    }
}

/// Classify a hostname (a `host:port` value is accepted; the port is ignored).
pub fn classify(hostname: &str, policy: &RoutingPolicy) -> HostClassification {
    let host = normalize_hostname(hostname);

    if policy.is_provider_host(&host) {
        return HostClassification::unlabelled(HostKind::ProviderSandbox, host);
    }

    if is_ip_literal(&host) {
        return HostClassification::unlabelled(HostKind::IpLiteral, host);
    }

    let labels: Vec<&str> = host.split('.').collect();

    // Empty host, leading dot, or `a..b`
    if labels.iter().any(|label| label.is_empty()) {
        return HostClassification::unlabelled(HostKind::BareRootDomain, host.as_str());
    }

    if labels.contains(&LOOPBACK_LABEL) {
        return match labels.as_slice() {
            [first, rest @ ..] if !rest.is_empty() && *first == WWW_LABEL => {
                HostClassification::unlabelled(HostKind::BareRootDomain, rest.join("."))
            }
            [first, rest @ ..] if !rest.is_empty() => {
                HostClassification::labelled(HostKind::LoopbackWithLabel, first, rest.join("."))
            }
            _ => HostClassification::unlabelled(HostKind::BareRootDomain, host.as_str()),
        };
    }

    match labels.as_slice() {
        [first, rest @ ..] if rest.len() >= 2 => {
            if *first == WWW_LABEL {
                HostClassification::unlabelled(HostKind::BareRootDomain, rest.join("."))
            } else if policy.is_reserved(first) {
                HostClassification::unlabelled(HostKind::BareRootDomain, host.as_str())
            } else {
                HostClassification::labelled(HostKind::MultiLabelDomain, first, rest.join("."))
            }
        }
        _ => HostClassification::unlabelled(HostKind::BareRootDomain, host.as_str()),
    }
}

/// Whether sibling hosts of `hostname` can be reached through wildcard DNS.
/// Provider sandboxes and bare IPs never can, whatever a tenant prefers.
pub fn supports_wildcard(hostname: &str, policy: &RoutingPolicy) -> bool {
    classify(hostname, policy).kind().supports_wildcard()
}

/// Split a `Host` header value into hostname and port.
///
/// Bracketed IPv6 literals keep their brackets; an unbracketed IPv6 address is
/// returned whole since its colons are not a port separator.
pub fn split_host_port(host: &str) -> (&str, Option<&str>) {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => {
                let (literal, tail) = host.split_at(end + 1);
                (literal, tail.strip_prefix(':').filter(|p| !p.is_empty()))
            }
            None => (host, None),
        };
    }

    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            (name, (!port.is_empty()).then_some(port))
        }
        _ => (host, None),
    }
}

/// Dotted-quad shape: four non-empty runs of digits. Range is not checked, so
/// `999.1.1.1` still counts; it can never be a tenant host either way.
pub fn is_ipv4_shape(host: &str) -> bool {
    let mut parts = 0;
    for part in host.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 4
}

fn is_ip_literal(host: &str) -> bool {
    if is_ipv4_shape(host) {
        return true;
    }
    let unbracketed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    unbracketed.parse::<Ipv6Addr>().is_ok()
}

/// Lowercase, drop the port and a single trailing root dot
fn normalize_hostname(raw: &str) -> String {
    let (host, _) = split_host_port(raw.trim());
    let host = host.strip_suffix('.').unwrap_or(host);
    host.to_ascii_lowercase()
}
