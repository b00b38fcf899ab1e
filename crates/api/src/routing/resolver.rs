//! Tenant resolution
//!
//! Combines the host classification with the query-string fallbacks into a
//! single routing decision. A tenant label from the hostname always wins; the
//! `blog` parameter is only consulted when the host carries no label, which
//! keeps `?blog=slug` links working on custom domains without wildcard DNS
//! and after an operator switches to subdomain links.
//!
//! Resolution never performs I/O. When a label is found the caller looks it up
//! through a `TenantLookupGateway` and hands the result to
//! [`PendingLookup::settle`].

use blogdesk_shared::{LookupError, Tenant};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use url::{form_urlencoded, Url};

use super::classifier::classify;
use super::policy::{RoutingPolicy, BLOG_QUERY_PARAM, PREVIEW_QUERY_PARAM};

/// What the page shell should render for one navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// No tenant requested: the admin application (authentication is the
    /// shell's concern)
    AdminApp,
    PublicTenant { label: String },
    /// An operator previewing a blog from the admin host; the shell offers a
    /// way back to the dashboard
    PreviewTenant { label: String },
    /// A label was requested but no tenant owns it
    TenantNotFound { label: String, hostname: String },
}

/// Where a tenant label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Subdomain,
    QueryParam,
    Preview,
}

/// The parts of a request URL that routing looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Raw hostname as received, port allowed
    pub hostname: String,
    pub blog: Option<String>,
    pub preview: Option<String>,
}

impl RequestContext {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            blog: None,
            preview: None,
        }
    }

    pub fn with_blog(mut self, label: Option<impl Into<String>>) -> Self {
        let label: Option<String> = label.map(Into::into);
        self.blog = label.filter(|l| !l.is_empty());
        self
    }

    pub fn with_preview(mut self, label: Option<impl Into<String>>) -> Self {
        let label: Option<String> = label.map(Into::into);
        self.preview = label.filter(|l| !l.is_empty());
        self
    }

    /// Build from a full URL. The first occurrence of each parameter is used.
    pub fn from_url(url: &Url) -> Self {
        Self::new(url.host_str().unwrap_or_default()).with_query_pairs(url.query_pairs())
    }

    /// Build from a `Host` header value and the raw (still encoded) query string
    pub fn from_request(host_header: &str, raw_query: Option<&str>) -> Self {
        let pairs = form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes());
        Self::new(host_header.trim()).with_query_pairs(pairs)
    }

    /// Build from a `Host` header value and decoded query parameters
    pub fn from_parts(host_header: &str, query: &HashMap<String, String>) -> Self {
        Self::new(host_header.trim())
            .with_blog(query.get(BLOG_QUERY_PARAM).cloned())
            .with_preview(query.get(PREVIEW_QUERY_PARAM).cloned())
    }

    fn with_query_pairs<'a>(self, pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut blog = None;
        let mut preview = None;
        for (key, value) in pairs {
            if key == BLOG_QUERY_PARAM && blog.is_none() {
                blog = Some(value.into_owned());
            } else if key == PREVIEW_QUERY_PARAM && preview.is_none() {
                preview = Some(value.into_owned());
            }
        }
        self.with_blog(blog).with_preview(preview)
    }
}

/// A label that still has to be looked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingLookup {
    label: String,
    source: LabelSource,
    hostname: String,
}

/// Output of [`resolve`]: a final decision, or a label to look up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Decided { decision: RoutingDecision },
    NeedsLookup { lookup: PendingLookup },
}

impl Resolution {
    /// The tenant label this navigation asks for, if any
    pub fn label(&self) -> Option<&str> {
        match self {
            Resolution::Decided { .. } => None,
            Resolution::NeedsLookup { lookup } => Some(lookup.label()),
        }
    }
}

/// Final result of a navigation once the lookup (if any) has completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// `tenant` is present for `PublicTenant` and `PreviewTenant`
    Routed {
        decision: RoutingDecision,
        tenant: Option<Tenant>,
    },
    /// The directory could not be asked. Retrying may succeed; this says
    /// nothing about whether the tenant exists.
    LookupUnavailable {
        label: String,
        hostname: String,
        error: LookupError,
    },
}

impl NavigationOutcome {
    pub fn decision(&self) -> Option<&RoutingDecision> {
        match self {
            NavigationOutcome::Routed { decision, .. } => Some(decision),
            NavigationOutcome::LookupUnavailable { .. } => None,
        }
    }

    /// Only a directory that could not be reached is worth asking again
    pub fn is_retryable(&self) -> bool {
        matches!(self, NavigationOutcome::LookupUnavailable { error, .. } if error.is_transient())
    }
}

impl PendingLookup {
    pub fn new(label: impl Into<String>, source: LabelSource, hostname: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source,
            hostname: hostname.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> LabelSource {
        self.source
    }

    /// Raw hostname the request arrived on
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Turn the directory's answer into the navigation outcome
    pub fn settle(self, result: Result<Option<Tenant>, LookupError>) -> NavigationOutcome {
        match result {
            Ok(Some(tenant)) => {
                let decision = match self.source {
                    LabelSource::Preview => RoutingDecision::PreviewTenant { label: self.label },
                    LabelSource::Subdomain | LabelSource::QueryParam => {
                        RoutingDecision::PublicTenant { label: self.label }
                    }
                };
                NavigationOutcome::Routed {
                    decision,
                    tenant: Some(tenant),
                }
            }
            Ok(None) => NavigationOutcome::Routed {
                decision: RoutingDecision::TenantNotFound {
                    label: self.label,
                    hostname: self.hostname,
                },
                tenant: None,
            },
            Err(error) => NavigationOutcome::LookupUnavailable {
                label: self.label,
                hostname: self.hostname,
                error,
            },
        }
    }
}

/// Resolve a hostname plus the optional `blog` parameter
pub fn resolve(hostname: &str, query_param: Option<&str>, policy: &RoutingPolicy) -> Resolution {
    resolve_context(&RequestContext::new(hostname).with_blog(query_param), policy)
}

/// Resolve a full request context.
///
/// Precedence: host label, then `blog`, then `preview`, then the admin app.
pub fn resolve_context(ctx: &RequestContext, policy: &RoutingPolicy) -> Resolution {
    let pending = |label: &str, source| Resolution::NeedsLookup {
        lookup: PendingLookup::new(label, source, ctx.hostname.as_str()),
    };

    let classification = classify(&ctx.hostname, policy);
    if let Some(label) = classification.candidate_label() {
        return pending(label, LabelSource::Subdomain);
    }

    if let Some(label) = ctx.blog.as_deref() {
        return pending(label, LabelSource::QueryParam);
    }

    if let Some(label) = ctx.preview.as_deref() {
        return pending(label, LabelSource::Preview);
    }

    Resolution::Decided {
        decision: RoutingDecision::AdminApp,
    }
}
