//! Routing policy tables
//!
//! The deployment-specific data the classifier consults: which hosting
//! platforms hand out sandbox domains, and which first labels belong to the
//! admin application rather than to a tenant.

use std::collections::HashSet;

/// Hosting platforms whose preview domains put the *application's* name in the
/// first label (`my-app.netlify.app`). A first label there is never a tenant.
pub const DEFAULT_PROVIDER_SUFFIXES: &[&str] = &[
    "netlify.app",
    "vercel.app",
    "pages.dev",
    "onrender.com",
    "fly.dev",
    "herokuapp.com",
    "github.io",
];

/// Subdomains conventionally used by the platform itself
pub const DEFAULT_RESERVED_LABELS: &[&str] = &[
    "app",
    "admin",
    "dashboard",
    "api",
    "mail",
    "console",
    "portal",
    "docs",
    "help",
    "support",
    "status",
    "cdn",
    "static",
    "assets",
    "media",
];

/// Alias label for the bare root domain; never a tenant
pub const WWW_LABEL: &str = "www";

/// Loopback host used in local development (`jean.localhost:5173`)
pub const LOOPBACK_LABEL: &str = "localhost";

/// Query parameter carrying the tenant label when subdomains are unavailable
pub const BLOG_QUERY_PARAM: &str = "blog";

/// Query parameter carrying the tenant an operator wants to preview from the admin host
pub const PREVIEW_QUERY_PARAM: &str = "preview";

/// Provider suffixes and reserved labels, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    provider_suffixes: Vec<String>,
    reserved_labels: HashSet<String>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROVIDER_SUFFIXES.iter().copied(),
            DEFAULT_RESERVED_LABELS.iter().copied(),
        )
    }
}

impl RoutingPolicy {
    pub fn new<P, R>(provider_suffixes: P, reserved_labels: R) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let provider_suffixes = provider_suffixes
            .into_iter()
            .filter_map(|s| normalize_entry(s.as_ref()))
            .collect();
        let reserved_labels = reserved_labels
            .into_iter()
            .filter_map(|s| normalize_entry(s.as_ref()))
            .collect();

        Self {
            provider_suffixes,
            reserved_labels,
        }
    }

    /// Same provider suffixes, different reserved set
    pub fn with_reserved_labels<R>(self, reserved_labels: R) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self::new(self.provider_suffixes, reserved_labels)
    }

    /// Matches anywhere in the host, so `preview-3--my-app.netlify.app` and
    /// `my-app.netlify.app.` are both caught.
    pub fn is_provider_host(&self, hostname: &str) -> bool {
        self.provider_suffixes
            .iter()
            .any(|suffix| hostname.contains(suffix.as_str()))
    }

    pub fn is_reserved(&self, label: &str) -> bool {
        self.reserved_labels.contains(label)
    }

    pub fn provider_suffixes(&self) -> &[String] {
        &self.provider_suffixes
    }

    pub fn reserved_labels(&self) -> impl Iterator<Item = &str> {
        self.reserved_labels.iter().map(String::as_str)
    }
}

fn normalize_entry(raw: &str) -> Option<String> {
    let entry = raw.trim().trim_matches('.').to_ascii_lowercase();
    (!entry.is_empty()).then_some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RoutingPolicy::default();
        assert!(policy.is_reserved("admin"));
        assert!(policy.is_reserved("api"));
        assert!(!policy.is_reserved("jean"));
        assert!(policy.is_provider_host("my-app.netlify.app"));
        assert!(policy.is_provider_host("my-app-git-main.vercel.app"));
        assert!(!policy.is_provider_host("newsai.fun"));
    }

    #[test]
    fn test_entries_are_normalized() {
        let policy = RoutingPolicy::new([" .Example.Host ", ""], ["  Admin", "", "BLOG"]);
        assert_eq!(policy.provider_suffixes(), &["example.host".to_string()]);
        assert!(policy.is_reserved("admin"));
        assert!(policy.is_reserved("blog"));
        assert_eq!(policy.reserved_labels().count(), 2);
    }

    #[test]
    fn test_with_reserved_labels_keeps_providers() {
        let policy = RoutingPolicy::default().with_reserved_labels(["studio"]);
        assert!(policy.is_reserved("studio"));
        assert!(!policy.is_reserved("admin"));
        assert!(policy.is_provider_host("x.pages.dev"));
    }
}
