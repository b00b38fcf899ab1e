//! Admin application views

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Screens of the admin application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminView {
    #[default]
    Dashboard,
    Posts,
    CreatePost,
    Pages,
    Comments,
    Layout,
    Settings,
    Profile,
}

impl AdminView {
    pub const ALL: [AdminView; 8] = [
        AdminView::Dashboard,
        AdminView::Posts,
        AdminView::CreatePost,
        AdminView::Pages,
        AdminView::Comments,
        AdminView::Layout,
        AdminView::Settings,
        AdminView::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminView::Dashboard => "dashboard",
            AdminView::Posts => "posts",
            AdminView::CreatePost => "create-post",
            AdminView::Pages => "pages",
            AdminView::Comments => "comments",
            AdminView::Layout => "layout",
            AdminView::Settings => "settings",
            AdminView::Profile => "profile",
        }
    }

    /// View for a request path; the first path segment names the view.
    /// Anything unrecognised lands on the dashboard.
    pub fn from_path(path: &str) -> Self {
        path.trim_start_matches('/')
            .split('/')
            .next()
            .and_then(|segment| segment.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for AdminView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminView {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminView::ALL
            .into_iter()
            .find(|view| view.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown admin view: {0}")]
pub struct UnknownView(pub String);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(AdminView::from_path("/"), AdminView::Dashboard);
        assert_eq!(AdminView::from_path(""), AdminView::Dashboard);
        assert_eq!(AdminView::from_path("/posts"), AdminView::Posts);
        assert_eq!(AdminView::from_path("/create-post/draft"), AdminView::CreatePost);
        assert_eq!(AdminView::from_path("/Settings"), AdminView::Settings);
        assert_eq!(AdminView::from_path("/billing"), AdminView::Dashboard);
    }

    #[test]
    fn test_str_round_trip() {
        for view in AdminView::ALL {
            assert_eq!(view.as_str().parse::<AdminView>(), Ok(view));
        }
        assert!("nope".parse::<AdminView>().is_err());
    }

    #[test]
    fn test_serde_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AdminView::CreatePost).unwrap(),
            r#""create-post""#
        );
    }
}
