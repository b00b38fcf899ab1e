//! Blogdesk API Library
//!
//! Tenant routing for the blog platform: decides from the request host whether
//! a page belongs to a tenant blog or to the admin app, and builds the public
//! links tenants share.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod routing;
pub mod security;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use routing::{RoutingPolicy, TenantDirectory, TenantLookupGateway};
pub use state::AppState;
