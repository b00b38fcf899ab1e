//! Authentication for operator endpoints

mod admin_token;

pub use admin_token::{verify_admin_token, RequireAdminToken, ADMIN_TOKEN_HEADER};
