//! Blogdesk Shared Types and Utilities
//!
//! This crate contains the tenant types, directory errors, and database helpers
//! shared across the Blogdesk platform.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
