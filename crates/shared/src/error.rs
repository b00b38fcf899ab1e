//! Error types for Blogdesk

use thiserror::Error;

/// Failure to reach or read the tenant directory.
///
/// A missing tenant is not an error: lookups report it as `Ok(None)`.
/// Every variant here means "we could not find out", never "it does not exist".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Tenant directory unreachable: {0}")]
    Transport(String),

    #[error("Tenant directory rejected the request: {0}")]
    Rejected(String),

    #[error("Malformed tenant directory response: {0}")]
    Decode(String),
}

impl LookupError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}

impl From<sqlx::Error> for LookupError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => LookupError::Decode(err.to_string()),
            sqlx::Error::Database(db_err) => LookupError::Rejected(db_err.to_string()),
            _ => LookupError::Transport(err.to_string()),
        }
    }
}
