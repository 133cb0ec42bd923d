//! Error types for grid-core.

use thiserror::Error;

/// Recoverable failures of the live binding layer.
///
/// Invariant violations (index drift, double activation) panic instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("list is locked by {holder}; {requester} cannot open it")]
    ListLocked { holder: String, requester: String },

    #[error("record source {0} is already open")]
    AlreadyOpen(String),

    #[error("record source {0} is not open")]
    NotOpen(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
