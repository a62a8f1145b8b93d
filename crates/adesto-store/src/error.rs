use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or refused the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A write violated a constraint (e.g. the one-signal-per-tuple rule).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
