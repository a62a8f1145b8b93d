use thiserror::Error;

use adesto_store::StoreError;

/// Errors produced by the engines.
///
/// None of these are fatal to the application: the view keeps running on
/// whatever state it has, possibly degraded until the next reload.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An action that mutates the store was attempted without a session.
    #[error("No authenticated session")]
    Unauthenticated,

    /// A toggle was issued before the window finished loading, or after a
    /// load failed.
    #[error("Projection not loaded")]
    NotLoaded,

    /// An admin action was attempted by someone other than the creator.
    #[error("Only the space creator may do this")]
    NotCreator,

    /// The referenced space is not in the directory projection.
    #[error("Unknown space")]
    UnknownSpace,

    /// The backend refused or failed a call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
