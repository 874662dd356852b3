use thiserror::Error;

/// Shared error type used across all Tranche crates.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Other(#[from] eyre::Error),
}
