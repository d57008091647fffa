use thiserror::Error;

/// Everything the store can report to its caller. Nothing here is fatal:
/// corruption falls back to defaults on load (and hard-rejects on
/// import), validation and precondition failures leave state untouched,
/// and a persistence failure leaves the in-memory state valid but
/// unsaved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("corrupted data: {0}")]
    Corrupt(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0}")]
    Precondition(String),

    #[error("could not save data ({0}); changes are kept in memory but will be lost on exit")]
    Persistence(#[source] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
