//! Error taxonomy. Leaf crates produce one of the kinds below; this crate
//! aggregates them into [`OpenMemoryError`] via `#[from]` so callers at any
//! layer can propagate with `?`.

mod config_error;
mod provider_error;
mod security_error;
mod storage_error;
mod validation_error;

pub use config_error::ConfigError;
pub use provider_error::{ProviderError, RateLimitedError};
pub use security_error::SecurityError;
pub use storage_error::{EmbeddingError, StorageError};
pub use validation_error::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenMemoryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitedError),
}

pub type OpenMemoryResult<T> = Result<T, OpenMemoryError>;
