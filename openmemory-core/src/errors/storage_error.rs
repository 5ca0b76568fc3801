use thiserror::Error;

/// I/O or transaction failure; retried up to `max_retries` with backoff on
/// idempotent operations, otherwise propagated.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Backend(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("migration {version} ({name}) failed: {cause}")]
    Migration {
        version: u32,
        name: String,
        cause: String,
    },

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Embedding provider failure; recoverable — the memory is stored without
/// vectors and a background job re-embeds it later.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {0}")]
    ProviderFailed(String),

    #[error("embedder returned an empty vector for sector {0:?}")]
    EmptyVector(String),

    #[error("embedder request timed out")]
    Timeout,
}
