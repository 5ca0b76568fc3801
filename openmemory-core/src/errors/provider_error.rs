use thiserror::Error;

/// Upstream LLM/connector failure, classified as retryable or auth-fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider error (retryable): {0}")]
    Transient(String),

    #[error("provider authentication failed: {0}")]
    AuthFailed(String),
}

#[derive(Debug, Error)]
#[error("rate limited, retry after {retry_after_ms}ms")]
pub struct RateLimitedError {
    pub retry_after_ms: u64,
}
