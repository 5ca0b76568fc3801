use thiserror::Error;

/// Invalid setup; fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("malformed configuration: {0}")]
    Malformed(String),

    #[error("encryption is enabled but key or salt is unset")]
    EncryptionKeyMissing,

    #[error("embedder kind 'aws' requires AWS credentials to be configured")]
    MissingAwsCredentials,

    #[error("table name '{0}' contains characters outside [A-Za-z0-9_]")]
    InvalidTableName(String),
}
