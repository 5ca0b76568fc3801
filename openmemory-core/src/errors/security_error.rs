use thiserror::Error;

/// Decryption failure or key verification mismatch. Never recovered,
/// always propagated.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("malformed encryption envelope: {0}")]
    MalformedEnvelope(String),

    #[error("decryption failed: ciphertext could not be authenticated")]
    DecryptionFailed,

    #[error("unknown encryption key version {0}")]
    UnknownKeyVersion(u32),
}
