use thiserror::Error;

/// Bad input; surfaced with 400-equivalent status.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("content must not be empty")]
    EmptyContent,

    #[error("content of {size} bytes exceeds max payload size {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("vector dimension {got} does not match expected {expected}")]
    DimMismatch { expected: usize, got: usize },

    #[error("vector dimension {0} is outside the allowed range")]
    DimOutOfRange(usize),

    #[error("malformed date: {0}")]
    MalformedDate(String),

    #[error("self-edges are not allowed (src == dst == {0})")]
    SelfEdge(String),

    #[error("invalid field: {0}")]
    InvalidField(String),
}
