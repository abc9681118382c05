use thiserror::Error;

/// Errors from digest output handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("invalid base64 digest: {0}")]
    InvalidBase64(String),

    #[error("digest is {actual} bytes, object IDs are {expected}")]
    NotAnObjectId { expected: usize, actual: usize },
}

pub type DigestResult<T> = Result<T, DigestError>;
