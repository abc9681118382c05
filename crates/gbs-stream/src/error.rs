use thiserror::Error;

use gbs_crypto::DigestError;
use gbs_objects::ObjectError;
use gbs_types::{ObjectKind, TypeError};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The object header is missing its separator, names an unknown kind,
    /// or has a non-numeric size.
    #[error(transparent)]
    Header(#[from] TypeError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("declared size {declared} does not match payload length {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("input ended before the object header was complete")]
    TruncatedHeader,

    #[error("expected a {expected} object, found {actual}")]
    KindMismatch {
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous call on this stage failed; it accepts no further input.
    #[error("stage is poisoned by an earlier error")]
    Poisoned,

    #[error("pipeline task failed: {0}")]
    Task(String),
}

pub type StreamResult<T> = Result<T, StreamError>;
