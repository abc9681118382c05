//! Digest accumulation for Git Blob Streams.
//!
//! Wraps established hash implementations (`sha1`, `sha2`, `blake3`) behind a
//! single incremental accumulator, [`DigestSink`]. The sink is fed the exact
//! logical byte sequence of an object, header first and payload second, and
//! is consumed when finalized so that nothing can be hashed afterwards.
//!
//! No custom cryptography lives here.

pub mod digest;
pub mod error;

pub use digest::{hash_object, DigestAlgorithm, DigestSink, HashFormat, HashOutput};
pub use error::{DigestError, DigestResult};
