//! Foundation types for Git Blob Streams (GBS).
//!
//! This crate provides the small set of types every other GBS crate shares:
//! the four object kinds, the 20-byte object identifier, and the codec for the
//! `"<kind> <size>\0"` header that frames every stored object.
//!
//! # Key Types
//!
//! - [`ObjectKind`]: `blob`, `tree`, `commit`, or `tag`
//! - [`ObjectId`]: 20-byte object identifier, rendered as 40 hex characters
//! - [`ObjectHeader`]: parsed `{kind, size}` header record
//!
//! # Header Codec
//!
//! - [`build_header`] / [`build_header_named`] produce the header bytes
//! - [`split_header`] finds the NUL terminator and parses the header text,
//!   returning `Ok(None)` when more input is needed

pub mod error;
pub mod header;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use header::{build_header, build_header_named, split_header, ObjectHeader, MAX_HEADER_LEN};
pub use kind::ObjectKind;
pub use object::{ObjectId, OBJECT_ID_LEN};
