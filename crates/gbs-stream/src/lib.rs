//! Streaming object pipelines for Git Blob Streams.
//!
//! An object on the wire is `zlib("<kind> <size>\0" + payload)`, and its ID is
//! the digest of the uncompressed framed bytes. This crate builds and takes
//! apart that framing incrementally, one chunk at a time.
//!
//! # Architecture
//!
//! - [`Transform`]: the chunked stage primitive (`push` chunks, `finish` once)
//! - [`ObjectEncoder`]: header framing + digest + [`Deflater`], streaming when
//!   the size is declared and buffering when it is not
//! - [`ObjectDecoder`]: [`Inflater`] + [`HeaderSplitter`], tolerant of headers
//!   split across any chunk boundary
//! - [`structured`]: tree/commit/tag writers and readers on top of the two
//! - [`io`]: blocking `Read`/`Write` adapters
//! - [`pipeline`]: tokio tasks between bounded channels, with back-pressure
//!
//! # Result Delivery
//!
//! A stage's result is the return value of [`Transform::finish`]. It is
//! produced only when the whole operation succeeded; a size mismatch or parse
//! failure returns an error instead. [`with_continuation`] attaches a
//! callback that observes the result exactly once.

pub mod compress;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod structured;
pub mod transform;

pub use compress::{CompressionStats, Deflater, Inflater, ZlibCodec, ZlibStage};
pub use config::{DecodeMode, DecoderConfig, EncoderConfig, OutputMode};
pub use decoder::{DecodeOutcome, HeaderSplitter, ObjectDecoder};
pub use encoder::{encode_bytes, with_continuation, EncodeOutcome, ObjectEncoder, WithContinuation};
pub use error::{StreamError, StreamResult};
pub use io::{drive, TransformWriter};
pub use pipeline::{join_stage, pipe_chunks, spawn_transform, Duplex};
pub use structured::{
    encode_commit, encode_record, encode_tag, encode_tree, encode_value, read_commit, read_object,
    read_tag, read_tree, write_record, ObjectRecord, ParsedObject, StructuredDecoder,
};
pub use transform::{run_chunks, Chain, Identity, Transform};
