//! Tree, commit, and tag objects over the blob encoder and decoder.
//!
//! Writers normalize (unless strict), serialize, and encode a record with
//! its kind and exact size declared, returning the normalized record with the
//! digest. Readers decode a compressed stream, collect the payload, and parse
//! it by the header's kind.

use std::fmt;
use std::io::Write;

use serde_json::Value;
use tracing::debug;

use gbs_crypto::HashOutput;
use gbs_objects::{normalize_value, typed_value, Commit, ObjectBody, Tag, Tree};
use gbs_types::{ObjectHeader, ObjectKind};

use crate::config::{DecoderConfig, EncoderConfig};
use crate::decoder::{DecodeOutcome, ObjectDecoder};
use crate::encoder::{EncodeOutcome, ObjectEncoder};
use crate::error::{StreamError, StreamResult};
use crate::transform::{run_chunks, Transform};

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Digest, payload length, and the record that was encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    pub hash: HashOutput,
    pub size: u64,
    pub parsed_body: ObjectBody,
}

impl ObjectRecord {
    fn new(outcome: EncodeOutcome, body: ObjectBody) -> Self {
        Self {
            hash: outcome.hash,
            size: outcome.size,
            parsed_body: body,
        }
    }
}

/// Encode a typed record. The kind and size in `config` are replaced by the
/// record's own.
pub fn encode_record(
    body: ObjectBody,
    config: &EncoderConfig,
) -> StreamResult<(Vec<u8>, ObjectRecord)> {
    let mut out = Vec::new();
    let record = write_record(body, config, &mut out)?;
    Ok((out, record))
}

/// Encode a typed record into a writer.
pub fn write_record<W: Write>(
    body: ObjectBody,
    config: &EncoderConfig,
    mut writer: W,
) -> StreamResult<ObjectRecord> {
    body.validate()?;
    let payload = body.encode();
    let config = config
        .clone()
        .with_kind(body.kind())
        .with_size(payload.len() as u64);
    let (bytes, outcome) = run_chunks(ObjectEncoder::new(config)?, [&payload])?;
    writer.write_all(&bytes)?;
    debug!(kind = %body.kind(), size = outcome.size, "structured object written");
    Ok(ObjectRecord::new(outcome, body))
}

/// Encode a JSON record of the given kind.
///
/// Without `strict` the record is normalized first (array-form trees,
/// legacy `parent`, default committer and dates). With `strict` it must
/// already have the typed shape.
pub fn encode_value(
    kind: ObjectKind,
    value: Value,
    config: &EncoderConfig,
) -> StreamResult<(Vec<u8>, ObjectRecord)> {
    let body = if config.strict {
        typed_value(kind, value)?
    } else {
        normalize_value(kind, value)?
    };
    encode_record(body, config)
}

pub fn encode_tree(tree: Tree, config: &EncoderConfig) -> StreamResult<(Vec<u8>, ObjectRecord)> {
    encode_record(ObjectBody::Tree(tree), config)
}

pub fn encode_commit(
    commit: Commit,
    config: &EncoderConfig,
) -> StreamResult<(Vec<u8>, ObjectRecord)> {
    encode_record(ObjectBody::Commit(commit), config)
}

pub fn encode_tag(tag: Tag, config: &EncoderConfig) -> StreamResult<(Vec<u8>, ObjectRecord)> {
    encode_record(ObjectBody::Tag(tag), config)
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// A decoded object: its header and parsed payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedObject {
    pub header: ObjectHeader,
    pub body: ObjectBody,
}

/// Decodes a compressed object and parses its payload at finish.
///
/// Emits no bytes; the payload is held until the stream ends.
pub struct StructuredDecoder {
    decoder: ObjectDecoder,
    payload: Vec<u8>,
}

impl StructuredDecoder {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// `config.mode` is ignored: the payload is always collected.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: ObjectDecoder::new(DecoderConfig {
                mode: Default::default(),
                ..config
            }),
            payload: Vec::new(),
        }
    }
}

impl Default for StructuredDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StructuredDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredDecoder")
            .field("decoder", &self.decoder)
            .field("buffered", &self.payload.len())
            .finish()
    }
}

impl Transform for StructuredDecoder {
    type Output = ParsedObject;

    fn push(&mut self, chunk: &[u8], _out: &mut Vec<u8>) -> StreamResult<()> {
        self.decoder.push(chunk, &mut self.payload)
    }

    fn finish(mut self, _out: &mut Vec<u8>) -> StreamResult<ParsedObject> {
        let DecodeOutcome { header, .. } = self.decoder.finish(&mut self.payload)?;
        let body = ObjectBody::parse(header.kind, &self.payload)?;
        debug!(kind = %header.kind, size = header.size, "structured object parsed");
        Ok(ParsedObject { header, body })
    }
}

/// Decode and parse a complete compressed object.
pub fn read_object(compressed: &[u8]) -> StreamResult<ParsedObject> {
    Ok(run_chunks(StructuredDecoder::new(), [compressed])?.1)
}

fn read_kind(compressed: &[u8], expected: ObjectKind) -> StreamResult<ObjectBody> {
    let parsed = read_object(compressed)?;
    if parsed.header.kind != expected {
        return Err(StreamError::KindMismatch {
            expected,
            actual: parsed.header.kind,
        });
    }
    Ok(parsed.body)
}

pub fn read_tree(compressed: &[u8]) -> StreamResult<Tree> {
    match read_kind(compressed, ObjectKind::Tree)? {
        ObjectBody::Tree(tree) => Ok(tree),
        other => Err(mismatch(ObjectKind::Tree, &other)),
    }
}

pub fn read_commit(compressed: &[u8]) -> StreamResult<Commit> {
    match read_kind(compressed, ObjectKind::Commit)? {
        ObjectBody::Commit(commit) => Ok(commit),
        other => Err(mismatch(ObjectKind::Commit, &other)),
    }
}

pub fn read_tag(compressed: &[u8]) -> StreamResult<Tag> {
    match read_kind(compressed, ObjectKind::Tag)? {
        ObjectBody::Tag(tag) => Ok(tag),
        other => Err(mismatch(ObjectKind::Tag, &other)),
    }
}

fn mismatch(expected: ObjectKind, body: &ObjectBody) -> StreamError {
    StreamError::KindMismatch {
        expected,
        actual: body.kind(),
    }
}
