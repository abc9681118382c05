use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gbs_crypto::{DigestSink, HashOutput};
use gbs_types::{build_header, ObjectId, ObjectKind};

use crate::compress::Deflater;
use crate::config::EncoderConfig;
use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Result of a completed encode: the object digest and payload length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOutcome {
    pub hash: HashOutput,
    pub size: u64,
}

impl EncodeOutcome {
    /// The digest as an [`ObjectId`], if it is 20 bytes long.
    pub fn object_id(&self) -> StreamResult<ObjectId> {
        Ok(self.hash.to_object_id()?)
    }
}

// ---------------------------------------------------------------------------
// EncodeState
// ---------------------------------------------------------------------------

enum EncodeState {
    /// No declared size: payload is buffered until finish.
    AwaitingSize { buffered: Vec<u8> },
    /// Declared size, header not yet written.
    HeaderPending,
    /// Declared size, header written; chunks pass straight through.
    Streaming,
    Failed,
}

impl EncodeState {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingSize { .. } => "awaiting_size",
            Self::HeaderPending => "header_pending",
            Self::Streaming => "streaming",
            Self::Failed => "failed",
        }
    }
}

/// Frames a payload as `"<kind> <size>\0" + payload`, hashes the framed
/// bytes, and (in passthrough mode) compresses them.
///
/// With a declared size the header is written on the first push and every
/// chunk is hashed and compressed as it arrives. Without one, chunks are
/// buffered and the whole object is processed at finish. Either way the
/// received length is checked against the header at finish, and a mismatch
/// fails the operation without producing an outcome.
pub struct ObjectEncoder {
    config: EncoderConfig,
    digest: DigestSink,
    deflater: Option<Deflater>,
    state: EncodeState,
    received: u64,
}

impl ObjectEncoder {
    pub fn new(config: EncoderConfig) -> StreamResult<Self> {
        config.validate()?;
        let deflater = config
            .emits_output()
            .then(|| Deflater::new(config.compression_level));
        let state = match config.size {
            Some(_) => EncodeState::HeaderPending,
            None => EncodeState::AwaitingSize {
                buffered: Vec::new(),
            },
        };
        Ok(Self {
            digest: DigestSink::new(config.algorithm),
            config,
            deflater,
            state,
            received: 0,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Payload bytes received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    fn emit(&mut self, bytes: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.digest.update(bytes);
        match &mut self.deflater {
            Some(deflater) => deflater.push(bytes, out),
            None => Ok(()),
        }
    }

    fn emit_header(&mut self, size: u64, out: &mut Vec<u8>) -> StreamResult<()> {
        let header = build_header(self.config.kind, size);
        self.emit(&header, out)
    }

    fn push_inner(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        match &mut self.state {
            EncodeState::Failed => return Err(StreamError::Poisoned),
            EncodeState::AwaitingSize { buffered } => {
                buffered.extend_from_slice(chunk);
                self.received += chunk.len() as u64;
                return Ok(());
            }
            EncodeState::HeaderPending => {
                let size = self.config.size.unwrap_or_default();
                self.emit_header(size, out)?;
                self.state = EncodeState::Streaming;
            }
            EncodeState::Streaming => {}
        }
        self.received += chunk.len() as u64;
        self.emit(chunk, out)
    }

    fn finish_inner(&mut self, out: &mut Vec<u8>) -> StreamResult<u64> {
        match std::mem::replace(&mut self.state, EncodeState::Failed) {
            EncodeState::Failed => Err(StreamError::Poisoned),
            EncodeState::AwaitingSize { buffered } => {
                let size = buffered.len() as u64;
                self.emit_header(size, out)?;
                self.emit(&buffered, out)?;
                Ok(size)
            }
            state @ (EncodeState::HeaderPending | EncodeState::Streaming) => {
                let declared = self.config.size.unwrap_or_default();
                if matches!(state, EncodeState::HeaderPending) {
                    self.emit_header(declared, out)?;
                }
                if declared != self.received {
                    warn!(
                        kind = %self.config.kind,
                        declared,
                        actual = self.received,
                        "encoded payload length differs from declared size"
                    );
                    return Err(StreamError::SizeMismatch {
                        declared,
                        actual: self.received,
                    });
                }
                Ok(declared)
            }
        }
    }
}

impl fmt::Debug for ObjectEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectEncoder")
            .field("kind", &self.config.kind)
            .field("state", &self.state.name())
            .field("received", &self.received)
            .finish()
    }
}

impl Transform for ObjectEncoder {
    type Output = EncodeOutcome;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let result = self.push_inner(chunk, out);
        if result.is_err() {
            self.state = EncodeState::Failed;
        }
        result
    }

    fn finish(mut self, out: &mut Vec<u8>) -> StreamResult<EncodeOutcome> {
        let size = self.finish_inner(out)?;
        if let Some(deflater) = self.deflater.take() {
            deflater.finish(out)?;
        }
        let hash = self.digest.finalize(self.config.hash_format);
        debug!(
            kind = %self.config.kind,
            size,
            output = ?self.config.output,
            "object encoded"
        );
        Ok(EncodeOutcome { hash, size })
    }
}

/// Encode an in-memory payload with its exact size declared.
pub fn encode_bytes(
    config: EncoderConfig,
    payload: &[u8],
) -> StreamResult<(Vec<u8>, EncodeOutcome)> {
    let mut encoder = ObjectEncoder::new(config.with_size(payload.len() as u64))?;
    let mut out = Vec::new();
    encoder.push(payload, &mut out)?;
    let outcome = encoder.finish(&mut out)?;
    Ok((out, outcome))
}

// ---------------------------------------------------------------------------
// Continuation adapter
// ---------------------------------------------------------------------------

/// Wraps a stage so a callback observes its result exactly once.
///
/// The callback runs on the first `push` error, or otherwise at `finish`
/// with the outcome or the finish error. The result is still returned to
/// the caller as usual.
pub struct WithContinuation<T: Transform, F> {
    inner: T,
    callback: Option<F>,
}

/// Attach a continuation to a stage.
pub fn with_continuation<T, F>(inner: T, callback: F) -> WithContinuation<T, F>
where
    T: Transform,
    F: FnOnce(Result<&T::Output, &StreamError>),
{
    WithContinuation {
        inner,
        callback: Some(callback),
    }
}

impl<T, F> Transform for WithContinuation<T, F>
where
    T: Transform,
    F: FnOnce(Result<&T::Output, &StreamError>),
{
    type Output = T::Output;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let result = self.inner.push(chunk, out);
        if let Err(e) = &result {
            if let Some(callback) = self.callback.take() {
                callback(Err(e));
            }
        }
        result
    }

    fn finish(mut self, out: &mut Vec<u8>) -> StreamResult<T::Output> {
        let result = self.inner.finish(out);
        if let Some(callback) = self.callback.take() {
            callback(result.as_ref());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Inflater;
    use crate::config::OutputMode;
    use crate::transform::run_chunks;
    use gbs_crypto::{DigestAlgorithm, HashFormat};
    use proptest::prelude::*;
    use std::cell::RefCell;

    const HELLO: &[u8] = b"Hello World\n";
    const HELLO_SHA1: &str = "557db03de997c86a4a028e1ebd3a1ceb225be238";

    fn inflate(bytes: &[u8]) -> Vec<u8> {
        run_chunks(Inflater::new(), [bytes]).unwrap().0
    }

    #[test]
    fn hello_world_declared_size() {
        let config = EncoderConfig::default().with_size(12);
        let (compressed, outcome) =
            run_chunks(ObjectEncoder::new(config).unwrap(), [HELLO]).unwrap();
        assert_eq!(outcome.hash, HashOutput::Hex(HELLO_SHA1.into()));
        assert_eq!(outcome.size, 12);
        assert_eq!(inflate(&compressed), b"blob 12\0Hello World\n");
    }

    #[test]
    fn hello_world_discovered_size() {
        let encoder = ObjectEncoder::new(EncoderConfig::default()).unwrap();
        let (compressed, outcome) = run_chunks(encoder, [&HELLO[..6], &HELLO[6..]]).unwrap();
        assert_eq!(outcome.hash.to_hex().unwrap(), HELLO_SHA1);
        assert_eq!(inflate(&compressed), b"blob 12\0Hello World\n");
    }

    #[test]
    fn declared_mode_streams_before_finish() {
        let mut seed = 0x2545_f491u32;
        let noise: Vec<u8> = (0..256 * 1024)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (seed >> 16) as u8
            })
            .collect();
        let config = EncoderConfig::default()
            .with_size(noise.len() as u64)
            .with_compression_level(0);
        let mut encoder = ObjectEncoder::new(config).unwrap();
        let mut out = Vec::new();
        encoder.push(&noise, &mut out).unwrap();
        assert!(!out.is_empty());

        let mut buffered = ObjectEncoder::new(EncoderConfig::default()).unwrap();
        let mut nothing = Vec::new();
        buffered.push(HELLO, &mut nothing).unwrap();
        assert!(nothing.is_empty());
        assert_eq!(buffered.received(), 12);
    }

    #[test]
    fn empty_blob_without_any_push() {
        for config in [EncoderConfig::default(), EncoderConfig::default().with_size(0)] {
            let encoder = ObjectEncoder::new(config).unwrap();
            let (compressed, outcome) = run_chunks(encoder, Vec::<&[u8]>::new()).unwrap();
            assert_eq!(outcome.hash.to_hex().unwrap(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
            assert_eq!(outcome.size, 0);
            assert_eq!(inflate(&compressed), b"blob 0\0");
        }
    }

    #[test]
    fn oversize_payload_is_a_mismatch() {
        let encoder = ObjectEncoder::new(EncoderConfig::default().with_size(10)).unwrap();
        let err = run_chunks(encoder, [&[7u8; 11][..]]).unwrap_err();
        assert!(matches!(err, StreamError::SizeMismatch { declared: 10, actual: 11 }));
    }

    #[test]
    fn shortfall_is_a_mismatch() {
        let encoder = ObjectEncoder::new(EncoderConfig::default().with_size(5)).unwrap();
        let err = run_chunks(encoder, Vec::<&[u8]>::new()).unwrap_err();
        assert!(matches!(err, StreamError::SizeMismatch { declared: 5, actual: 0 }));
    }

    #[test]
    fn sink_only_emits_nothing() {
        let config = EncoderConfig::sink().with_size(12);
        let (out, outcome) = run_chunks(ObjectEncoder::new(config).unwrap(), [HELLO]).unwrap();
        assert!(out.is_empty());
        assert_eq!(outcome.hash.to_hex().unwrap(), HELLO_SHA1);
    }

    #[test]
    fn hash_formats_and_algorithms() {
        let base64 = EncoderConfig::sink().with_hash_format(HashFormat::Base64);
        let (_, outcome) = encode_bytes(base64, HELLO).unwrap();
        assert_eq!(outcome.hash, HashOutput::Base64("VX2wPemXyGpKAo4evToc6yJb4jg=".into()));

        let raw = EncoderConfig::sink().with_hash_format(HashFormat::Raw);
        let (_, outcome) = encode_bytes(raw, HELLO).unwrap();
        assert_eq!(outcome.object_id().unwrap().to_hex(), HELLO_SHA1);

        let sha256 = EncoderConfig::sink().with_algorithm(DigestAlgorithm::Sha256);
        let (_, outcome) = encode_bytes(sha256, HELLO).unwrap();
        assert_eq!(
            outcome.hash.to_hex().unwrap(),
            "7c5c8610459154bdde4984be72c48fb5d9c1c4ac793a6b5976fe38fd1b0b1284"
        );
        assert!(outcome.object_id().is_err());
    }

    #[test]
    fn kind_is_written_into_header() {
        let config = EncoderConfig::for_kind(ObjectKind::Tag).with_output(OutputMode::Passthrough);
        let (compressed, _) = encode_bytes(config, b"x").unwrap();
        assert_eq!(inflate(&compressed), b"tag 1\0x");
    }

    #[test]
    fn invalid_config_fails_before_streaming() {
        let err =
            ObjectEncoder::new(EncoderConfig::default().with_compression_level(42)).unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn continuation_sees_success_once() {
        let seen = RefCell::new(Vec::new());
        let inner = ObjectEncoder::new(EncoderConfig::sink()).unwrap();
        let encoder = with_continuation(inner, |result| {
            seen.borrow_mut().push(result.map(|o| o.size).map_err(|e| e.to_string()));
        });
        let (_, outcome) = run_chunks(encoder, [HELLO]).unwrap();
        assert_eq!(outcome.size, 12);
        assert_eq!(*seen.borrow(), vec![Ok(12)]);
    }

    #[test]
    fn continuation_sees_mismatch_and_no_success() {
        let seen = RefCell::new(Vec::new());
        let encoder = with_continuation(
            ObjectEncoder::new(EncoderConfig::default().with_size(10)).unwrap(),
            |result| seen.borrow_mut().push(result.is_ok()),
        );
        assert!(run_chunks(encoder, [&[0u8; 11][..]]).is_err());
        assert_eq!(*seen.borrow(), vec![false]);
    }

    proptest! {
        #[test]
        fn digest_is_independent_of_chunking(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
            declared in any::<bool>(),
        ) {
            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(payload.len() + 1)).collect();
            points.push(0);
            points.push(payload.len());
            points.sort_unstable();

            // Repeated cut points yield interspersed zero-byte chunks.
            let chunks: Vec<&[u8]> = points.windows(2).map(|w| &payload[w[0]..w[1]]).collect();

            let config = if declared {
                EncoderConfig::default().with_size(payload.len() as u64)
            } else {
                EncoderConfig::default()
            };
            let (chunked_bytes, chunked) =
                run_chunks(ObjectEncoder::new(config).unwrap(), chunks).unwrap();
            let (_, whole) = encode_bytes(EncoderConfig::sink(), &payload).unwrap();
            let sink = ObjectEncoder::new(EncoderConfig::sink()).unwrap();
            let one_byte = run_chunks(sink, payload.chunks(1)).unwrap().1;

            prop_assert_eq!(&chunked, &whole);
            prop_assert_eq!(&chunked, &one_byte);

            let mut framed = build_header(ObjectKind::Blob, payload.len() as u64);
            framed.extend_from_slice(&payload);
            prop_assert_eq!(inflate(&chunked_bytes), framed);
        }
    }
}
