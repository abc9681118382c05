use std::fmt;

use tracing::{debug, warn};

use gbs_types::{split_header, ObjectHeader, TypeError, MAX_HEADER_LEN};

use crate::compress::Inflater;
use crate::config::{DecodeMode, DecoderConfig};
use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Result of a completed decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOutcome {
    pub header: ObjectHeader,
    /// Payload bytes seen after the header terminator.
    pub payload_len: u64,
}

enum SplitState {
    AwaitingHeader { buffered: Vec<u8> },
    Payload { header: ObjectHeader },
    Failed,
}

/// Strips the `"<kind> <size>\0"` header from an uncompressed object stream.
///
/// Header bytes are buffered across chunks of any size, including empty
/// ones. Once the terminator is found, every following byte is forwarded
/// verbatim (or dropped in [`DecodeMode::HeaderOnly`]). The payload is not
/// cut at the declared size; with `verify_size` set, a length difference
/// fails at finish.
pub struct HeaderSplitter {
    config: DecoderConfig,
    state: SplitState,
    payload_len: u64,
}

impl HeaderSplitter {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            state: SplitState::AwaitingHeader {
                buffered: Vec::new(),
            },
            payload_len: 0,
        }
    }

    /// The parsed header, once the terminator has been seen.
    pub fn header(&self) -> Option<&ObjectHeader> {
        match &self.state {
            SplitState::Payload { header } => Some(header),
            _ => None,
        }
    }

    fn forward(&mut self, payload: &[u8], out: &mut Vec<u8>) {
        self.payload_len += payload.len() as u64;
        if self.config.mode == DecodeMode::Payload {
            out.extend_from_slice(payload);
        }
    }

    fn push_inner(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let buffered = match &mut self.state {
            SplitState::Failed => return Err(StreamError::Poisoned),
            SplitState::Payload { .. } => {
                self.forward(chunk, out);
                return Ok(());
            }
            SplitState::AwaitingHeader { buffered } => buffered,
        };

        let Some(nul) = chunk.iter().position(|&b| b == 0) else {
            buffered.extend_from_slice(chunk);
            if buffered.len() >= MAX_HEADER_LEN {
                return Err(too_long());
            }
            return Ok(());
        };

        buffered.extend_from_slice(&chunk[..=nul]);
        if buffered.len() > MAX_HEADER_LEN {
            return Err(too_long());
        }
        let header = match split_header(buffered.as_slice())? {
            Some((header, _)) => header,
            None => return Err(too_long()),
        };
        debug!(kind = %header.kind, size = header.size, "object header parsed");

        self.state = SplitState::Payload { header };
        self.forward(&chunk[nul + 1..], out);
        Ok(())
    }
}

fn too_long() -> StreamError {
    StreamError::Header(TypeError::MalformedHeader(format!(
        "no terminator within {MAX_HEADER_LEN} bytes"
    )))
}

impl fmt::Debug for HeaderSplitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderSplitter")
            .field("header", &self.header())
            .field("payload_len", &self.payload_len)
            .finish()
    }
}

impl Transform for HeaderSplitter {
    type Output = DecodeOutcome;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let result = self.push_inner(chunk, out);
        if result.is_err() {
            self.state = SplitState::Failed;
        }
        result
    }

    fn finish(self, _out: &mut Vec<u8>) -> StreamResult<DecodeOutcome> {
        let header = match self.state {
            SplitState::Failed => return Err(StreamError::Poisoned),
            SplitState::AwaitingHeader { .. } => return Err(StreamError::TruncatedHeader),
            SplitState::Payload { header } => header,
        };
        if self.config.verify_size && header.size != self.payload_len {
            warn!(
                kind = %header.kind,
                declared = header.size,
                actual = self.payload_len,
                "decoded payload length differs from header"
            );
            return Err(StreamError::SizeMismatch {
                declared: header.size,
                actual: self.payload_len,
            });
        }
        Ok(DecodeOutcome {
            header,
            payload_len: self.payload_len,
        })
    }
}

/// Inflates a compressed object stream and strips its header.
pub struct ObjectDecoder {
    inflater: Inflater,
    splitter: HeaderSplitter,
    scratch: Vec<u8>,
}

impl ObjectDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            inflater: Inflater::new(),
            splitter: HeaderSplitter::new(config),
            scratch: Vec::new(),
        }
    }

    /// The parsed header, once enough input has been decompressed.
    pub fn header(&self) -> Option<&ObjectHeader> {
        self.splitter.header()
    }
}

impl Default for ObjectDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl fmt::Debug for ObjectDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDecoder")
            .field("compressed_in", &self.inflater.stats().bytes_in)
            .field("splitter", &self.splitter)
            .finish()
    }
}

impl Transform for ObjectDecoder {
    type Output = DecodeOutcome;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.inflater.push(chunk, &mut self.scratch)?;
        let result = self.splitter.push(&self.scratch, out);
        self.scratch.clear();
        result
    }

    fn finish(mut self, out: &mut Vec<u8>) -> StreamResult<DecodeOutcome> {
        self.inflater.finish(&mut self.scratch)?;
        self.splitter.push(&self.scratch, out)?;
        self.splitter.finish(out)
    }
}
