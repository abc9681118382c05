//! zlib compression stages over `flate2`'s in-memory codecs.
//!
//! One [`ZlibStage`] drives either a [`Compress`] or a [`Decompress`] step by
//! step, appending whatever each chunk produced to the caller's output, so
//! memory stays bounded by the codec's window rather than the stream length.
//! A stage only finishes successfully once the zlib stream has ended: a
//! decompressor that never saw the end of its input is an error, and bytes
//! after the end are rejected.

use std::fmt;
use std::io::{self, ErrorKind};

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Output space reserved before each codec step.
const OUT_RESERVE: usize = 32 * 1024;

/// Byte counts observed by a compression stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompressionStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// A zlib codec that can be driven one step at a time.
pub trait ZlibCodec {
    /// Total input bytes consumed.
    fn consumed(&self) -> u64;

    /// Total output bytes produced.
    fn produced(&self) -> u64;

    /// Run one step over `input`, writing into the spare capacity of `out`.
    /// Returns `true` once the end of the zlib stream has been reached.
    fn step(&mut self, input: &[u8], out: &mut Vec<u8>, finish: bool) -> io::Result<bool>;
}

impl ZlibCodec for Compress {
    fn consumed(&self) -> u64 {
        self.total_in()
    }

    fn produced(&self) -> u64 {
        self.total_out()
    }

    fn step(&mut self, input: &[u8], out: &mut Vec<u8>, finish: bool) -> io::Result<bool> {
        let flush = if finish {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };
        let status = self.compress_vec(input, out, flush).map_err(io::Error::other)?;
        Ok(status == Status::StreamEnd)
    }
}

impl ZlibCodec for Decompress {
    fn consumed(&self) -> u64 {
        self.total_in()
    }

    fn produced(&self) -> u64 {
        self.total_out()
    }

    fn step(&mut self, input: &[u8], out: &mut Vec<u8>, _finish: bool) -> io::Result<bool> {
        let status = self
            .decompress_vec(input, out, FlushDecompress::None)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        Ok(status == Status::StreamEnd)
    }
}

/// A chunked stage over one zlib stream.
pub struct ZlibStage<C> {
    codec: C,
    ended: bool,
    poisoned: bool,
}

/// Compresses a byte stream into one zlib stream.
pub type Deflater = ZlibStage<Compress>;

/// Decompresses exactly one zlib stream.
pub type Inflater = ZlibStage<Decompress>;

impl ZlibStage<Compress> {
    /// `level` is clamped to 0..=9.
    pub fn new(level: u32) -> Self {
        Self::from_codec(Compress::new(Compression::new(level.min(9)), true))
    }
}

impl Default for ZlibStage<Compress> {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ZlibStage<Decompress> {
    pub fn new() -> Self {
        Self::from_codec(Decompress::new(true))
    }
}

impl Default for ZlibStage<Decompress> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ZlibCodec> ZlibStage<C> {
    pub fn from_codec(codec: C) -> Self {
        Self {
            codec,
            ended: false,
            poisoned: false,
        }
    }

    pub fn stats(&self) -> CompressionStats {
        CompressionStats {
            bytes_in: self.codec.consumed(),
            bytes_out: self.codec.produced(),
        }
    }

    /// Whether the end of the zlib stream has been reached.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn pump(&mut self, mut input: &[u8], out: &mut Vec<u8>, finish: bool) -> io::Result<()> {
        loop {
            if self.ended {
                if input.is_empty() {
                    return Ok(());
                }
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    "trailing bytes after end of zlib stream",
                ));
            }

            out.reserve(OUT_RESERVE);
            let spare = out.capacity() - out.len();
            let (in_before, out_before) = (self.codec.consumed(), self.codec.produced());
            self.ended = self.codec.step(input, out, finish)?;
            let consumed = (self.codec.consumed() - in_before) as usize;
            let produced = (self.codec.produced() - out_before) as usize;
            input = &input[consumed..];

            if self.ended {
                continue;
            }
            if input.is_empty() && produced < spare && !finish {
                return Ok(());
            }
            if consumed == 0 && produced == 0 {
                if finish && input.is_empty() {
                    return Ok(());
                }
                return Err(io::Error::other("zlib codec made no progress"));
            }
        }
    }
}

impl<C> fmt::Debug for ZlibStage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZlibStage")
            .field("ended", &self.ended)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl<C: ZlibCodec> Transform for ZlibStage<C> {
    type Output = CompressionStats;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        if self.poisoned {
            return Err(StreamError::Poisoned);
        }
        self.pump(chunk, out, false).map_err(|e| {
            self.poisoned = true;
            StreamError::Compression(e)
        })
    }

    fn finish(mut self, out: &mut Vec<u8>) -> StreamResult<CompressionStats> {
        if self.poisoned {
            return Err(StreamError::Poisoned);
        }
        self.pump(&[], out, true).map_err(StreamError::Compression)?;
        if !self.ended {
            return Err(StreamError::Compression(io::Error::new(
                ErrorKind::UnexpectedEof,
                "zlib stream ended early",
            )));
        }
        Ok(self.stats())
    }
}
