//! Blocking `std::io` adapters for transforms.

use std::io::{self, ErrorKind, Read, Write};

use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Read buffer size used by [`drive`].
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A `Write` sink that runs everything written through a transform and
/// writes the transformed bytes to an inner writer.
///
/// Call [`finish`](Self::finish) to flush the transform and obtain its
/// result; dropping the writer abandons the operation.
#[derive(Debug)]
pub struct TransformWriter<T, W> {
    transform: T,
    inner: W,
    scratch: Vec<u8>,
}

impl<T: Transform, W: Write> TransformWriter<T, W> {
    pub fn new(transform: T, inner: W) -> Self {
        Self {
            transform,
            inner,
            scratch: Vec::new(),
        }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Finish the transform, write its tail, and return its result with
    /// the inner writer.
    pub fn finish(mut self) -> StreamResult<(T::Output, W)> {
        let output = self.transform.finish(&mut self.scratch)?;
        self.inner.write_all(&self.scratch)?;
        self.inner.flush()?;
        Ok((output, self.inner))
    }
}

impl<T: Transform, W: Write> Write for TransformWriter<T, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.transform
            .push(buf, &mut self.scratch)
            .map_err(into_io)?;
        let result = self.inner.write_all(&self.scratch);
        self.scratch.clear();
        result.map(|()| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn into_io(err: StreamError) -> io::Error {
    match err {
        StreamError::Io(e) => e,
        other => io::Error::other(other),
    }
}

/// Pump a reader through a transform into a writer until end of input.
pub fn drive<R, T, W>(mut reader: R, transform: T, writer: W) -> StreamResult<(T::Output, W)>
where
    R: Read,
    T: Transform,
    W: Write,
{
    let mut writer = TransformWriter::new(transform, writer);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer
            .transform
            .push(&buf[..n], &mut writer.scratch)?;
        writer.inner.write_all(&writer.scratch)?;
        writer.scratch.clear();
    }
    writer.finish()
}
