//! The chunked-transform primitive every stage implements.

use crate::error::StreamResult;

/// A stage that consumes byte chunks and produces byte chunks, then a single
/// terminal value.
///
/// `push` appends whatever output the chunk produced to `out` (possibly
/// nothing). `finish` flushes remaining output and yields the stage result;
/// it consumes the stage, so no input can follow it. A stage that returned an
/// error from `push` rejects all later calls.
pub trait Transform {
    type Output;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()>;

    fn finish(self, out: &mut Vec<u8>) -> StreamResult<Self::Output>;

    /// Feed `self`'s output into `next`.
    fn chain<B: Transform>(self, next: B) -> Chain<Self, B>
    where
        Self: Sized,
    {
        Chain::new(self, next)
    }
}

/// Two stages in series: output bytes of `A` are the input of `B`.
#[derive(Debug)]
pub struct Chain<A, B> {
    first: A,
    second: B,
    scratch: Vec<u8>,
}

impl<A: Transform, B: Transform> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            scratch: Vec::new(),
        }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A: Transform, B: Transform> Transform for Chain<A, B> {
    type Output = (A::Output, B::Output);

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.first.push(chunk, &mut self.scratch)?;
        if !self.scratch.is_empty() {
            let result = self.second.push(&self.scratch, out);
            self.scratch.clear();
            result?;
        }
        Ok(())
    }

    fn finish(mut self, out: &mut Vec<u8>) -> StreamResult<Self::Output> {
        let a = self.first.finish(&mut self.scratch)?;
        if !self.scratch.is_empty() {
            self.second.push(&self.scratch, out)?;
        }
        let b = self.second.finish(out)?;
        Ok((a, b))
    }
}

/// Pass bytes through unchanged, counting them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity {
    bytes: u64,
}

impl Transform for Identity {
    type Output = u64;

    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.bytes += chunk.len() as u64;
        out.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(self, _out: &mut Vec<u8>) -> StreamResult<u64> {
        Ok(self.bytes)
    }
}

/// Run a transform over in-memory chunks, returning all output and the result.
pub fn run_chunks<T, I, C>(mut transform: T, chunks: I) -> StreamResult<(Vec<u8>, T::Output)>
where
    T: Transform,
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for chunk in chunks {
        transform.push(chunk.as_ref(), &mut out)?;
    }
    let output = transform.finish(&mut out)?;
    Ok((out, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;

    /// Uppercases ASCII and counts calls.
    #[derive(Default)]
    struct Upper {
        pushes: usize,
    }

    impl Transform for Upper {
        type Output = usize;

        fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
            self.pushes += 1;
            out.extend(chunk.iter().map(u8::to_ascii_uppercase));
            Ok(())
        }

        fn finish(self, out: &mut Vec<u8>) -> StreamResult<usize> {
            out.push(b'!');
            Ok(self.pushes)
        }
    }

    struct Fails;

    impl Transform for Fails {
        type Output = ();

        fn push(&mut self, _chunk: &[u8], _out: &mut Vec<u8>) -> StreamResult<()> {
            Err(StreamError::Poisoned)
        }

        fn finish(self, _out: &mut Vec<u8>) -> StreamResult<()> {
            Ok(())
        }
    }

    #[test]
    fn identity_counts_bytes() {
        let (out, n) = run_chunks(Identity::default(), [&b"ab"[..], b"", b"c"]).unwrap();
        assert_eq!(out, b"abc");
        assert_eq!(n, 3);
    }

    #[test]
    fn chain_feeds_finish_output_downstream() {
        let chain = Upper::default().chain(Identity::default());
        let (out, (pushes, bytes)) = run_chunks(chain, ["ab", "cd"]).unwrap();
        assert_eq!(out, b"ABCD!");
        assert_eq!(pushes, 2);
        assert_eq!(bytes, 5);
    }

    #[test]
    fn chain_skips_empty_intermediate_output() {
        let chain = Identity::default().chain(Upper::default());
        let (_, (_, pushes)) = run_chunks(chain, ["", "x", ""]).unwrap();
        assert_eq!(pushes, 1);
    }

    #[test]
    fn chain_propagates_errors() {
        let chain = Identity::default().chain(Fails);
        assert!(matches!(
            run_chunks(chain, ["x"]),
            Err(StreamError::Poisoned)
        ));
    }
}
