//! Async composition: a transform running on its own task between two
//! bounded channels.
//!
//! Back-pressure comes from channel capacity. When the consumer stops
//! draining `output`, the task blocks on send, stops receiving, and the
//! producer's `input.send` waits in turn. Dropping `input` ends the stream
//! and lets the stage finish; aborting `result` abandons it without a result.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Handles to a running stage.
#[derive(Debug)]
pub struct Duplex<O> {
    /// Send input chunks; drop to signal end of input.
    pub input: mpsc::Sender<Bytes>,
    /// Transformed chunks, closed after the stage finishes.
    pub output: mpsc::Receiver<Bytes>,
    /// Resolves to the stage result once, after the last output chunk.
    pub result: JoinHandle<StreamResult<O>>,
}

/// Spawn `transform` on the current tokio runtime.
///
/// `capacity` bounds both channels (in chunks) and is raised to 1 if zero.
pub fn spawn_transform<T>(transform: T, capacity: usize) -> Duplex<T::Output>
where
    T: Transform + Send + 'static,
    T::Output: Send + 'static,
{
    let capacity = capacity.max(1);
    let (input, input_rx) = mpsc::channel(capacity);
    let (output_tx, output) = mpsc::channel(capacity);
    let result = tokio::spawn(run_stage(transform, input_rx, output_tx));
    Duplex {
        input,
        output,
        result,
    }
}

async fn run_stage<T: Transform>(
    mut transform: T,
    mut input: mpsc::Receiver<Bytes>,
    output: mpsc::Sender<Bytes>,
) -> StreamResult<T::Output> {
    let mut buf = Vec::new();
    let mut chunks = 0u64;

    while let Some(chunk) = input.recv().await {
        chunks += 1;
        if let Err(e) = transform.push(&chunk, &mut buf) {
            warn!(error = %e, chunks, "pipeline stage failed");
            return Err(e);
        }
        forward(&output, &mut buf).await;
    }

    let value = match transform.finish(&mut buf) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, chunks, "pipeline stage failed at finish");
            return Err(e);
        }
    };
    forward(&output, &mut buf).await;
    debug!(chunks, "pipeline stage finished");
    Ok(value)
}

/// Send buffered output downstream. A closed receiver means nobody wants
/// the bytes; they are dropped and the stage keeps consuming input.
async fn forward(output: &mpsc::Sender<Bytes>, buf: &mut Vec<u8>) {
    if buf.is_empty() {
        return;
    }
    let chunk = Bytes::from(std::mem::take(buf));
    let _ = output.send(chunk).await;
}

/// Await a stage result, mapping a panicked or cancelled task to
/// [`StreamError::Task`].
pub async fn join_stage<O>(handle: JoinHandle<StreamResult<O>>) -> StreamResult<O> {
    handle
        .await
        .map_err(|e| StreamError::Task(e.to_string()))?
}

/// Feed `chunks` through a spawned stage, collecting its output.
pub async fn pipe_chunks<T, I>(
    transform: T,
    capacity: usize,
    chunks: I,
) -> StreamResult<(Vec<u8>, T::Output)>
where
    T: Transform + Send + 'static,
    T::Output: Send + 'static,
    I: IntoIterator<Item = Bytes> + Send + 'static,
    I::IntoIter: Send,
{
    let Duplex {
        input,
        mut output,
        result,
    } = spawn_transform(transform, capacity);

    let producer = tokio::spawn(async move {
        for chunk in chunks {
            if input.send(chunk).await.is_err() {
                break;
            }
        }
    });

    let mut collected = Vec::new();
    while let Some(chunk) = output.recv().await {
        collected.extend_from_slice(&chunk);
    }
    producer
        .await
        .map_err(|e| StreamError::Task(e.to_string()))?;
    let value = join_stage(result).await?;
    Ok((collected, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;
    use crate::decoder::ObjectDecoder;
    use crate::encoder::{with_continuation, ObjectEncoder};
    use crate::transform::Transform;
    use std::sync::{Arc, Mutex};

    const HELLO_SHA1: &str = "557db03de997c86a4a028e1ebd3a1ceb225be238";

    fn hello_chunks() -> Vec<Bytes> {
        vec![
            Bytes::from_static(b"Hello"),
            Bytes::new(),
            Bytes::from_static(b" World\n"),
        ]
    }

    #[tokio::test]
    async fn encode_then_decode_through_tasks() {
        let encoder = ObjectEncoder::new(EncoderConfig::default()).unwrap();
        let (compressed, outcome) = pipe_chunks(encoder, 2, hello_chunks()).await.unwrap();
        assert_eq!(outcome.hash.to_hex().unwrap(), HELLO_SHA1);

        let chunks: Vec<Bytes> = compressed.chunks(4).map(Bytes::copy_from_slice).collect();
        let (payload, decoded) = pipe_chunks(ObjectDecoder::default(), 1, chunks).await.unwrap();
        assert_eq!(payload, b"Hello World\n");
        assert_eq!(decoded.header.size, 12);
    }

    #[tokio::test]
    async fn chained_encoder_and_decoder_in_one_stage() {
        let encoder = ObjectEncoder::new(EncoderConfig::default()).unwrap();
        let stage = encoder.chain(ObjectDecoder::default());
        let (payload, (encoded, decoded)) = pipe_chunks(stage, 4, hello_chunks()).await.unwrap();
        assert_eq!(payload, b"Hello World\n");
        assert_eq!(encoded.size, 12);
        assert_eq!(decoded.payload_len, 12);
    }

    #[tokio::test]
    async fn sink_only_result_is_the_single_terminal_value() {
        let encoder = ObjectEncoder::new(EncoderConfig::sink().with_size(12)).unwrap();
        let Duplex { input, mut output, result } = spawn_transform(encoder, 1);
        for chunk in hello_chunks() {
            input.send(chunk).await.unwrap();
        }
        drop(input);
        assert!(output.recv().await.is_none());
        let outcome = join_stage(result).await.unwrap();
        assert_eq!(outcome.hash.to_hex().unwrap(), HELLO_SHA1);
    }

    #[tokio::test]
    async fn size_mismatch_delivers_no_result() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let encoder = with_continuation(
            ObjectEncoder::new(EncoderConfig::default().with_size(10)).unwrap(),
            move |result| seen.lock().unwrap().push(result.is_ok()),
        );
        let chunks = vec![Bytes::from_static(&[1u8; 11])];
        let err = pipe_chunks(encoder, 1, chunks).await.unwrap_err();
        assert!(matches!(err, StreamError::SizeMismatch { declared: 10, actual: 11 }));
        assert_eq!(*calls.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn independent_pipelines_run_concurrently() {
        let tasks: Vec<_> = (0..8u8)
            .map(|i| {
                tokio::spawn(async move {
                    let payload = vec![i; 1000 + usize::from(i)];
                    let encoder = ObjectEncoder::new(EncoderConfig::sink()).unwrap();
                    let chunks: Vec<Bytes> =
                        payload.chunks(7).map(Bytes::copy_from_slice).collect();
                    let (_, outcome) = pipe_chunks(encoder, 2, chunks).await.unwrap();
                    let (_, expected) =
                        crate::encoder::encode_bytes(EncoderConfig::sink(), &payload).unwrap();
                    assert_eq!(outcome, expected);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn aborted_stage_reports_task_error() {
        let encoder = ObjectEncoder::new(EncoderConfig::default()).unwrap();
        let Duplex { input, output, result } = spawn_transform(encoder, 1);
        result.abort();
        let err = join_stage(result).await.unwrap_err();
        assert!(matches!(err, StreamError::Task(_)));
        drop((input, output));
    }
}
