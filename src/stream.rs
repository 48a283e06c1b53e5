//! Decoding `data:` lines into typed chunks and delivering them to consumers.

use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::sse::{is_done_marker, parse_sse_line};

/// Receives the chunks of one streaming call.
///
/// Exactly one of `on_complete` or `on_error` is called, and nothing is called after it.
/// When the call is cancelled neither is called.
pub trait StreamConsumer<T>: Send {
    /// Called for every decoded chunk, in transport order.
    fn on_chunk(&mut self, chunk: T);

    /// Called once when the `[DONE]` marker arrives.
    fn on_complete(&mut self);

    /// Called once when the stream fails.
    fn on_error(&mut self, error: ClientError);
}

/// How a streaming call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `[DONE]` was received.
    Completed,
    /// An error was delivered to the consumer.
    Failed,
    /// The call was cancelled before it finished.
    Cancelled,
}

/// Decode a stream of SSE lines into typed chunks.
///
/// Lines without a `data: ` prefix are skipped. The stream ends cleanly after `[DONE]`.
/// A payload that fails to decode yields one `Decoding` error and ends the stream; so does a
/// transport error. If the lines run out before `[DONE]`, `ConnectionClosed` is yielded.
pub fn decode_events<T, S>(lines: S) -> impl Stream<Item = Result<T, ClientError>> + Send
where
    T: DeserializeOwned + Send,
    S: Stream<Item = Result<String, ClientError>> + Send + 'static,
{
    stream::unfold((Box::pin(lines), false), |(mut lines, finished)| async move {
        if finished {
            return None;
        }
        loop {
            let line = match lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some((Err(e), (lines, true))),
                None => return Some((Err(ClientError::ConnectionClosed), (lines, true))),
            };

            let Some(data) = parse_sse_line(&line) else {
                continue;
            };

            if is_done_marker(data) {
                return None;
            }

            return match serde_json::from_str::<T>(data) {
                Ok(chunk) => Some((Ok(chunk), (lines, false))),
                Err(e) => {
                    tracing::debug!(payload = data, error = %e, "Undecodable stream chunk");
                    Some((Err(ClientError::Decoding(e)), (lines, true)))
                }
            };
        }
    })
}

/// Push a chunk stream into a consumer until it completes, fails or is cancelled.
///
/// On cancellation the stream is dropped without reading further and the consumer is left
/// untouched.
pub async fn drive<T, S, C>(events: S, consumer: &mut C, cancel: &CancellationToken) -> StreamOutcome
where
    S: Stream<Item = Result<T, ClientError>>,
    C: StreamConsumer<T> + ?Sized,
{
    futures::pin_mut!(events);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamOutcome::Cancelled,
            next = events.next() => next,
        };

        match next {
            Some(Ok(chunk)) => consumer.on_chunk(chunk),
            Some(Err(e)) => {
                consumer.on_error(e);
                return StreamOutcome::Failed;
            }
            None => {
                consumer.on_complete();
                return StreamOutcome::Completed;
            }
        }
    }
}
