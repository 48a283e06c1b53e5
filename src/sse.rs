//! Reading a streamed response body as Server-Sent Event lines.
//!
//! Completion chunks arrive as `data: <json>` lines separated by blank lines; the stream
//! ends with `data: [DONE]`.

use bytes::{Buf, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::client::ClientError;

/// Prefix of an event payload line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that terminates a stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Line access to a response body.
pub trait SSEResponseExt {
    /// The body as a stream of UTF-8 lines.
    fn lines(self) -> impl Stream<Item = Result<String, ClientError>> + Send;
}

impl SSEResponseExt for reqwest::Response {
    fn lines(self) -> impl Stream<Item = Result<String, ClientError>> + Send {
        lines(self.bytes_stream())
    }
}

/// Split a byte stream into lines.
///
/// Lines are separated by `\n`; a trailing `\r` is dropped. Bytes are buffered until a
/// full line is available, so multi-byte characters split across chunks decode intact. A
/// final line without a terminator is still yielded once the byte stream ends. A transport
/// error is yielded once and ends the stream.
pub fn lines<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<String, ClientError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ClientError> + Send,
{
    // `scanned` counts buffered bytes already known to hold no newline.
    stream::unfold(
        (Box::pin(byte_stream), BytesMut::new(), 0usize, false),
        |(mut byte_stream, mut buffer, mut scanned, mut finished)| async move {
            loop {
                if finished {
                    return None;
                }

                if let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                    let mut line = buffer.split_to(scanned + offset);
                    buffer.advance(1);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }
                    let decoded = decode_line(&line);
                    finished = decoded.is_err();
                    return Some((decoded, (byte_stream, buffer, 0, finished)));
                }
                scanned = buffer.len();

                match byte_stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        return Some((Err(e.into()), (byte_stream, buffer, scanned, true)));
                    }
                    None => {
                        if buffer.is_empty() {
                            return None;
                        }
                        let rest = buffer.split();
                        let decoded = decode_line(rest.strip_suffix(b"\r").unwrap_or(&rest[..]));
                        return Some((decoded, (byte_stream, buffer, 0, true)));
                    }
                }
            }
        },
    )
}

fn decode_line(bytes: &[u8]) -> Result<String, ClientError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ClientError::InvalidResponse)
}

/// The payload of a `data: ` line, trimmed; `None` for comments, `event:` lines and blanks.
///
/// ```
/// use openai_kit::sse::parse_sse_line;
///
/// assert_eq!(parse_sse_line(r#"data: {"choices":[]}"#), Some(r#"{"choices":[]}"#));
/// assert_eq!(parse_sse_line(": keep-alive"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Whether a payload is the end-of-stream sentinel.
pub fn is_done_marker(data: &str) -> bool {
    data == DONE_MARKER
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn collect(chunks: Vec<Result<Vec<u8>, ClientError>>) -> Vec<Result<String, ClientError>> {
        block_on(lines(stream::iter(chunks)).collect())
    }

    fn chunk(text: &str) -> Result<Vec<u8>, ClientError> {
        Ok(text.as_bytes().to_vec())
    }

    #[test]
    fn test_data_payloads() {
        assert_eq!(parse_sse_line("data: [DONE]"), Some("[DONE]"));
        assert_eq!(parse_sse_line("data:  {\"id\":\"c1\"} \r"), Some("{\"id\":\"c1\"}"));
        assert_eq!(parse_sse_line("data:{\"id\":\"c1\"}"), None);
        assert_eq!(parse_sse_line("event: completion"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn test_done_sentinel_is_exact() {
        assert!(is_done_marker(DONE_MARKER));
        assert!(!is_done_marker("[done]"));
        assert!(!is_done_marker("[DONE] "));
        assert!(!is_done_marker("{\"choices\":[]}"));
    }

    #[test]
    fn test_lines_across_chunk_boundaries() {
        let out = collect(vec![chunk("data: a\r\nda"), chunk("ta: b\n\n"), chunk("tail")]);
        let out: Vec<String> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(out, vec!["data: a", "data: b", "", "tail"]);
    }

    #[test]
    fn test_lines_reassemble_split_characters() {
        let text = "data: héllo\n".as_bytes();
        let (head, tail) = text.split_at(8);
        let out = collect(vec![Ok(head.to_vec()), Ok(tail.to_vec())]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "data: héllo");
    }

    #[test]
    fn test_long_line_in_small_pieces() {
        let payload = "x".repeat(5000);
        let text = format!("data: {payload}\ndata: b\n");
        let chunks = text.as_bytes().chunks(3).map(|c| Ok(c.to_vec())).collect();
        let out: Vec<String> = collect(chunks).into_iter().map(Result::unwrap).collect();
        assert_eq!(out, vec![format!("data: {payload}"), "data: b".to_string()]);
    }

    #[test]
    fn test_lines_stop_after_transport_error() {
        let out = collect(vec![
            chunk("data: a\n"),
            Err(ClientError::ConnectionClosed),
            chunk("data: b\n"),
        ]);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(ClientError::ConnectionClosed)));
    }
}
