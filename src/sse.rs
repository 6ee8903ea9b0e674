//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns a raw response body into lines as they arrive and decodes each
//! `data: ` line of an OpenAI-compatible completion stream into a [`StreamDelta`].

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::types::ChatCompletionChunk;

/// Prefix of every SSE line that carries a payload.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks the end of a completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest line accepted from a stream.  A body that goes this long without a newline
/// fails instead of buffering without bound.
pub const MAX_LINE_LENGTH: usize = 1 << 20;

/// A response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A response body as a stream of lines, yielded as soon as each newline arrives.
pub type LineStream = FramedRead<StreamReader<ByteStream, Bytes>, LinesCodec>;

/// The decoded meaning of one SSE line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamDelta {
    /// Text to append to the response, if the chunk carried any.
    pub content: Option<String>,
    /// True when the server signalled the end of the stream.
    pub is_terminal: bool,
}

impl StreamDelta {
    /// The end-of-stream marker.
    pub fn terminal() -> Self {
        Self {
            content: None,
            is_terminal: true,
        }
    }

    /// A delta carrying `content`.
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_terminal: false,
        }
    }
}

/// Decode one line of a completion stream.
///
/// Returns `None` for lines that carry nothing: anything without the `data: ` prefix
/// (blank separators, `event:` and `:` comment lines) and payloads that are not valid
/// chunk JSON.  A malformed chunk is treated as a transport hiccup, not a failure.
pub fn parse_line(raw: &str) -> Option<StreamDelta> {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    let data = raw.strip_prefix(DATA_PREFIX)?.trim();
    if data == DONE_SENTINEL {
        return Some(StreamDelta::terminal());
    }
    let chunk = serde_json::from_str::<ChatCompletionChunk>(data).ok()?;
    Some(StreamDelta {
        content: chunk.content().map(str::to_string),
        is_terminal: false,
    })
}

/// Split a byte stream into lines without waiting for the end of the body.
///
/// Multi-byte characters split across chunks are reassembled; a trailing line with no
/// newline is yielded when the body ends.  Lines longer than [`MAX_LINE_LENGTH`] are an
/// error.
pub fn lines(bytes: ByteStream) -> LineStream {
    FramedRead::new(
        StreamReader::new(bytes),
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::stream;
    use tokio_util::codec::LinesCodecError;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk))),
        ))
    }

    async fn collect_lines(chunks: Vec<&'static [u8]>) -> Vec<String> {
        lines(byte_stream(chunks))
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[test]
    fn parse_content_fragment() {
        let delta = parse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(delta, StreamDelta::fragment("Hi"));
    }

    #[test]
    fn parse_keeps_fragment_whitespace() {
        let delta = parse_line(r#"data: {"choices":[{"delta":{"content":" there\n"}}]}"#);
        assert_eq!(delta, Some(StreamDelta::fragment(" there\n")));
    }

    #[test]
    fn parse_done_sentinel() {
        assert_eq!(parse_line("data: [DONE]"), Some(StreamDelta::terminal()));
        assert_eq!(parse_line("data: [DONE]  \r"), Some(StreamDelta::terminal()));
    }

    #[test]
    fn lines_without_prefix_are_skipped() {
        for line in [
            "",
            ": keep-alive",
            "event: message",
            "data:{\"choices\":[]}",
            "DATA: [DONE]",
            "[DONE]",
        ] {
            assert_eq!(parse_line(line), None, "{line:?}");
        }
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(parse_line("data: {\"choices\": [{\"delta\""), None);
        assert_eq!(parse_line("data: not json"), None);
        assert_eq!(parse_line("data: 42"), None);
    }

    #[test]
    fn missing_content_is_an_empty_delta() {
        let empty = StreamDelta::default();
        assert_eq!(parse_line("data: {}"), Some(empty.clone()));
        assert_eq!(parse_line(r#"data: {"choices":[]}"#), Some(empty.clone()));
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            Some(empty)
        );
    }

    #[test]
    fn only_first_choice_is_consulted() {
        let line = r#"data: {"choices":[{"delta":{}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(parse_line(line), Some(StreamDelta::default()));
    }

    #[tokio::test]
    async fn lines_split_across_chunks() {
        let lines = collect_lines(vec![b"data: one\n\nda", b"ta: two\r\n", b"data: three"]).await;
        assert_eq!(lines, vec!["data: one", "", "data: two", "data: three"]);
    }

    #[tokio::test]
    async fn lines_reassemble_split_characters() {
        // "é" is 0xC3 0xA9.
        let lines = collect_lines(vec![b"data: caf\xC3", b"\xA9\n"]).await;
        assert_eq!(lines, vec!["data: café"]);
    }

    #[tokio::test]
    async fn overlong_line_is_an_error() {
        let bytes: ByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from(vec![
            b'a';
            MAX_LINE_LENGTH + 1
        ]))]));
        let mut lines = lines(bytes);
        assert!(matches!(
            lines.next().await,
            Some(Err(LinesCodecError::MaxLineLengthExceeded))
        ));
    }

    #[tokio::test]
    async fn transport_errors_surface_as_line_errors() {
        let bytes: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"data: a\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]));
        let mut lines = lines(bytes);
        assert_eq!(lines.next().await.unwrap().unwrap(), "data: a");
        assert!(lines.next().await.unwrap().is_err());
    }
}
