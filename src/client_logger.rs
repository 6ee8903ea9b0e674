//! Logging trait for chat completion exchanges.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log every exchange passing through the [`Client`](crate::Client).

use crate::sse::StreamDelta;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// A trait for logging chat completion exchanges.
///
/// Implement this trait to capture the requests sent, complete non-streaming responses, and
/// the individual deltas of a streamed response.
///
/// # Example
///
/// ```rust,ignore
/// use talkhand::{ChatCompletionRequest, ChatCompletionResponse, ClientLogger, StreamDelta};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_request(&self, request: &ChatCompletionRequest) {
///         eprintln!("request: model={} stream={}", request.model, request.stream);
///     }
///
///     fn log_response(&self, response: &ChatCompletionResponse) {
///         eprintln!("response: {:?}", response.first_content());
///     }
///
///     fn log_stream_delta(&self, delta: &StreamDelta) {
///         eprintln!("delta: {delta:?}");
///     }
///
///     fn log_stream_text(&self, text: &str) {
///         eprintln!("stream complete: {text}");
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &ChatCompletionRequest);

    /// Log a complete response from a non-streaming request.
    fn log_response(&self, response: &ChatCompletionResponse);

    /// Log each decoded delta of a streaming response.
    ///
    /// Lines that decode to nothing (separators, malformed chunks) are not logged.
    fn log_stream_delta(&self, delta: &StreamDelta);

    /// Log the sanitized text of a stream that settled successfully.
    fn log_stream_text(&self, text: &str);
}
