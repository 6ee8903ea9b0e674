//! One chat completion exchange, from request to settled text.
//!
//! A [`StreamSession`] is a stream of [`SessionEvent`]s.  It is driven with
//! [`futures::stream::unfold`] over an `Exchange` state machine: connect, then either decode
//! a single JSON body or read the SSE body line by line.  Every suspension point races the
//! cancellation token and the session deadline, so a cancelled session stops at the next
//! await, drops the response (releasing the connection), and yields nothing further.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tokio::time::Instant;
use tokio_util::codec::LinesCodecError;
use tokio_util::sync::CancellationToken;

use crate::client_logger::ClientLogger;
use crate::error::Error;
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_CANCELLATIONS,
    STREAM_DELTAS, STREAM_DURATION, STREAM_ERRORS, STREAM_LINES, STREAM_SKIPPED_LINES,
    STREAM_TTFT,
};
use crate::sanitize;
use crate::sse::{self, ByteStream, LineStream};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, RequestSpec};

/// Upper bound on the lifetime of one session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between consecutive `Delta` events of a stream.
pub const DEFAULT_PACING: Duration = Duration::from_millis(10);

/// Text settled when a non-streaming response has no content.
pub const NO_RESPONSE: &str = "No response";

/// What a session reports to its consumer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The first content fragment of a stream arrived.  Always precedes the first `Delta`.
    FirstToken,
    /// The sanitized text accumulated so far.
    Delta(String),
    /// A stream ended successfully; carries the final sanitized text.
    Finished(String),
    /// The complete text of a non-streaming response.
    Settled(String),
    /// The exchange failed.  No event follows.
    Failed(Error),
}

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Deadline for the whole exchange, measured from session creation.
    pub timeout: Duration,
    /// Delay applied after each `Delta` so incremental rendering is visible.
    pub pacing: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            pacing: DEFAULT_PACING,
        }
    }
}

/// Cancels the session it was taken from.  Cheap to clone and safe to use from any task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    /// A handle not yet tied to any session, for racing other requests against.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once the handle is cancelled.
    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }

    /// Stop the session.  It yields no further events.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// True once [`CancelHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// A single in-flight request/response exchange.
pub struct StreamSession {
    events: Option<Pin<Box<dyn Stream<Item = SessionEvent> + Send>>>,
    cancel: CancellationToken,
}

impl StreamSession {
    /// A session that posts `spec` with `http` once polled.
    pub(crate) fn connect(
        http: reqwest::Client,
        spec: RequestSpec,
        options: SessionOptions,
        logger: Option<Arc<dyn ClientLogger>>,
    ) -> Self {
        Self::new(Phase::Connect(Connect { http, spec }), options, logger)
    }

    /// A streaming session reading SSE lines from an already-open body.
    pub fn from_byte_stream(bytes: ByteStream, options: SessionOptions) -> Self {
        Self::new(Phase::Read(Reader::new(sse::lines(bytes))), options, None)
    }

    fn new(phase: Phase, options: SessionOptions, logger: Option<Arc<dyn ClientLogger>>) -> Self {
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let exchange = Exchange {
            phase,
            pending: VecDeque::new(),
            cancel: cancel.clone(),
            started,
            deadline: started + options.timeout,
            options,
            logger,
        };
        Self {
            events: Some(Box::pin(stream::unfold(exchange, Exchange::step))),
            cancel,
        }
    }

    /// Stop the session.  Equivalent to cancelling through a [`CancelHandle`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel this session from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel.clone())
    }

    /// True once the session has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for StreamSession {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SessionEvent>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            this.events = None;
            return Poll::Ready(None);
        }
        let Some(events) = this.events.as_mut() else {
            return Poll::Ready(None);
        };
        match events.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.events = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

///////////////////////////////////////////// Exchange ////////////////////////////////////////////

struct Exchange {
    phase: Phase,
    pending: VecDeque<SessionEvent>,
    cancel: CancellationToken,
    started: Instant,
    deadline: Instant,
    options: SessionOptions,
    logger: Option<Arc<dyn ClientLogger>>,
}

enum Phase {
    Connect(Connect),
    Read(Reader),
    Done,
}

struct Connect {
    http: reqwest::Client,
    spec: RequestSpec,
}

struct Reader {
    lines: LineStream,
    accumulated: String,
    saw_fragment: bool,
    pace: bool,
}

impl Reader {
    fn new(lines: LineStream) -> Self {
        Self {
            lines,
            accumulated: String::new(),
            saw_fragment: false,
            pace: false,
        }
    }
}

enum Wait<T> {
    Ready(T),
    Cancelled,
    TimedOut,
}

async fn wait<F: Future>(cancel: &CancellationToken, deadline: Instant, fut: F) -> Wait<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Wait::Cancelled,
        _ = tokio::time::sleep_until(deadline) => Wait::TimedOut,
        output = fut => Wait::Ready(output),
    }
}

impl Exchange {
    async fn step(mut self) -> Option<(SessionEvent, Self)> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some(event) = self.pending.pop_front() {
                return Some((event, self));
            }
            self.phase = match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Connect(connect) => self.connect(connect).await,
                Phase::Read(reader) => self.read(reader).await,
                Phase::Done => return None,
            };
        }
    }

    async fn connect(&mut self, Connect { http, spec }: Connect) -> Phase {
        let url = match spec.completions_url() {
            Ok(url) => url,
            Err(err) => return self.fail(err),
        };
        let request =
            ChatCompletionRequest::single_turn(&spec.model, &spec.user_text, spec.streaming);
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        CLIENT_REQUESTS.click();
        let send = http
            .post(url)
            .headers(request_headers(spec.streaming))
            .bearer_auth(&spec.api_key)
            .json(&request)
            .send();
        let response = match wait(&self.cancel, self.deadline, send).await {
            Wait::Ready(Ok(response)) => response,
            Wait::Ready(Err(err)) => return self.fail(request_error(err, self.options.timeout)),
            Wait::Cancelled => return self.cancelled(),
            Wait::TimedOut => return self.timed_out(),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = match wait(&self.cancel, self.deadline, response.text()).await {
                Wait::Ready(body) => body.unwrap_or_default(),
                Wait::Cancelled => return self.cancelled(),
                Wait::TimedOut => return self.timed_out(),
            };
            return self.fail(Error::server(status.as_u16(), body.trim()));
        }

        if spec.streaming {
            let bytes: ByteStream = Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(transport_io_error)),
            );
            return Phase::Read(Reader::new(sse::lines(bytes)));
        }

        let body = match wait(&self.cancel, self.deadline, response.bytes()).await {
            Wait::Ready(Ok(body)) => body,
            Wait::Ready(Err(err)) => return self.fail(request_error(err, self.options.timeout)),
            Wait::Cancelled => return self.cancelled(),
            Wait::TimedOut => return self.timed_out(),
        };
        match serde_json::from_slice::<ChatCompletionResponse>(&body) {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(&response);
                }
                let text = response
                    .first_content()
                    .map(sanitize::clean)
                    .unwrap_or_else(|| NO_RESPONSE.to_string());
                CLIENT_REQUEST_DURATION.add(self.started.elapsed().as_secs_f64());
                self.pending.push_back(SessionEvent::Settled(text));
                Phase::Done
            }
            Err(err) => self.fail(Error::decoding(
                format!("Failed to parse response: {err}"),
                Some(Box::new(err)),
            )),
        }
    }

    async fn read(&mut self, mut reader: Reader) -> Phase {
        if reader.pace && !self.options.pacing.is_zero() {
            let pause = tokio::time::sleep(self.options.pacing);
            match wait(&self.cancel, self.deadline, pause).await {
                Wait::Ready(()) => {}
                Wait::Cancelled => return self.cancelled(),
                Wait::TimedOut => return self.timed_out(),
            }
        }
        reader.pace = false;

        let line = match wait(&self.cancel, self.deadline, reader.lines.next()).await {
            Wait::Ready(Some(Ok(line))) => line,
            Wait::Ready(Some(Err(err))) => return self.fail(line_error(err, self.options.timeout)),
            Wait::Ready(None) => return self.settle(reader),
            Wait::Cancelled => return self.cancelled(),
            Wait::TimedOut => return self.timed_out(),
        };
        STREAM_LINES.click();

        let Some(delta) = sse::parse_line(&line) else {
            STREAM_SKIPPED_LINES.click();
            return Phase::Read(reader);
        };
        if let Some(logger) = &self.logger {
            logger.log_stream_delta(&delta);
        }
        if delta.is_terminal {
            return self.settle(reader);
        }
        if let Some(fragment) = delta.content {
            if !reader.saw_fragment {
                reader.saw_fragment = true;
                STREAM_TTFT.add(self.started.elapsed().as_secs_f64());
                self.pending.push_back(SessionEvent::FirstToken);
            }
            reader.accumulated.push_str(&fragment);
            STREAM_DELTAS.click();
            self.pending
                .push_back(SessionEvent::Delta(sanitize::clean(&reader.accumulated)));
            reader.pace = true;
        }
        Phase::Read(reader)
    }

    fn settle(&mut self, reader: Reader) -> Phase {
        let text = sanitize::clean(&reader.accumulated);
        if let Some(logger) = &self.logger {
            logger.log_stream_text(&text);
        }
        STREAM_DURATION.add(self.started.elapsed().as_secs_f64());
        self.pending.push_back(SessionEvent::Finished(text));
        Phase::Done
    }

    fn fail(&mut self, err: Error) -> Phase {
        if matches!(err, Error::Streaming { .. } | Error::Encoding { .. }) {
            STREAM_ERRORS.click();
        } else {
            CLIENT_REQUEST_ERRORS.click();
        }
        self.pending.push_back(SessionEvent::Failed(err));
        Phase::Done
    }

    fn cancelled(&mut self) -> Phase {
        STREAM_CANCELLATIONS.click();
        self.pending.clear();
        Phase::Done
    }

    fn timed_out(&mut self) -> Phase {
        let timeout = self.options.timeout;
        self.fail(Error::timeout(
            "session exceeded its deadline",
            Some(timeout.as_secs_f64()),
        ))
    }
}

fn request_headers(streaming: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    let accept = if streaming {
        "text/event-stream"
    } else {
        "application/json"
    };
    headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
    headers
}

pub(crate) fn request_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::timeout(
            format!("Request timed out: {err}"),
            Some(timeout.as_secs_f64()),
        )
    } else if err.is_connect() {
        Error::connection(format!("Connection error: {err}"), Some(Box::new(err)))
    } else {
        Error::http_client(format!("Request failed: {err}"), Some(Box::new(err)))
    }
}

fn transport_io_error(err: reqwest::Error) -> io::Error {
    if err.is_timeout() {
        io::Error::new(io::ErrorKind::TimedOut, err)
    } else {
        io::Error::other(err)
    }
}

fn line_error(err: LinesCodecError, timeout: Duration) -> Error {
    match err {
        LinesCodecError::Io(err) if err.kind() == io::ErrorKind::TimedOut => Error::timeout(
            format!("Response stream timed out: {err}"),
            Some(timeout.as_secs_f64()),
        ),
        LinesCodecError::Io(err) if err.kind() == io::ErrorKind::InvalidData => {
            Error::encoding(format!("Invalid UTF-8 in stream: {err}"), Some(Box::new(err)))
        }
        LinesCodecError::Io(err) => {
            Error::streaming(format!("Error in HTTP stream: {err}"), Some(Box::new(err)))
        }
        LinesCodecError::MaxLineLengthExceeded => {
            Error::streaming("Line in HTTP stream exceeds the maximum length", None)
        }
    }
}
