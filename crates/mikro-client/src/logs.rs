//! Streaming log reader.
//!
//! Opens a long-lived GET against a log endpoint and hands every non-empty
//! line to a callback as soon as it arrives. The stream is owned by a
//! background task and controlled through the returned [`StreamHandle`].
//!
//! ```text
//! Idle ──► Streaming ──► Completed   (end of body)
//!              │    └──► Failed      (status / network / body error)
//!              └───────► Cancelled   (caller, always wins)
//! ```
//!
//! Lines split across network chunks are reassembled before delivery, and
//! multi-byte UTF-8 sequences split across chunks decode correctly.

use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parking_lot::{Mutex, ReentrantMutex};
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::client::error_message;
use crate::config::ClientConfig;
use crate::error::{ClientError, StreamError};

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// `err` followed by every error in its source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A read that failed after the response was accepted: the connection broke.
fn read_error(err: reqwest::Error) -> StreamError {
    StreamError::Network(error_chain(&err))
}

// ============================================================================
// Line decoding
// ============================================================================

/// Incremental bytes-to-lines decoder.
///
/// Keeps two pieces of state between chunks: the bytes of an unfinished
/// UTF-8 sequence and the text after the last line feed.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    remainder: String,
}

impl LineDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk and return the lines it completed.
    ///
    /// Whitespace-only lines are dropped and a trailing `\r` is stripped.
    pub fn decode_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        self.remainder.push_str(&text);

        let Some(last_newline) = self.remainder.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.remainder.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.remainder, rest);

        complete.split('\n').filter_map(clean_line).collect()
    }

    /// Flush whatever is left once the stream has ended.
    ///
    /// An unfinished UTF-8 sequence decodes to U+FFFD.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.remainder.push_str(&String::from_utf8_lossy(&pending));
        }
        let last = std::mem::take(&mut self.remainder);
        clean_line(&last)
    }

    /// Bytes of the current unfinished line, for diagnostics.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.pending.len() + self.remainder.len()
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = input.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    if let Some(invalid_len) = e.error_len() {
                        out.push(char::REPLACEMENT_CHARACTER);
                        input = &tail[invalid_len..];
                    } else {
                        // Incomplete sequence at the end: wait for the next chunk.
                        self.pending = tail.to_vec();
                        break;
                    }
                }
            }
        }
        out
    }
}

fn clean_line(segment: &str) -> Option<String> {
    let line = segment.strip_suffix('\r').unwrap_or(segment);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

// ============================================================================
// Read loop
// ============================================================================

/// How a log stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The server closed the body.
    Completed,
    /// The caller cancelled the stream.
    Cancelled,
    /// The stream failed; the error was handed to the error callback.
    Failed(StreamError),
}

/// Cancellation flag shared by a read loop and everything that can stop it.
///
/// Callbacks run through [`CancelGate::deliver`], under a lock that
/// [`CancelGate::cancel`] also takes. Once `cancel` returns, no callback is
/// running and none will start. The lock is reentrant, so a callback may
/// cancel its own stream.
#[derive(Debug, Clone, Default)]
pub struct CancelGate {
    token: CancellationToken,
    delivery: Arc<ReentrantMutex<()>>,
}

impl CancelGate {
    /// A gate that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation, waiting for a callback running on another
    /// thread to return first.
    pub fn cancel(&self) {
        let _delivery = self.delivery.lock();
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Run `callback` unless cancelled. Returns whether it ran.
    pub fn deliver<F: FnOnce()>(&self, callback: F) -> bool {
        let _delivery = self.delivery.lock();
        if self.token.is_cancelled() {
            return false;
        }
        callback();
        true
    }
}

/// Drive `stream` to the end, calling `on_line` for every decoded line.
///
/// Every line goes through `gate`, so nothing is delivered once
/// cancellation has been requested. Never returns
/// [`StreamOutcome::Failed`] after cancellation.
pub async fn pump_lines<S, E, F>(stream: S, gate: &CancelGate, mut on_line: F) -> StreamOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<StreamError>,
    F: FnMut(String),
{
    let mut decoder = LineDecoder::new();
    let mut chunks = 0_usize;
    futures::pin_mut!(stream);

    loop {
        let next = tokio::select! {
            biased;
            () = gate.cancelled() => return StreamOutcome::Cancelled,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                chunks += 1;
                trace!(chunk = chunks, bytes = chunk.len(), "log chunk received");
                for line in decoder.decode_chunk(&chunk) {
                    if !gate.deliver(|| on_line(line)) {
                        return StreamOutcome::Cancelled;
                    }
                }
            }
            Some(Err(e)) => {
                if gate.is_cancelled() {
                    return StreamOutcome::Cancelled;
                }
                return StreamOutcome::Failed(e.into());
            }
            None => {
                if let Some(line) = decoder.finish() {
                    if !gate.deliver(|| on_line(line)) {
                        return StreamOutcome::Cancelled;
                    }
                }
                debug!(chunks, "log stream reached end of body");
                return StreamOutcome::Completed;
            }
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Observable state of a log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Request not yet answered.
    Idle,
    /// Response accepted, body being read.
    Streaming,
    /// Body ended normally.
    Completed,
    /// Cancelled by the caller.
    Cancelled,
    /// Failed with a transport error.
    Failed,
}

impl StreamState {
    /// Whether no further transitions can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Streaming => write!(f, "streaming"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug)]
struct Shared {
    gate: CancelGate,
    state: Mutex<StreamState>,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: CancelGate::new(),
            state: Mutex::new(StreamState::Idle),
        })
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            *state = StreamState::Cancelled;
        }
        drop(state);
        self.gate.cancel();
    }

    fn set_streaming(&self) {
        let mut state = self.state.lock();
        if *state == StreamState::Idle {
            *state = StreamState::Streaming;
        }
    }

    fn settle(&self, outcome: &StreamOutcome) {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return;
        }
        *state = match outcome {
            StreamOutcome::Completed => StreamState::Completed,
            StreamOutcome::Cancelled => StreamState::Cancelled,
            StreamOutcome::Failed(_) => StreamState::Failed,
        };
    }
}

/// Cloneable cancellation capability for a running stream.
#[derive(Debug, Clone)]
pub struct StreamCanceller {
    shared: Arc<Shared>,
}

impl StreamCanceller {
    /// Cancel the stream. Calls after the first have no effect.
    ///
    /// No line or error callback fires after this returns.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.gate.is_cancelled()
    }
}

/// Caller-held handle of a running log stream.
///
/// Dropping the handle cancels the stream; use [`StreamHandle::join`] to wait
/// for it instead.
#[derive(Debug)]
pub struct StreamHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<StreamOutcome>>,
}

impl StreamHandle {
    /// Abort the underlying request. Idempotent.
    ///
    /// No line or error callback fires after this returns. A callback
    /// running on another thread is allowed to finish first.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.gate.is_cancelled()
    }

    /// Current state of the stream.
    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.shared.state.lock()
    }

    /// A cancel-only handle that can be moved elsewhere, e.g. into a
    /// Ctrl-C handler.
    #[must_use]
    pub fn canceller(&self) -> StreamCanceller {
        StreamCanceller {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Wait for the read loop to finish and return how it ended.
    pub async fn join(mut self) -> StreamOutcome {
        let Some(task) = self.task.take() else {
            return StreamOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => StreamOutcome::Cancelled,
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.shared.cancel();
        }
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Target of a log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamRequest {
    /// Fully-qualified log URL including the `follow` flag.
    pub url: Url,
    /// `Authorization` header value, if any.
    pub authorization: Option<String>,
}

impl LogStreamRequest {
    /// Request for the log resource at `url`, with `follow` set as a query
    /// flag (replacing any existing one).
    #[must_use]
    pub fn new(mut url: Url, follow: bool) -> Self {
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "follow")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (k, v) in &retained {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("follow", if follow { "true" } else { "false" });
        }
        Self {
            url,
            authorization: None,
        }
    }

    /// Attach an `Authorization` header value.
    #[must_use]
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Whether the `follow` flag is set.
    #[must_use]
    pub fn follow(&self) -> bool {
        self.url
            .query_pairs()
            .any(|(k, v)| k == "follow" && v == "true")
    }
}

/// Starts log streams over HTTP.
///
/// Uses its own HTTP client with no overall request timeout, so followed
/// streams can stay open indefinitely.
#[derive(Debug, Clone)]
pub struct LogStreamReader {
    http: reqwest::Client,
}

impl LogStreamReader {
    /// Reader configured from `config` (connect timeout and user agent).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http })
    }

    /// Reader using an existing HTTP client.
    #[must_use]
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Start streaming `request` on the current tokio runtime.
    ///
    /// `on_line` runs on the stream's task for every non-empty line, in
    /// order. `on_error` runs at most once, never after cancellation.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start<L, E>(&self, request: LogStreamRequest, on_line: L, on_error: E) -> StreamHandle
    where
        L: FnMut(String) + Send + 'static,
        E: FnOnce(StreamError) + Send + 'static,
    {
        let shared = Shared::new();
        let task_shared = Arc::clone(&shared);
        let http = self.http.clone();

        debug!(url = %request.url, follow = request.follow(), "starting log stream");
        let task = tokio::spawn(async move {
            let outcome = match run_stream(&http, request, &task_shared, on_line).await {
                StreamOutcome::Failed(err) => {
                    let failed = StreamOutcome::Failed(err.clone());
                    let reported = task_shared.gate.deliver(|| {
                        task_shared.settle(&failed);
                        warn!(error = %err, "log stream failed");
                        on_error(err);
                    });
                    if reported { failed } else { StreamOutcome::Cancelled }
                }
                other => other,
            };
            task_shared.settle(&outcome);
            outcome
        });

        StreamHandle {
            shared,
            task: Some(task),
        }
    }
}

async fn run_stream<L>(
    http: &reqwest::Client,
    request: LogStreamRequest,
    shared: &Shared,
    on_line: L,
) -> StreamOutcome
where
    L: FnMut(String),
{
    let gate = &shared.gate;
    let mut builder = http.get(request.url.clone());
    if let Some(auth) = &request.authorization {
        builder = builder.header(reqwest::header::AUTHORIZATION, auth);
    }

    let response = tokio::select! {
        biased;
        () = gate.cancelled() => return StreamOutcome::Cancelled,
        response = builder.send() => response,
    };
    let response = match response {
        Ok(response) => response,
        Err(e) => return StreamOutcome::Failed(StreamError::Network(error_chain(&e))),
    };

    let status = response.status();
    if !status.is_success() {
        let body = tokio::select! {
            biased;
            () = gate.cancelled() => return StreamOutcome::Cancelled,
            body = response.text() => body.unwrap_or_default(),
        };
        return StreamOutcome::Failed(StreamError::Transport {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
        return StreamOutcome::Failed(StreamError::BodyUnreadable(format!(
            "server answered {status} without a body"
        )));
    }

    shared.set_streaming();
    debug!(url = %request.url, %status, "log stream open");
    let body = response.bytes_stream().map(|chunk| chunk.map_err(read_error));
    pump_lines(body, gate, on_line).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::stream;
    use proptest::prelude::*;
    use test_case::test_case;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, StreamError>> {
        let items: Vec<Result<Bytes, StreamError>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(items)
    }

    // =========================================================================
    // LineDecoder
    // =========================================================================

    #[test]
    fn decoder_splits_complete_lines() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode_chunk(b"one\ntwo\nthree\n");
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_carries_partial_line() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.decode_chunk(b"hel"), Vec::<String>::new());
        assert_eq!(decoder.decode_chunk(b"lo wor"), Vec::<String>::new());
        assert_eq!(decoder.decode_chunk(b"ld\nnext"), vec!["hello world"]);
        assert_eq!(decoder.buffered_len(), 4);
        assert_eq!(decoder.finish().as_deref(), Some("next"));
    }

    #[test]
    fn decoder_joins_multibyte_char_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.decode_chunk(b"hello \xE2\x98").is_empty());
        let lines = decoder.decode_chunk(b"\x83 world\n");
        assert_eq!(lines, vec!["hello \u{2603} world"]);
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode_chunk(b"bad \xFF byte\n");
        assert_eq!(lines, vec!["bad \u{FFFD} byte"]);
    }

    #[test]
    fn decoder_flushes_truncated_sequence_lossily() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.decode_chunk(b"tail \xE2\x98").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail \u{FFFD}"));
    }

    #[test_case(b"\n\n\n" ; "only newlines")]
    #[test_case(b"   \n\t\n" ; "whitespace lines")]
    #[test_case(b"\r\n\r\n" ; "crlf blank lines")]
    fn decoder_skips_blank_lines(input: &[u8]) {
        let mut decoder = LineDecoder::new();
        assert!(decoder.decode_chunk(input).is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_strips_carriage_return() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.decode_chunk(b"a\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn decoder_keeps_inner_whitespace() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.decode_chunk(b"  indented  \n"), vec!["  indented  "]);
    }

    proptest! {
        #[test]
        fn decoder_output_independent_of_chunking(
            lines in proptest::collection::vec("[a-z\u{e9}\u{2603} ]{0,12}", 0..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
        ) {
            let text = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
            let bytes = text.as_bytes();

            let mut positions: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            positions.sort_unstable();
            positions.dedup();

            let mut decoder = LineDecoder::new();
            let mut got = Vec::new();
            let mut start = 0;
            for pos in positions {
                got.extend(decoder.decode_chunk(&bytes[start..pos]));
                start = pos;
            }
            got.extend(decoder.decode_chunk(&bytes[start..]));
            got.extend(decoder.finish());

            let expected: Vec<String> = lines
                .iter()
                .filter(|l| !l.trim().is_empty())
                .cloned()
                .collect();
            prop_assert_eq!(got, expected);
        }
    }

    // =========================================================================
    // pump_lines
    // =========================================================================

    #[tokio::test]
    async fn pump_delivers_every_line_in_order() {
        let gate = CancelGate::new();
        let mut got = Vec::new();
        let outcome = pump_lines(
            chunks(&["first\nsec", "ond\n", "\n", "third"]),
            &gate,
            |line| got.push(line),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(got, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn pump_reports_read_error() {
        let gate = CancelGate::new();
        let items: Vec<Result<Bytes, StreamError>> = vec![
            Ok(Bytes::from_static(b"ok\n")),
            Err(StreamError::Network("reset by peer".to_string())),
            Ok(Bytes::from_static(b"never\n")),
        ];
        let mut got = Vec::new();
        let outcome = pump_lines(stream::iter(items), &gate, |line| got.push(line)).await;

        assert_eq!(
            outcome,
            StreamOutcome::Failed(StreamError::Network("reset by peer".to_string()))
        );
        assert_eq!(got, vec!["ok"]);
    }

    #[tokio::test]
    async fn pump_cancelled_before_data_delivers_nothing() {
        let gate = CancelGate::new();
        gate.cancel();
        let mut calls = 0;
        let outcome = pump_lines(chunks(&["a\nb\n"]), &gate, |_| calls += 1).await;

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn pump_cancel_inside_callback_stops_remaining_lines() {
        let gate = CancelGate::new();
        let inner = gate.clone();
        let mut got = Vec::new();
        let outcome = pump_lines(chunks(&["one\ntwo\nthree\n"]), &gate, |line| {
            got.push(line);
            inner.cancel();
        })
        .await;

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(got, vec!["one"]);
    }

    #[tokio::test]
    async fn pump_cancel_while_waiting_for_data() {
        let (tx, rx) = mpsc::unbounded::<Result<Bytes, StreamError>>();
        let gate = CancelGate::new();
        let lines = Arc::new(Mutex::new(Vec::new()));

        tx.unbounded_send(Ok(Bytes::from_static(b"before\n")))
            .expect("send");

        let pump_gate = gate.clone();
        let pump_lines_seen = Arc::clone(&lines);
        let task = tokio::spawn(async move {
            pump_lines(rx, &pump_gate, move |line| pump_lines_seen.lock().push(line)).await
        });

        tokio::task::yield_now().await;
        while lines.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        gate.cancel();
        let _ = tx.unbounded_send(Ok(Bytes::from_static(b"after\n")));

        let outcome = task.await.expect("join");
        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(*lines.lock(), vec!["before".to_string()]);
    }

    #[tokio::test]
    async fn pump_error_after_cancel_is_swallowed() {
        let gate = CancelGate::new();
        let inner = gate.clone();
        let items: Vec<Result<Bytes, StreamError>> = vec![
            Ok(Bytes::from_static(b"last\n")),
            Err(StreamError::Network("aborted".to_string())),
        ];
        let outcome = pump_lines(stream::iter(items), &gate, |_| inner.cancel()).await;
        assert_eq!(outcome, StreamOutcome::Cancelled);
    }

    // =========================================================================
    // Request and state
    // =========================================================================

    #[test_case(true, "follow=true" ; "follow on")]
    #[test_case(false, "follow=false" ; "follow off")]
    fn request_sets_follow_flag(follow: bool, expected: &str) {
        let url = Url::parse("http://localhost:3000/api/projects/p/databases/d/logs")
            .expect("url");
        let request = LogStreamRequest::new(url, follow);
        assert_eq!(request.url.query(), Some(expected));
        assert_eq!(request.follow(), follow);
    }

    #[test]
    fn request_replaces_existing_follow_flag() {
        let url = Url::parse("http://h/api/logs?tail=100&follow=false").expect("url");
        let request = LogStreamRequest::new(url, true).with_authorization("Bearer t");
        assert_eq!(request.url.query(), Some("tail=100&follow=true"));
        assert_eq!(request.authorization.as_deref(), Some("Bearer t"));
    }

    #[test]
    fn state_terminality() {
        assert!(!StreamState::Idle.is_terminal());
        assert!(!StreamState::Streaming.is_terminal());
        assert!(StreamState::Completed.is_terminal());
        assert!(StreamState::Cancelled.is_terminal());
        assert!(StreamState::Failed.is_terminal());
        assert_eq!(StreamState::Streaming.to_string(), "streaming");
    }

    #[test]
    fn cancel_does_not_overwrite_terminal_state() {
        let shared = Shared::new();
        shared.set_streaming();
        shared.settle(&StreamOutcome::Completed);
        shared.cancel();
        assert_eq!(*shared.state.lock(), StreamState::Completed);
        assert!(shared.gate.is_cancelled());
    }

    #[test]
    fn settle_keeps_cancelled() {
        let shared = Shared::new();
        shared.set_streaming();
        shared.cancel();
        shared.settle(&StreamOutcome::Completed);
        assert_eq!(*shared.state.lock(), StreamState::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_waits_for_the_running_callback() {
        let gate = CancelGate::new();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let pump_gate = gate.clone();
        let seen = Arc::clone(&delivered);
        let task = tokio::spawn(async move {
            pump_lines(chunks(&["one\ntwo\nthree\n"]), &pump_gate, move |line| {
                let _ = entered_tx.send(());
                std::thread::sleep(std::time::Duration::from_millis(50));
                seen.lock().push(line);
            })
            .await
        });

        let canceller = gate.clone();
        let seen = Arc::clone(&delivered);
        let at_cancel = tokio::task::spawn_blocking(move || {
            entered_rx.recv().expect("callback entered");
            canceller.cancel();
            seen.lock().clone()
        })
        .await
        .expect("join");

        // The in-flight line finished before cancel returned, and nothing followed.
        assert_eq!(at_cancel, vec!["one".to_string()]);
        assert_eq!(task.await.expect("join"), StreamOutcome::Cancelled);
        assert_eq!(*delivered.lock(), vec!["one".to_string()]);
    }

    #[test]
    fn gate_skips_callbacks_after_cancel() {
        let gate = CancelGate::new();
        let mut calls = 0;
        assert!(gate.deliver(|| calls += 1));
        assert!(gate.deliver(|| gate.cancel()));
        assert!(!gate.deliver(|| calls += 1));
        assert_eq!(calls, 1);
        assert!(gate.is_cancelled());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("error decoding response body")]
    struct BodyFailure(#[source] std::io::Error);

    #[test]
    fn error_chain_includes_sources() {
        let err = BodyFailure(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert_eq!(
            error_chain(&err),
            "error decoding response body: connection reset by peer"
        );
    }

    #[test]
    fn reqwest_free_error_conversion() {
        let err: StreamError = std::io::Error::other("boom").into();
        assert_eq!(err, StreamError::Network("boom".to_string()));
    }
}
