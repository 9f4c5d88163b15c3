//! Shared helpers for mikro-client integration tests.
//!
//! Import with `mod common; use common::*;` at the top of each test file.

#![allow(dead_code)]

pub mod fake_api;

use std::time::Duration;

use mikro_client::{ApiClient, Session, SharedSession, StreamError};
use tokio::sync::mpsc;

pub use fake_api::{DEPLOYMENT_LOG_LINES, FakeMikroApi, LiveLog, PASSWORD, TOKEN};

/// How long a test waits for a single event before failing.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client with no session.
pub fn anonymous_client(api: &FakeMikroApi) -> ApiClient {
    ApiClient::with_base_url(&api.base_url(), SharedSession::new()).expect("client")
}

/// Client already holding the token the fake server accepts.
pub fn authed_client(api: &FakeMikroApi) -> ApiClient {
    let session = SharedSession::with_session(Session::from_token(TOKEN));
    ApiClient::with_base_url(&api.base_url(), session).expect("client")
}

/// Channels collecting everything a log stream reports.
pub struct Collected {
    pub lines: mpsc::UnboundedReceiver<String>,
    pub errors: mpsc::UnboundedReceiver<StreamError>,
}

/// Callbacks that forward into a [`Collected`].
pub fn collectors() -> (
    impl FnMut(String) + Send + 'static,
    impl FnOnce(StreamError) + Send + 'static,
    Collected,
) {
    let (line_tx, lines) = mpsc::unbounded_channel();
    let (error_tx, errors) = mpsc::unbounded_channel();
    let on_line = move |line: String| {
        let _ = line_tx.send(line);
    };
    let on_error = move |err: StreamError| {
        let _ = error_tx.send(err);
    };
    (on_line, on_error, Collected { lines, errors })
}

impl Collected {
    /// Wait for the next delivered line.
    pub async fn next_line(&mut self) -> String {
        tokio::time::timeout(EVENT_TIMEOUT, self.lines.recv())
            .await
            .expect("timed out waiting for a log line")
            .expect("line channel closed")
    }

    /// Every line delivered so far, without waiting.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = self.lines.try_recv() {
            out.push(line);
        }
        out
    }

    /// Every error delivered so far, without waiting.
    pub fn drain_errors(&mut self) -> Vec<StreamError> {
        let mut out = Vec::new();
        while let Ok(err) = self.errors.try_recv() {
            out.push(err);
        }
        out
    }
}
