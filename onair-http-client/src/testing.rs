//! Scripted transport and recording observer for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    Body, HttpClientError, Observer, Request, RequestHead, Response, Result, Transport,
};

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub(crate) struct Scripted {
    outcome: Outcome,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
enum Outcome {
    Status(u16, &'static str),
    Fail(&'static str),
    Stalled(u16),
}

impl Scripted {
    pub(crate) fn status(status: u16, body: &'static str) -> Self {
        Self {
            outcome: Outcome::Status(status, body),
            delay: None,
        }
    }

    pub(crate) fn fail(message: &'static str) -> Self {
        Self {
            outcome: Outcome::Fail(message),
            delay: None,
        }
    }

    /// Respond with `status` and a body that never yields a chunk.
    pub(crate) fn stalled(status: u16) -> Self {
        Self {
            outcome: Outcome::Stalled(status),
            delay: None,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Transport that replays a script, repeating the last entry once exhausted,
/// and records the headers and body bytes of every request it receives.
pub(crate) struct StubTransport {
    script: Vec<Scripted>,
    headers: Mutex<Vec<HeaderMap>>,
    bodies: Mutex<Vec<Bytes>>,
}

impl StubTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
        assert!(!script.is_empty(), "script needs at least one outcome");
        Arc::new(Self {
            script,
            headers: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn attempts(&self) -> usize {
        self.bodies.lock().len()
    }

    pub(crate) fn bodies(&self) -> Vec<Bytes> {
        self.bodies.lock().clone()
    }

    pub(crate) fn headers(&self) -> Vec<HeaderMap> {
        self.headers.lock().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let (head, body) = request.into_parts();
        let body = body.collect().await?;

        let index = {
            let mut bodies = self.bodies.lock();
            bodies.push(body);
            self.headers.lock().push(head.headers().clone());
            (bodies.len() - 1).min(self.script.len() - 1)
        };
        let step = self.script[index].clone();

        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }

        match step.outcome {
            Outcome::Status(status, text) => {
                let status = StatusCode::from_u16(status)
                    .map_err(|e| HttpClientError::Transport(e.to_string()))?;
                // Streamed, like a real network body.
                let chunks = stream::iter(vec![Ok(Bytes::from_static(text.as_bytes()))]);
                Ok(Response::new(status, head.url().clone(), Body::from_stream(chunks)))
            }
            Outcome::Stalled(status) => {
                let status = StatusCode::from_u16(status)
                    .map_err(|e| HttpClientError::Transport(e.to_string()))?;
                let chunks = stream::pending::<std::io::Result<Bytes>>();
                Ok(Response::new(status, head.url().clone(), Body::from_stream(chunks)))
            }
            Outcome::Fail(message) => Err(HttpClientError::Transport(message.to_string())),
        }
    }
}

/// Shared log of observer events, recorded as `"<name>:<event>"`.
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub(crate) fn observer(&self, name: &'static str) -> RecordingObserver {
        RecordingObserver {
            name,
            events: self.events.clone(),
        }
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

pub(crate) struct RecordingObserver {
    name: &'static str,
    events: Arc<Mutex<Vec<String>>>,
}

impl Observer for RecordingObserver {
    fn on_request_start(&self, _request: &RequestHead) {
        self.events.lock().push(format!("{}:start", self.name));
    }

    fn on_request_end(&self, _request: &RequestHead, _response: &Response) {
        self.events.lock().push(format!("{}:end", self.name));
    }

    fn on_error(&self, _request: &RequestHead, _error: &HttpClientError) {
        self.events.lock().push(format!("{}:error", self.name));
    }
}
