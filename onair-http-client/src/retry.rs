//! Retrying operations and the retrying client decorator.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::until_cancelled;
use crate::{
    BackoffPolicy, Body, Client, HttpClient, HttpClientConfig, HttpClientError, Request,
    RequestHead, Response, Result,
};

/// Run `operation` until it succeeds or `policy` says to stop.
///
/// The policy is reset first. After each failure the policy is asked for the
/// next delay; `None` ends the loop with that failure. Permanent errors (see
/// [`HttpClientError::is_permanent`]) end it immediately. If `cancellation`
/// fires while waiting, no further attempt is made and
/// [`HttpClientError::Cancelled`] is returned.
pub async fn retry<P, F, Fut, T>(
    policy: &mut P,
    cancellation: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    P: BackoffPolicy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.reset();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if error.is_permanent() {
            return Err(error);
        }

        let Some(delay) = policy.next_backoff() else {
            debug!(attempts = attempt, error = %error, "Giving up on request");
            return Err(error);
        };

        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying request"
        );

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(HttpClientError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Client decorator that retries failed calls according to a backoff policy.
///
/// The request body is buffered once and replayed byte-for-byte on every
/// attempt. The policy is cloned for each call, so one `RetryClient` can
/// serve concurrent callers.
///
/// ```rust,no_run
/// use onair_http_client::prelude::*;
/// use std::time::Duration;
///
/// # async fn run() -> onair_http_client::Result<()> {
/// let policy = ExponentialBackoff::new(Duration::from_millis(100)).with_max_retries(3);
/// let client = RetryClient::from_config(policy, HttpClientConfig::default())?;
///
/// let request = Request::parse(Method::GET, "https://api.example.com/on-air")?;
/// let status: serde_json::Value = client.execute_json(request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryClient<C, P> {
    inner: C,
    policy: P,
}

impl<C, P> RetryClient<C, P>
where
    C: Client,
    P: BackoffPolicy + Clone,
{
    /// Wrap `inner` with `policy`.
    pub fn new(inner: C, policy: P) -> Self {
        Self { inner, policy }
    }

    /// Get the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get the policy template cloned for each call.
    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<P: BackoffPolicy + Clone> RetryClient<HttpClient, P> {
    /// Build an [`HttpClient`] from `config` and wrap it with `policy`.
    pub fn from_config(policy: P, config: HttpClientConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::new(config)?, policy))
    }
}

fn attempt_request(head: &RequestHead, body: &Bytes) -> Request {
    let body = if body.is_empty() {
        Body::empty()
    } else {
        Body::from(body.clone())
    };
    Request::from_parts(head.clone(), body)
}

#[async_trait]
impl<C, P> Client for RetryClient<C, P>
where
    C: Client,
    P: BackoffPolicy + Clone,
{
    async fn execute(&self, request: Request) -> Result<Response> {
        let cancellation = request.context().cancellation().clone();
        let (head, body) = until_cancelled(&cancellation, request.into_buffered()).await?;
        let mut policy = self.policy.clone();

        retry(&mut policy, &cancellation, || {
            self.inner.execute(attempt_request(&head, &body))
        })
        .await
    }

    async fn execute_json<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned + Send,
        Self: Sized,
    {
        let cancellation = request.context().cancellation().clone();
        let (head, body) = until_cancelled(&cancellation, request.into_buffered()).await?;
        let mut policy = self.policy.clone();

        retry(&mut policy, &cancellation, || {
            self.inner.execute_json::<T>(attempt_request(&head, &body))
        })
        .await
    }
}
