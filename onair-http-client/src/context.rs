//! Request-scoped metadata.
//!
//! A [`RequestContext`] travels with every [`Request`](crate::Request). It
//! owns the request's cancellation token and a small bag of caller metadata
//! (user id, request id, trace id, ...). Accessors fail with
//! [`HttpClientError::MissingContext`] instead of returning an empty value.

use http::{HeaderMap, HeaderName, HeaderValue};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::{HttpClientError, Result};

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Header carrying the caller id.
pub const CALLER_ID_HEADER: &str = "x-caller-id";
/// Header carrying the forwarded-for chain.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Header carrying the trace context.
pub const TRACE_ID_HEADER: &str = "x-cloud-trace-context";

/// Metadata and cancellation for a single logical request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
    user_id: Option<String>,
    request_id: Option<String>,
    caller_id: Option<String>,
    forwarded_for: Option<String>,
    ip_address: Option<String>,
    trace_id: Option<String>,
}

impl RequestContext {
    /// Create an empty context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create an empty context bound to an existing cancellation token.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            user_id: None,
            request_id: None,
            caller_id: None,
            forwarded_for: None,
            ip_address: None,
            trace_id: None,
        }
    }

    /// Get the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Check if the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Set the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the caller id.
    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    /// Set the forwarded-for chain.
    pub fn with_forwarded_for(mut self, forwarded_for: impl Into<String>) -> Self {
        self.forwarded_for = Some(forwarded_for.into());
        self
    }

    /// Set the caller's IP address.
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Set the trace id.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Get the user id.
    pub fn user_id(&self) -> Result<&str> {
        required(&self.user_id, "userID")
    }

    /// Get the request id.
    pub fn request_id(&self) -> Result<&str> {
        required(&self.request_id, "requestID")
    }

    /// Get the caller id.
    pub fn caller_id(&self) -> Result<&str> {
        required(&self.caller_id, "callerID")
    }

    /// Get the forwarded-for chain.
    pub fn forwarded_for(&self) -> Result<&str> {
        required(&self.forwarded_for, "forwardedFor")
    }

    /// Get the caller's IP address.
    pub fn ip_address(&self) -> Result<&str> {
        required(&self.ip_address, "ipAddress")
    }

    /// Get the trace id.
    pub fn trace_id(&self) -> Result<&str> {
        required(&self.trace_id, "traceID")
    }

    /// Copy the propagated values into `headers`.
    ///
    /// Headers already present are left untouched, as are values that are not
    /// valid header values.
    pub fn propagate(&self, headers: &mut HeaderMap) {
        let values = [
            (REQUEST_ID_HEADER, &self.request_id),
            (CALLER_ID_HEADER, &self.caller_id),
            (FORWARDED_FOR_HEADER, &self.forwarded_for),
            (TRACE_ID_HEADER, &self.trace_id),
        ];

        for (name, value) in values {
            let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            let name = HeaderName::from_static(name);
            if headers.contains_key(&name) {
                continue;
            }
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive `future` to completion unless `cancellation` fires first.
pub(crate) async fn until_cancelled<F, T>(cancellation: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(HttpClientError::Cancelled),
        result = future => result,
    }
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(HttpClientError::MissingContext(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_values_fail() {
        let ctx = RequestContext::new();
        assert!(matches!(
            ctx.user_id(),
            Err(HttpClientError::MissingContext("userID"))
        ));
        assert!(ctx.trace_id().is_err());
    }

    #[test]
    fn test_empty_value_is_missing() {
        let ctx = RequestContext::new().with_user_id("");
        assert!(ctx.user_id().is_err());
    }

    #[test]
    fn test_values_round_trip() {
        let ctx = RequestContext::new()
            .with_user_id("user-1")
            .with_request_id("req-1")
            .with_ip_address("10.0.0.1");
        assert_eq!(ctx.user_id().unwrap(), "user-1");
        assert_eq!(ctx.request_id().unwrap(), "req-1");
        assert_eq!(ctx.ip_address().unwrap(), "10.0.0.1");
    }

    #[test]
    fn test_propagate_skips_existing_headers() {
        let ctx = RequestContext::new()
            .with_request_id("req-1")
            .with_trace_id("trace/1;o=1")
            .with_user_id("never-propagated");

        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("caller-trace"));
        ctx.propagate(&mut headers);

        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req-1");
        assert_eq!(headers.get(TRACE_ID_HEADER).unwrap(), "caller-trace");
        assert!(headers.get(CALLER_ID_HEADER).is_none());
        assert_eq!(headers.len(), 2);
    }

    #[tokio::test]
    async fn test_until_cancelled_passes_result_through() {
        let token = CancellationToken::new();
        let value = until_cancelled(&token, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_until_cancelled_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = until_cancelled(&token, async { Ok(7) }).await;
        assert!(matches!(result, Err(HttpClientError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_cancelled_aborts_pending_future() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let result: Result<()> = until_cancelled(&token, std::future::pending()).await;
        assert!(matches!(result, Err(HttpClientError::Cancelled)));
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.clone().is_cancelled());
    }
}
