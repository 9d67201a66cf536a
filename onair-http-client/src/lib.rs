//! # On-Air HTTP Client
//!
//! An HTTP client that classifies responses, notifies pluggable observers and
//! decodes JSON, plus a decorator that retries calls under an injected backoff
//! policy.
//!
//! ## Features
//!
//! - **Status classification**: responses with a status of 300 or above become
//!   an [`HttpError`] carrying the URL, status and drained body
//! - **Observers**: request start, end and error notifications, in
//!   registration order, isolated from the request pipeline
//! - **Retry with Backoff**: [`RetryClient`] replays the buffered request body
//!   on every attempt and leaves the retry decision to a [`BackoffPolicy`]
//! - **Cancellation**: every request carries a cancellation token that aborts
//!   in-flight attempts and pending retries
//! - **Request builders**: JSON and URL-encoded payloads
//! - **Pluggable transport**: anything implementing [`Transport`]; `reqwest` by default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use onair_http_client::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct OnAirStatus {
//!     on_air: bool,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::builder()
//!         .observer(TracingObserver::new())
//!         .build()?;
//!
//!     let request = Request::parse(Method::GET, "https://api.example.com/on-air")?;
//!     let status: OnAirStatus = client.execute_json(request).await?;
//!
//!     println!("On air: {}", status.on_air);
//!     Ok(())
//! }
//! ```
//!
//! ## With Retry
//!
//! ```rust,no_run
//! use onair_http_client::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = ExponentialBackoff::new(Duration::from_millis(100)).with_max_retries(3);
//!     let client = RetryClient::new(HttpClient::new(HttpClientConfig::default())?, policy);
//!
//!     let request = Request::json(
//!         RequestContext::new().with_request_id("req-1"),
//!         Method::PUT,
//!         "https://api.example.com/on-air",
//!         Some(&serde_json::json!({"on_air": true})),
//!     )?;
//!
//!     match client.execute(request).await {
//!         Ok(response) => println!("Status: {}", response.status()),
//!         Err(e) if e.matches(&HttpError::pattern(404, "")) => println!("No such show"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```

mod backoff;
mod body;
mod client;
mod config;
mod context;
mod error;
mod observer;
mod request;
mod response;
mod retry;
mod transport;

#[cfg(test)]
mod testing;

pub use backoff::{
    BackoffPolicy, BackoffPolicyExt, ConstantBackoff, ExponentialBackoff, LinearBackoff,
    StopBackoff, WithMaxRetries, ZeroBackoff,
};
pub use body::{Body, BodyStream};
pub use client::{Client, HttpClient, HttpClientBuilder};
pub use config::{
    ENV_CONNECT_TIMEOUT_SECS, ENV_TIMEOUT_SECS, ENV_USER_AGENT, HttpClientConfig,
    HttpClientConfigBuilder,
};
pub use context::{
    CALLER_ID_HEADER, FORWARDED_FOR_HEADER, REQUEST_ID_HEADER, RequestContext, TRACE_ID_HEADER,
};
pub use error::{HttpClientError, HttpError, Result};
pub use observer::{Observer, ObserverSet, TracingObserver};
pub use request::{Request, RequestHead};
pub use response::Response;
pub use retry::{RetryClient, retry};
pub use transport::{ReqwestTransport, Transport};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
pub use tokio_util::sync::CancellationToken;
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use onair_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backoff::{
        BackoffPolicy, BackoffPolicyExt, ConstantBackoff, ExponentialBackoff, LinearBackoff,
        StopBackoff, ZeroBackoff,
    };
    pub use crate::client::{Client, HttpClient};
    pub use crate::config::HttpClientConfig;
    pub use crate::context::RequestContext;
    pub use crate::error::{HttpClientError, HttpError};
    pub use crate::observer::{Observer, TracingObserver};
    pub use crate::request::{Request, RequestHead};
    pub use crate::response::Response;
    pub use crate::retry::RetryClient;
    pub use crate::transport::Transport;
    pub use http::{Method, StatusCode, header};
    pub use tokio_util::sync::CancellationToken;
}
