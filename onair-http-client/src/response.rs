//! HTTP response wrapper.

use bytes::Bytes;
use futures::TryStreamExt;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use std::io;
use url::Url;

use crate::{Body, HttpClientError, Result};

/// HTTP response.
///
/// The body is not read by the client on success. Reading it consumes the
/// response, so each body is read (or dropped) exactly once.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Body,
}

impl Response {
    /// Create a response. Mostly useful for custom transports.
    pub fn new(status: StatusCode, url: Url, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            url,
            body: body.into(),
        }
    }

    /// Create a response from a reqwest response without reading its body.
    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = Body::from_stream(response.bytes_stream().map_err(io::Error::other));

        Self {
            status,
            headers,
            url,
            body,
        }
    }

    /// Set a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the content type if available.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the response URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the body without reading it.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Consume the response and return the unread body.
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Consume the response and read the body as bytes.
    pub async fn bytes(self) -> Result<Bytes> {
        Ok(self.body.collect().await?)
    }

    /// Consume the response and read the body as text.
    ///
    /// Invalid UTF-8 sequences are replaced.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consume the response and parse the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(HttpClientError::Decode)
    }
}
