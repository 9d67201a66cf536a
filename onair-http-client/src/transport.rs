//! Low-level transports.

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

use crate::{HttpClientConfig, HttpClientError, Request, Response, Result};

/// Sends a single request and returns the raw response.
///
/// Implementations report network-level failures only; status codes are
/// classified by [`HttpClient`](crate::HttpClient). A transport must be safe to
/// share between concurrent callers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request.
    async fn send(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        (**self).send(request).await
    }
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(config.tcp_keepalive)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .default_headers(default_headers(&config.default_headers)?)
            .gzip(config.gzip)
            .brotli(config.brotli);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        Ok(Self {
            inner: builder.build()?,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let (head, body) = request.into_parts();

        let mut builder = self
            .inner
            .request(head.method().clone(), head.url().clone())
            .headers(head.headers().clone());
        if let Some(body) = body.into_reqwest() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        Ok(Response::from_reqwest(response))
    }
}

fn default_headers(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| HttpClientError::Config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| HttpClientError::Config(format!("invalid value for {name}: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_default_config() {
        assert!(ReqwestTransport::new(&HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_default_header_is_config_error() {
        let config = HttpClientConfig::builder()
            .default_header("bad header", "value")
            .build();
        let err = ReqwestTransport::new(&config).unwrap_err();
        assert!(matches!(err, HttpClientError::Config(_)));
    }
}
