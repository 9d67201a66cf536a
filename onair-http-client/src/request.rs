//! Outgoing requests and request builders.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use serde::Serialize;
use url::Url;

use crate::{Body, HttpClientError, RequestContext, Result};

const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Everything about a request except its body.
///
/// Cheap to clone. Observers see the head only, so they can inspect a request
/// without being able to consume or alter its body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    url: Url,
    headers: HeaderMap,
    context: RequestContext,
}

impl RequestHead {
    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the request context.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// An HTTP request.
#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    body: Body,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            head: RequestHead {
                method,
                url,
                headers: HeaderMap::new(),
                context: RequestContext::new(),
            },
            body: Body::empty(),
        }
    }

    /// Create a request from a URL string.
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        Ok(Self::new(method, parse_url(url)?))
    }

    /// Build a request with a JSON body.
    ///
    /// Sets `Content-Type: application/json`. A `None` payload produces an
    /// empty body.
    ///
    /// ```
    /// use onair_http_client::{Method, Request, RequestContext};
    /// use serde_json::json;
    ///
    /// let request = Request::json(
    ///     RequestContext::new(),
    ///     Method::POST,
    ///     "https://api.example.com/on-air",
    ///     Some(&json!({"on_air": true})),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(request.headers()["content-type"], "application/json");
    /// assert_eq!(request.body().as_bytes(), Some(&br#"{"on_air":true}"#[..]));
    /// ```
    pub fn json<T: Serialize + ?Sized>(
        context: RequestContext,
        method: Method,
        url: &str,
        payload: Option<&T>,
    ) -> Result<Self> {
        let body = match payload {
            Some(payload) => Body::from(
                serde_json::to_vec(payload).map_err(|e| HttpClientError::Encode(e.to_string()))?,
            ),
            None => Body::empty(),
        };

        Ok(Self::parse(method, url)?
            .with_context(context)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
            .with_body(body))
    }

    /// Build a request with URL-encoded fields.
    ///
    /// For `GET` and `HEAD` the encoded fields are appended to the URL's query
    /// string and no body is sent. Any other method sends them as the body with
    /// `Content-Type: application/x-www-form-urlencoded`.
    pub fn form<T: Serialize + ?Sized>(
        context: RequestContext,
        method: Method,
        url: &str,
        payload: &T,
    ) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(payload)
            .map_err(|e| HttpClientError::Encode(e.to_string()))?;
        let mut url = parse_url(url)?;

        if is_query_method(&method) {
            if !encoded.is_empty() {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                    _ => encoded,
                };
                url.set_query(Some(&query));
            }
            return Ok(Self::new(method, url).with_context(context));
        }

        Ok(Self::new(method, url)
            .with_context(context)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED))
            .with_body(encoded))
    }

    /// Rebuild a request from its parts.
    pub fn from_parts(head: RequestHead, body: Body) -> Self {
        Self { head, body }
    }

    /// Split the request into head and body.
    pub fn into_parts(self) -> (RequestHead, Body) {
        (self.head, self.body)
    }

    /// Set a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.head.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the request context.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.head.context = context;
        self
    }

    /// Set bearer authentication.
    pub fn with_bearer_auth(self, token: &str) -> Result<Self> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| HttpClientError::Encode(e.to_string()))?;
        Ok(self.with_header(header::AUTHORIZATION, value))
    }

    /// Set basic authentication.
    pub fn with_basic_auth(self, username: &str, password: Option<&str>) -> Result<Self> {
        use base64::Engine;
        let credentials = format!("{}:{}", username, password.unwrap_or_default());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let value = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|e| HttpClientError::Encode(e.to_string()))?;
        Ok(self.with_header(header::AUTHORIZATION, value))
    }

    /// Get the head.
    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Get the target URL.
    pub fn url(&self) -> &Url {
        &self.head.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Get the headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.head.headers
    }

    /// Get the request context.
    pub fn context(&self) -> &RequestContext {
        &self.head.context
    }

    /// Get the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Buffer the body so the request can be replayed.
    ///
    /// Returns the head and the full body bytes. A streaming body, if any,
    /// is consumed and dropped.
    pub(crate) async fn into_buffered(self) -> Result<(RequestHead, Bytes)> {
        let (head, body) = self.into_parts();
        let bytes = body.collect().await?;
        Ok((head, bytes))
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| HttpClientError::InvalidUrl(format!("{url}: {e}")))
}

fn is_query_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Lookup {
        #[serde(rename = "Name")]
        name: &'static str,
    }

    #[derive(Serialize)]
    struct Nested {
        inner: Lookup,
    }

    #[test]
    fn test_json_request() {
        let payload = serde_json::json!({"a": 1});
        let request = Request::json(
            RequestContext::new(),
            Method::POST,
            "https://api.example.com/shows",
            Some(&payload),
        )
        .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(request.body().as_bytes(), Some(&br#"{"a":1}"#[..]));
    }

    #[test]
    fn test_json_request_without_payload() {
        let request = Request::json::<()>(
            RequestContext::new(),
            Method::GET,
            "https://api.example.com/shows",
            None,
        )
        .unwrap();

        assert!(request.body().is_empty());
        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_json_request_encoding_error() {
        let mut payload = HashMap::new();
        payload.insert((1u8, 2u8), "tuple keys are not valid JSON keys");

        let err = Request::json(
            RequestContext::new(),
            Method::POST,
            "https://api.example.com/shows",
            Some(&payload),
        )
        .unwrap_err();
        assert!(matches!(err, HttpClientError::Encode(_)));
        assert!(err.is_permanent());
    }

    #[test]
    fn test_json_request_invalid_url() {
        let err = Request::json::<()>(RequestContext::new(), Method::GET, "not a url", None)
            .unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_form_request_get_uses_query() {
        let request = Request::form(
            RequestContext::new(),
            Method::GET,
            "https://api.example.com/hello",
            &Lookup { name: "x" },
        )
        .unwrap();

        assert!(request.body().is_empty());
        assert_eq!(request.url().query(), Some("Name=x"));
        assert!(request.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_form_request_get_appends_to_existing_query() {
        let request = Request::form(
            RequestContext::new(),
            Method::GET,
            "https://api.example.com/hello?lang=en",
            &Lookup { name: "x" },
        )
        .unwrap();

        assert_eq!(request.url().query(), Some("lang=en&Name=x"));
    }

    #[test]
    fn test_form_request_post_uses_body() {
        let request = Request::form(
            RequestContext::new(),
            Method::POST,
            "https://api.example.com/hello",
            &Lookup { name: "on air" },
        )
        .unwrap();

        assert_eq!(request.url().query(), None);
        assert_eq!(
            request.headers()[header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(request.body().as_bytes(), Some(&b"Name=on+air"[..]));
    }

    #[test]
    fn test_form_request_encoding_error() {
        let err = Request::form(
            RequestContext::new(),
            Method::POST,
            "https://api.example.com/hello",
            &Nested {
                inner: Lookup { name: "x" },
            },
        )
        .unwrap_err();
        assert!(matches!(err, HttpClientError::Encode(_)));
    }

    #[test]
    fn test_basic_auth() {
        let request = Request::parse(Method::GET, "https://api.example.com")
            .unwrap()
            .with_basic_auth("user", Some("pass"))
            .unwrap();
        assert_eq!(
            request.headers()[header::AUTHORIZATION],
            "Basic dXNlcjpwYXNz"
        );
    }

    #[tokio::test]
    async fn test_into_buffered_keeps_head() {
        let request = Request::parse(Method::PUT, "https://api.example.com/on-air")
            .unwrap()
            .with_body("true");
        let (head, bytes) = request.into_buffered().await.unwrap();
        assert_eq!(head.method(), Method::PUT);
        assert_eq!(bytes, "true");
    }
}
