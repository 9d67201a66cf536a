//! HTTP client implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::context::until_cancelled;
use crate::{
    HttpClientConfig, HttpClientError, HttpError, Observer, ObserverSet, ReqwestTransport,
    Request, Response, Result, Transport,
};

/// Generic HTTP client.
///
/// Implemented by [`HttpClient`] and by decorators such as
/// [`RetryClient`](crate::RetryClient).
#[async_trait]
pub trait Client: Send + Sync {
    /// Execute a request.
    ///
    /// Returns the response for statuses below 300 with its body unread, and
    /// [`HttpClientError::Status`] otherwise.
    async fn execute(&self, request: Request) -> Result<Response>;

    /// Execute a request and decode the JSON response body.
    async fn execute_json<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned + Send,
        Self: Sized,
    {
        let cancellation = request.context().cancellation().clone();
        let response = self.execute(request).await?;
        until_cancelled(&cancellation, response.json()).await
    }
}

#[async_trait]
impl<C: Client> Client for Arc<C> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }

    async fn execute_json<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned + Send,
        Self: Sized,
    {
        (**self).execute_json(request).await
    }
}

/// HTTP client that classifies responses and notifies observers.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    observers: ObserverSet,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create a new client builder.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Get the registered observers.
    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let cancellation = request.context().cancellation().clone();
        if cancellation.is_cancelled() {
            return Err(HttpClientError::Cancelled);
        }

        until_cancelled(&cancellation, self.transport.send(request)).await
    }
}

#[async_trait]
impl Client for HttpClient {
    async fn execute(&self, mut request: Request) -> Result<Response> {
        if self.config.propagate_context_headers {
            let context = request.context().clone();
            context.propagate(request.headers_mut());
        }
        let head = request.head().clone();

        self.observers.report_start(&head);

        let response = match self.send(request).await {
            Ok(response) => response,
            Err(e) => {
                self.observers.report_error(&head, &e);
                return Err(e);
            }
        };

        let status = response.status().as_u16();
        if status >= 300 {
            let cancellation = head.context().cancellation();
            let error = match until_cancelled(cancellation, response.text()).await {
                Ok(body) => {
                    HttpClientError::Status(HttpError::new(head.url().as_str(), status, body))
                }
                Err(e) => e,
            };
            self.observers.report_error(&head, &error);
            return Err(error);
        }

        self.observers.report_end(&head, &response);
        Ok(response)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("observers", &self.observers)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`HttpClient`].
#[derive(Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    transport: Option<Arc<dyn Transport>>,
    observers: ObserverSet,
}

impl HttpClientBuilder {
    /// Set the configuration used for the default transport and propagation.
    pub fn config(mut self, config: HttpClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn observer<O: Observer + 'static>(mut self, observer: O) -> Self {
        self.observers = self.observers.with_observer(observer);
        self
    }

    /// Register a shared observer.
    pub fn shared_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers = self.observers.with_shared(observer);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        Ok(HttpClient {
            transport,
            observers: self.observers,
            config: Arc::new(self.config),
        })
    }
}
