//! Request lifecycle observers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::{HttpClientError, RequestHead, Response};

/// Listener notified of request lifecycle events.
///
/// Observers are side-effect only: they cannot alter the request, the response
/// or the result the caller sees. All methods default to doing nothing.
pub trait Observer: Send + Sync {
    /// Called before the request is handed to the transport.
    fn on_request_start(&self, _request: &RequestHead) {}

    /// Called when the request completed with a status below 300.
    fn on_request_end(&self, _request: &RequestHead, _response: &Response) {}

    /// Called when the request failed, including statuses of 300 and above.
    fn on_error(&self, _request: &RequestHead, _error: &HttpClientError) {}
}

/// Ordered, immutable set of observers.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn Observer>>,
}

impl ObserverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Observers are notified in the order they were added.
    pub fn with_observer<O: Observer + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Add a shared observer.
    pub fn with_shared(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn report_start(&self, request: &RequestHead) {
        self.notify("on_request_start", |o| o.on_request_start(request));
    }

    pub(crate) fn report_end(&self, request: &RequestHead, response: &Response) {
        self.notify("on_request_end", |o| o.on_request_end(request, response));
    }

    pub(crate) fn report_error(&self, request: &RequestHead, error: &HttpClientError) {
        self.notify("on_error", |o| o.on_error(request, error));
    }

    // A panicking observer is logged and skipped; the rest still run.
    fn notify(&self, event: &'static str, f: impl Fn(&dyn Observer)) {
        for observer in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                tracing::warn!(event, "Observer panicked, ignoring");
            }
        }
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}

/// Observer that logs every request through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver {
    log_headers: bool,
}

impl TracingObserver {
    /// Create a new tracing observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log request and response headers at trace level.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

impl Observer for TracingObserver {
    fn on_request_start(&self, request: &RequestHead) {
        let context = request.context();
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            request_id = context.request_id().unwrap_or("-"),
            trace_id = context.trace_id().unwrap_or("-"),
            "Sending HTTP request"
        );

        if self.log_headers {
            for (name, value) in request.headers() {
                tracing::trace!(header = %name, value = ?value, "Request header");
            }
        }
    }

    fn on_request_end(&self, request: &RequestHead, response: &Response) {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            status = %response.status(),
            "Received HTTP response"
        );

        if self.log_headers {
            for (name, value) in response.headers() {
                tracing::trace!(header = %name, value = ?value, "Response header");
            }
        }
    }

    fn on_error(&self, request: &RequestHead, error: &HttpClientError) {
        tracing::warn!(
            method = %request.method(),
            url = %request.url(),
            request_id = request.context().request_id().unwrap_or("-"),
            error = %error,
            "HTTP request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use crate::testing::EventLog;
    use http::Method;

    struct Panicking;

    impl Observer for Panicking {
        fn on_request_start(&self, _request: &RequestHead) {
            panic!("observer bug");
        }
    }

    fn head() -> RequestHead {
        Request::parse(Method::GET, "https://api.example.com/hello")
            .unwrap()
            .head()
            .clone()
    }

    #[test]
    fn test_registration_order() {
        let log = EventLog::default();
        let set = ObserverSet::new()
            .with_observer(log.observer("first"))
            .with_observer(log.observer("second"));

        let head = head();
        set.report_start(&head);
        set.report_error(&head, &HttpClientError::Cancelled);

        assert_eq!(
            log.events(),
            vec!["first:start", "second:start", "first:error", "second:error"]
        );
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let log = EventLog::default();
        let set = ObserverSet::new()
            .with_observer(Panicking)
            .with_observer(log.observer("after"));

        set.report_start(&head());

        assert_eq!(log.events(), vec!["after:start"]);
    }

    #[test]
    fn test_shared_observer() {
        let log = EventLog::default();
        let shared: Arc<dyn Observer> = Arc::new(log.observer("shared"));
        let set = ObserverSet::new().with_shared(shared.clone()).with_shared(shared);

        set.report_start(&head());

        assert_eq!(set.len(), 2);
        assert_eq!(log.events(), vec!["shared:start", "shared:start"]);
    }

    #[test]
    fn test_tracing_observer_does_not_panic_without_context() {
        let set = ObserverSet::new().with_observer(TracingObserver::new().with_headers());
        let head = head();
        set.report_start(&head);
        set.report_error(&head, &HttpClientError::Transport("refused".into()));
        assert_eq!(set.len(), 1);
    }
}
