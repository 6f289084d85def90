use crate::transport::{RequestParams, TransportResponse};

/// Callback invoked with a request's successful response.
///
/// Invoked at most once, only on success. A failed dispatch is either
/// retried (re-queued at the front of the backlog) or abandoned after the
/// per-URL retry budget is exhausted; neither path runs the callback.
pub type Callback = Box<dyn Fn(TransportResponse) + Send + Sync>;

fn noop_callback(_: TransportResponse) {}

/// A single search to run against the pooled API.
///
/// Immutable once built. Owned by the [`Queue`](crate::queue::Queue) backlog
/// while pending, consumed by the dispatcher on send.
pub struct Request {
    url: String,
    params: RequestParams,
    callback: Callback,
}

impl Request {
    /// Build a request. `url` must be non-empty; an empty URL is a caller
    /// bug, not a recoverable condition, so this panics rather than
    /// returning a `Result` — mirroring how the rest of the core treats
    /// caller-supplied invariants.
    pub fn new(url: impl Into<String>, params: RequestParams, callback: Option<Callback>) -> Self {
        let url = url.into();
        assert!(!url.is_empty(), "Request::new: url must be non-empty");
        Self {
            url,
            params,
            callback: callback.unwrap_or_else(|| Box::new(noop_callback)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    /// Run the stored callback with the successful response. Callback panics
    /// are isolated by the dispatcher (see `queue::Queue::dispatch_one`), not
    /// here, since the caller of `run_callback` may be a test exercising the
    /// callback directly.
    pub fn run_callback(&self, result: TransportResponse) {
        (self.callback)(result)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request").field("url", &self.url).finish_non_exhaustive()
    }
}
