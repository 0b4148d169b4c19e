//! Mock transport for unit testing
//!
//! This module provides a scripted implementation of [`Transport`] that can be used
//! in unit tests without a running control plane. Responses are served from a
//! FIFO queue first, then from an optional handler; every request is recorded
//! together with the session token it would have carried and the (tokio) instant
//! it was issued.

use crate::common::{ApiRequest, RawResponse, RequestTarget, query};
use crate::error::TransportError;
use crate::session::Session;
use crate::transport_trait::Transport;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

type Handler = Box<dyn Fn(&ApiRequest) -> RawResponse + Send + Sync>;

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    /// Session token attached to the request, if any
    pub token: Option<String>,
    pub at: Instant,
}

/// Mock transport for testing
pub struct MockTransport {
    base_url: String,
    session: Session,
    queue: Mutex<VecDeque<RawResponse>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("base_url", &self.base_url)
            .field("queued", &lock(&self.queue).len())
            .field("requests", &lock(&self.requests).len())
            .finish_non_exhaustive()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock with an empty response queue
    pub fn new() -> Self {
        Self {
            base_url: "http://mock-control-plane".to_string(),
            session: Session::new(),
            queue: Mutex::new(VecDeque::new()),
            handler: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve requests the queue does not cover with `handler`
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> RawResponse + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Serve a stable collection, honouring the `start`/`limit` query parameters
    pub fn paged_collection(items: Vec<Value>) -> Self {
        Self::new().with_handler(move |request| {
            let start = numeric_param(request, "start").unwrap_or(0);
            let limit = numeric_param(request, "limit").unwrap_or(items.len());
            let page: Vec<Value> = items.iter().skip(start).take(limit).cloned().collect();
            response(request, 200, json!({ "inventories": page }))
        })
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: Value) {
        lock(&self.queue).push_back(RawResponse {
            status,
            url: String::new(),
            body,
        });
    }

    /// Queue `count` identical responses
    pub fn push_repeated(&self, count: usize, status: u16, body: &Value) {
        for _ in 0..count {
            self.push_json(status, body.clone());
        }
    }

    /// All requests seen so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests seen so far
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests that targeted an absolute URL (job polls)
    pub fn polls(&self) -> Vec<RecordedRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| matches!(r.request.target, RequestTarget::Absolute(_)))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session(&self) -> &Session {
        &self.session
    }

    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let token = if request.anonymous {
            None
        } else {
            self.session.token().map(|t| t.as_str().to_string())
        };
        lock(&self.requests).push(RecordedRequest {
            request: request.clone(),
            token,
            at: Instant::now(),
        });

        let url = query::build_url(&self.base_url, &request.target, &request.query);
        let queued = lock(&self.queue).pop_front();
        let reply = match (queued, &self.handler) {
            (Some(reply), _) => RawResponse { url, ..reply },
            (None, Some(handler)) => handler(&request),
            (None, None) => RawResponse {
                status: 500,
                url,
                body: Value::String("no mock response scripted".to_string()),
            },
        };
        Ok(reply)
    }
}

/// Build a response for `request` with the URL the real transport would have used
pub fn response(request: &ApiRequest, status: u16, body: Value) -> RawResponse {
    RawResponse {
        status,
        url: query::build_url("http://mock-control-plane", &request.target, &request.query),
        body,
    }
}

fn numeric_param(request: &ApiRequest, key: &str) -> Option<usize> {
    request.query_param(key).and_then(|v| v.parse().ok())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
