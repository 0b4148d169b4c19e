//! Common utilities for the control-plane client
//!
//! Provides the request/response types shared by every component and the
//! reqwest-backed [`HttpTransport`].

pub mod envelope;
pub mod query;

use crate::error::TransportError;
use crate::session::Session;
use crate::transport_trait::Transport;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub use envelope::{Envelope, EnvelopeKind};

/// Where a request is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// Path relative to `{base}/v1/`
    Resource(String),
    /// Fully qualified URL (job locations)
    Absolute(String),
}

/// One outbound API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub target: RequestTarget,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Skip the session header (login)
    pub anonymous: bool,
}

impl ApiRequest {
    /// Build a request against a resource path
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            target: RequestTarget::Resource(resource.into()),
            query: Vec::new(),
            body: None,
            anonymous: false,
        }
    }

    /// `GET {base}/v1/{resource}`
    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::GET, resource)
    }

    /// `POST {base}/v1/{resource}` with a JSON body
    pub fn post(resource: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, resource).with_body(body)
    }

    /// `PUT {base}/v1/{resource}` with a JSON body
    pub fn put(resource: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, resource).with_body(body)
    }

    /// `DELETE {base}/v1/{resource}`
    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(Method::DELETE, resource)
    }

    /// Plain `GET` against a job location
    pub fn poll(location: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            target: RequestTarget::Absolute(location.into()),
            query: Vec::new(),
            body: None,
            anonymous: false,
        }
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append one query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append caller-supplied filters, preserving their order
    #[must_use]
    pub fn with_filters(mut self, filters: &[(&str, &str)]) -> Self {
        self.query
            .extend(filters.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        self
    }

    /// Send without the session header
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Value of a query parameter, if present
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Resource path or absolute URL, for log and error messages
    pub fn target_str(&self) -> &str {
        match &self.target {
            RequestTarget::Resource(path) | RequestTarget::Absolute(path) => path,
        }
    }

    /// Body rendered for error messages
    pub fn params_string(&self) -> String {
        self.body
            .as_ref()
            .map_or_else(|| "{}".to_string(), Value::to_string)
    }
}

/// Response as received, before status interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub body: Value,
}

impl RawResponse {
    /// True for 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a 2xx response into an envelope; anything else is a transport error
    pub fn into_envelope(self, method: &Method) -> Result<Envelope, TransportError> {
        if !self.is_success() {
            let body = match self.body {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            return Err(TransportError::Status {
                method: method.to_string(),
                url: self.url,
                status: self.status,
                body,
            });
        }
        Ok(Envelope::new(self.status, self.body))
    }
}

/// Parse a response body.
///
/// An empty body becomes `null`. Only a 200 body must be JSON: anything else
/// (errors, `202 Accepted` job statuses) may carry plain text, which is kept as
/// a JSON string.
pub fn parse_body(url: &str, status: u16, text: &str) -> Result<Value, TransportError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) if status != 200 => Ok(Value::String(text.to_string())),
        Err(source) => Err(TransportError::Decode {
            url: url.to_string(),
            source,
        }),
    }
}

/// reqwest-backed transport with session header injection
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// # Arguments
    /// * `base_url` - API endpoint (e.g., "http://zstack:8080/zstack")
    /// * `request_timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Session::new(),
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session(&self) -> &Session {
        &self.session
    }

    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = query::build_url(&self.base_url, &request.target, &request.query);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if !request.anonymous {
            if let Some(token) = self.session.token() {
                builder = builder.header(AUTHORIZATION, token.authorization_header());
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = parse_body(&url, status, &text)?;

        Ok(RawResponse { status, url, body })
    }
}
