//! Control-plane client errors

use std::time::Duration;
use thiserror::Error;

/// Errors raised while moving a single request over the wire
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS or timeout failure reported by the HTTP stack
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API answered with a status outside the expected flow
    #[error("{method} {url} failed: {status} - {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// The envelope did not carry the key the caller expected
    #[error("Response envelope is missing `{field}`")]
    MissingField { field: String },
}

impl TransportError {
    /// HTTP status of the failed call, if the server answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors that can occur when talking to the control plane
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// Network, decode or unexpected-status failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Login was rejected or the login endpoint was unreachable
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An asynchronous job did not complete before the ceiling
    #[error("Timed out after {elapsed:?} waiting for job of {method} {url} params: {params}")]
    JobTimeout {
        method: String,
        url: String,
        params: String,
        elapsed: Duration,
    },

    /// Job polling was cancelled by the caller
    #[error("Job polling for {url} was cancelled")]
    JobCancelled { url: String },

    /// Caller input rejected before any request was made
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// HTTP/HTTPS listeners can only be narrowed through a forwarding rule
    #[error("Listener {listener_id} of load balancer {lb_id} is HTTP/HTTPS and requires a rule id")]
    MissingRuleId { lb_id: String, listener_id: String },

    /// Load balancer topology is neither classic nor application
    #[error("Unsupported load balancer topology: {0}")]
    UnsupportedTopology(String),

    /// Client configuration is missing or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization of a domain object failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for control-plane operations
pub type Result<T> = std::result::Result<T, ControlPlaneError>;

impl ControlPlaneError {
    /// Returns true when the session was rejected (401/403) or login failed.
    ///
    /// Callers use this to decide when to re-authenticate.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ControlPlaneError::Authentication(_) => true,
            ControlPlaneError::Transport(e) => matches!(e.status(), Some(401 | 403)),
            _ => false,
        }
    }

    /// Returns true for job timeouts and HTTP-level timeouts
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            ControlPlaneError::JobTimeout { .. } => true,
            ControlPlaneError::Transport(TransportError::Http(e)) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true for errors caused by caller input.
    ///
    /// `InvalidArgument` and `UnsupportedTopology` are raised before any request;
    /// `MissingRuleId` only after the listener read revealed an HTTP/HTTPS protocol.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ControlPlaneError::InvalidArgument(_)
                | ControlPlaneError::MissingRuleId { .. }
                | ControlPlaneError::UnsupportedTopology(_)
        )
    }
}
