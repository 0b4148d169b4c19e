//! Transport trait for mocking
//!
//! This trait abstracts the wire so the paging, job-polling and load-balancer
//! components can run against a scripted transport in unit tests.
//! The concrete [`HttpTransport`](crate::common::HttpTransport) implements it over reqwest.

use crate::common::{ApiRequest, Envelope, RawResponse};
use crate::error::TransportError;
use crate::session::Session;

/// Executes single API requests.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Base endpoint URL
    fn base_url(&self) -> &str;

    /// Session whose token is attached to every non-anonymous request
    fn session(&self) -> &Session;

    /// Issue one request and return the response whatever its status.
    ///
    /// Fails only on connection errors and undecodable success bodies.
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;

    /// Issue one request and require a 2xx status
    async fn send(&self, request: ApiRequest) -> Result<Envelope, TransportError> {
        let method = request.method.clone();
        let response = self.execute(request).await?;
        response.into_envelope(&method)
    }
}
