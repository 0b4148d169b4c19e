//! Errors specific to the backend resolver binary
//!
//! Covers what the client library does not: the load balancer selection read
//! from the environment.

use cloudplane_client::ControlPlaneError;
use thiserror::Error;

/// Errors that can occur while resolving backends from the command line
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Control-plane call failed
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
