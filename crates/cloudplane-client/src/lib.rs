//! Cloud control-plane API client
//!
//! A Rust client library for a session-authenticated control-plane REST API.
//! It logs in once, drains paginated collections, waits for asynchronous jobs
//! spawned by mutating calls and resolves load balancer backends.
//!
//! # Example
//!
//! ```no_run
//! use cloudplane_client::{ClientConfig, ControlPlaneClient, DeleteMode};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client and log in
//! let config = ClientConfig::new("http://zstack:8080/zstack", "admin", "password");
//! let client = ControlPlaneClient::connect(config).await?;
//!
//! // Read a whole collection
//! let zones: Vec<serde_json::Value> = client.list_all("zones", &[]).await?;
//!
//! // Mutating calls wait for the job they spawn
//! client.delete("vm-instances", "4d3e2a", DeleteMode::Permissive).await?;
//!
//! // Backends behind an application load balancer forwarding rule
//! let backends = client
//!     .list_backends("application", "lb-2bx1", Some("lbl-8kd2"), Some("loc-3cf9"))
//!     .await?;
//! for backend in &backends {
//!     println!("{} {}:{}", backend.display_name(), backend.backend_type, backend.port);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Session**: SHA-512 password login, token attached to every request
//! - **Pagination**: `start`/`limit` drains of whole collections
//! - **Jobs**: fixed-interval, deadline-bounded, cancellable polling
//! - **Load balancers**: classic and application backend listing
//! - **test-util**: `MockTransport` for unit tests without a server

pub mod client;
pub mod common;
pub mod config;
pub mod error;
pub mod jobs;
pub mod loadbalancer;
pub mod paging;
pub mod session;
#[path = "trait.rs"]
pub mod transport_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{ControlPlaneClient, DeleteMode};
pub use common::{ApiRequest, Envelope, EnvelopeKind, HttpTransport, RawResponse, RequestTarget};
pub use config::{ClientConfig, Credentials};
pub use error::{ControlPlaneError, Result, TransportError};
pub use jobs::{JobAwaitingInvoker, JobPolicy};
pub use loadbalancer::{Backend, BackendGroup, BackendResolver, GroupScope, LoadBalancerTopology};
pub use paging::{Page, PagedLister};
pub use session::{Session, SessionAuthenticator, SessionToken};
pub use transport_trait::Transport;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;
