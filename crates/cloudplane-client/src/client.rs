//! Control-plane client
//!
//! [`ControlPlaneClient`] owns a [`Transport`] together with the credentials and
//! policies needed to drive it: the session is obtained through
//! [`SessionAuthenticator`], collections are drained by [`PagedLister`],
//! mutating calls go through [`JobAwaitingInvoker`] and load balancer backends
//! are resolved by [`BackendResolver`].

use crate::common::query::resource_path;
use crate::common::{ApiRequest, Envelope, HttpTransport};
use crate::config::{ClientConfig, Credentials};
use crate::error::{ControlPlaneError, Result};
use crate::jobs::{JobAwaitingInvoker, JobPolicy};
use crate::loadbalancer::{Backend, BackendResolver};
use crate::paging::{DEFAULT_PAGE_SIZE, Page, PagedLister};
use crate::session::{Session, SessionAuthenticator, SessionToken};
use crate::transport_trait::Transport;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a delete treats dependent resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Refuse when dependents exist
    #[default]
    Permissive,
    /// Delete regardless of dependents
    Enforcing,
}

impl DeleteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteMode::Permissive => "Permissive",
            DeleteMode::Enforcing => "Enforcing",
        }
    }
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-authenticated control-plane client
#[derive(Debug)]
pub struct ControlPlaneClient<T: Transport = HttpTransport> {
    transport: T,
    credentials: Credentials,
    page_size: usize,
    job_policy: JobPolicy,
    cancel: CancellationToken,
}

impl ControlPlaneClient<HttpTransport> {
    /// Create a client over HTTP. No request is made until the first call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.base_url, config.request_timeout)?;
        Ok(Self::with_transport(transport, config.credentials)
            .with_page_size(config.page_size)
            .with_job_policy(config.job_policy))
    }

    /// Create a client and log in with the configured credentials
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.reauthenticate().await?;
        Ok(client)
    }
}

impl<T: Transport> ControlPlaneClient<T> {
    /// Wrap an arbitrary transport
    pub fn with_transport(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            page_size: DEFAULT_PAGE_SIZE,
            job_policy: JobPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_job_policy(mut self, job_policy: JobPolicy) -> Self {
        self.job_policy = job_policy;
        self
    }

    /// Abort any job wait when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn session(&self) -> &Session {
        self.transport.session()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Log in with explicit credentials; the token replaces the current one
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<SessionToken> {
        SessionAuthenticator::new(&self.transport)
            .authenticate(username, password)
            .await
    }

    /// Log in again with the stored credentials.
    ///
    /// Call this after an error for which
    /// [`is_unauthorized`](ControlPlaneError::is_unauthorized) returns true.
    pub async fn reauthenticate(&self) -> Result<SessionToken> {
        let Credentials { username, password } = &self.credentials;
        self.authenticate(username, password).await
    }

    /// Collection reader with the configured page size
    pub fn lister(&self) -> PagedLister<'_, T> {
        PagedLister::new(&self.transport).with_page_size(self.page_size)
    }

    /// Mutating-call invoker with the configured job policy
    pub fn invoker(&self) -> JobAwaitingInvoker<'_, T> {
        JobAwaitingInvoker::new(&self.transport)
            .with_policy(self.job_policy)
            .with_cancellation(self.cancel.clone())
    }

    /// Load balancer backend resolver
    pub fn backends(&self) -> BackendResolver<'_, T> {
        BackendResolver::new(&self.transport).with_page_size(self.page_size)
    }

    /// Every item of `resource` matching `filters`
    pub async fn list_all<I: DeserializeOwned>(
        &self,
        resource: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<I>> {
        self.lister().list_all(resource, filters).await
    }

    /// One slice of `resource`
    pub async fn list_page(
        &self,
        resource: &str,
        filters: &[(&str, &str)],
        page: Page,
    ) -> Result<Vec<Value>> {
        self.lister().list_page(resource, filters, page).await
    }

    /// `GET {resource}/{id}/{view}`; an empty `view` reads the resource itself
    pub async fn get(&self, resource: &str, id: &str, view: &str) -> Result<Envelope> {
        require_id(resource, id)?;
        let path = if view.is_empty() {
            resource_path(resource, &[id])
        } else {
            resource_path(resource, &[id, view])
        };
        Ok(self.transport.send(ApiRequest::get(path)).await?)
    }

    /// Create a resource, waiting for the job if the call is asynchronous
    pub async fn create(&self, resource: &str, body: Value) -> Result<Envelope> {
        debug!("Creating {}", resource);
        self.invoker().invoke(ApiRequest::post(resource, body)).await
    }

    /// Run an action on a resource, waiting for the job if the call is asynchronous
    pub async fn act(&self, resource: &str, id: &str, body: Value) -> Result<Envelope> {
        require_id(resource, id)?;
        let path = resource_path(resource, &[id, "actions"]);
        self.invoker().invoke(ApiRequest::put(path, body)).await
    }

    /// Delete a resource, waiting for the job if the call is asynchronous
    pub async fn delete(&self, resource: &str, id: &str, mode: DeleteMode) -> Result<Envelope> {
        require_id(resource, id)?;
        let request = ApiRequest::delete(resource_path(resource, &[id])).with_query("deleteMode", mode);
        let envelope = self.invoker().invoke(request).await?;
        info!("Deleted {} {} ({})", resource, id, mode);
        Ok(envelope)
    }

    /// Backends of a load balancer; see [`BackendResolver::list_backends`]
    pub async fn list_backends(
        &self,
        topology: &str,
        lb_id: &str,
        listener_id: Option<&str>,
        rule_id: Option<&str>,
    ) -> Result<Vec<Backend>> {
        self.backends()
            .list_backends(topology, lb_id, listener_id, rule_id)
            .await
    }
}

fn require_id(resource: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ControlPlaneError::InvalidArgument(format!(
            "{resource} id must not be empty"
        )));
    }
    Ok(())
}
