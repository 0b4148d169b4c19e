//! Load balancer selection and backend resolution
//!
//! The load balancer to inspect is read from `LB_TOPOLOGY` (default
//! `application`), `LB_ID` (required), `LB_LISTENER_ID` and `LB_RULE_ID`.

use crate::error::ResolveError;
use cloudplane_client::{Backend, ControlPlaneClient, Transport};
use serde::Serialize;
use tracing::{debug, warn};

pub const ENV_TOPOLOGY: &str = "LB_TOPOLOGY";
pub const ENV_LB_ID: &str = "LB_ID";
pub const ENV_LISTENER_ID: &str = "LB_LISTENER_ID";
pub const ENV_RULE_ID: &str = "LB_RULE_ID";

const DEFAULT_TOPOLOGY: &str = "application";

/// Which load balancer, listener and rule to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendQuery {
    pub topology: String,
    pub lb_id: String,
    pub listener_id: Option<String>,
    pub rule_id: Option<String>,
}

impl BackendQuery {
    pub fn from_env() -> Result<Self, ResolveError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ResolveError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let lb_id = non_empty(ENV_LB_ID).ok_or_else(|| {
            ResolveError::InvalidConfig(format!("{ENV_LB_ID} environment variable is required"))
        })?;

        Ok(Self {
            topology: non_empty(ENV_TOPOLOGY).unwrap_or_else(|| DEFAULT_TOPOLOGY.to_string()),
            lb_id,
            listener_id: non_empty(ENV_LISTENER_ID),
            rule_id: non_empty(ENV_RULE_ID),
        })
    }

    /// Output document for the resolved backends
    pub fn report(&self, backends: Vec<Backend>) -> BackendReport<'_> {
        BackendReport {
            topology: &self.topology,
            lb_id: &self.lb_id,
            listener_id: self.listener_id.as_deref(),
            rule_id: self.rule_id.as_deref(),
            backends,
        }
    }
}

/// What the binary prints
#[derive(Debug, Serialize)]
pub struct BackendReport<'a> {
    pub topology: &'a str,
    pub lb_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<&'a str>,
    pub backends: Vec<Backend>,
}

/// Resolve the backends of `query`, logging in again once if the session was rejected
pub async fn resolve<T: Transport>(
    client: &ControlPlaneClient<T>,
    query: &BackendQuery,
) -> Result<Vec<Backend>, ResolveError> {
    match list(client, query).await {
        Err(e) if e.is_unauthorized() => {
            warn!("Session rejected ({}), re-authenticating", e);
            client.reauthenticate().await?;
            Ok(list(client, query).await?)
        }
        result => Ok(result?),
    }
}

async fn list<T: Transport>(
    client: &ControlPlaneClient<T>,
    query: &BackendQuery,
) -> cloudplane_client::Result<Vec<Backend>> {
    debug!("Resolving backends for {:?}", query);
    client
        .list_backends(
            &query.topology,
            &query.lb_id,
            query.listener_id.as_deref(),
            query.rule_id.as_deref(),
        )
        .await
}
