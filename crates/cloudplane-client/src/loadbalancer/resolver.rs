//! Backend listing strategies and the resolver that selects between them

use super::LoadBalancerTopology;
use super::models::{Backend, ListenerTargets, Target};
use crate::common::query::resource_path;
use crate::error::{ControlPlaneError, Result};
use crate::paging::{DEFAULT_PAGE_SIZE, PagedLister};
use crate::transport_trait::Transport;
use tracing::debug;

const LOAD_BALANCERS: &str = "load-balancers";
const CLASSIC_TARGETS: &str = "classic-targets";
const TARGETS: &str = "targets";

/// One way of listing the backends of a load balancer
#[async_trait::async_trait]
pub trait BackendListing: Send + Sync {
    /// List backends; `listener_id` and `rule_id` are already normalised (never empty)
    async fn list(
        &self,
        lb_id: &str,
        listener_id: Option<&str>,
        rule_id: Option<&str>,
    ) -> Result<Vec<Backend>>;
}

/// Classic load balancers: every registered target, keyed only by load balancer
#[derive(Debug)]
pub struct ClassicBackends<'a, T: Transport + ?Sized> {
    lister: PagedLister<'a, T>,
}

impl<'a, T: Transport + ?Sized> ClassicBackends<'a, T> {
    pub fn new(lister: PagedLister<'a, T>) -> Self {
        Self { lister }
    }
}

#[async_trait::async_trait]
impl<'a, T: Transport + ?Sized> BackendListing for ClassicBackends<'a, T> {
    async fn list(
        &self,
        lb_id: &str,
        _listener_id: Option<&str>,
        _rule_id: Option<&str>,
    ) -> Result<Vec<Backend>> {
        let path = resource_path(LOAD_BALANCERS, &[lb_id, CLASSIC_TARGETS]);
        let targets: Vec<Target> = self.lister.list_all(&path, &[]).await?;
        Ok(targets
            .into_iter()
            .map(|target| Backend::from_target(lb_id, target))
            .collect())
    }
}

/// Application load balancers: per-listener targets, narrowed by rule
#[derive(Debug)]
pub struct ApplicationBackends<'a, T: Transport + ?Sized> {
    lister: PagedLister<'a, T>,
}

impl<'a, T: Transport + ?Sized> ApplicationBackends<'a, T> {
    pub fn new(lister: PagedLister<'a, T>) -> Self {
        Self { lister }
    }
}

#[async_trait::async_trait]
impl<'a, T: Transport + ?Sized> BackendListing for ApplicationBackends<'a, T> {
    async fn list(
        &self,
        lb_id: &str,
        listener_id: Option<&str>,
        rule_id: Option<&str>,
    ) -> Result<Vec<Backend>> {
        let path = resource_path(LOAD_BALANCERS, &[lb_id, TARGETS]);
        let filters: Vec<(&str, &str)> = listener_id
            .map(|id| vec![("listenerId", id)])
            .unwrap_or_default();
        let listeners: Vec<ListenerTargets> = self.lister.list_all(&path, &filters).await?;
        select_backends(lb_id, listeners, rule_id)
    }
}

/// Pick the target set of an application load balancer.
///
/// Listeners are examined in server order. An HTTP/HTTPS listener met without a
/// rule id is an error. With a rule id, the first rule carrying that id wins;
/// without one, the first listener's default targets are returned. A rule id
/// that matches nothing yields an empty list.
pub fn select_backends(
    lb_id: &str,
    listeners: Vec<ListenerTargets>,
    rule_id: Option<&str>,
) -> Result<Vec<Backend>> {
    for listener in listeners {
        if listener.requires_rule() && rule_id.is_none() {
            return Err(ControlPlaneError::MissingRuleId {
                lb_id: lb_id.to_string(),
                listener_id: listener.listener_id,
            });
        }

        match rule_id {
            Some(wanted) => {
                if let Some(rule) = listener.rule(wanted) {
                    return Ok(into_backends(&rule.rule_id, rule.targets.clone()));
                }
            }
            None => {
                return Ok(into_backends(&listener.listener_id, listener.targets));
            }
        }
    }

    debug!(
        "No target set of load balancer {} matched rule {:?}",
        lb_id, rule_id
    );
    Ok(Vec::new())
}

fn into_backends(group_id: &str, targets: Vec<Target>) -> Vec<Backend> {
    targets
        .into_iter()
        .map(|target| Backend::from_target(group_id, target))
        .collect()
}

/// Resolves load balancer backends for a topology
#[derive(Debug)]
pub struct BackendResolver<'a, T: Transport + ?Sized> {
    transport: &'a T,
    page_size: usize,
}

impl<'a, T: Transport + ?Sized + 'a> BackendResolver<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// List the backends of a load balancer.
    ///
    /// # Arguments
    /// * `topology` - "classic" or "application"
    /// * `lb_id` - Load balancer id, must not be empty
    /// * `listener_id` - Optional listener to restrict an application read to
    /// * `rule_id` - Forwarding rule; mandatory for HTTP/HTTPS listeners
    ///
    /// # Returns
    /// * `Ok(Vec<Backend>)` - Possibly empty when a rule id matched nothing
    /// * `Err(ControlPlaneError::InvalidArgument)` - Empty load balancer id
    /// * `Err(ControlPlaneError::UnsupportedTopology)` - Unknown topology
    /// * `Err(ControlPlaneError::MissingRuleId)` - HTTP/HTTPS listener without rule id
    pub async fn list_backends(
        &self,
        topology: &str,
        lb_id: &str,
        listener_id: Option<&str>,
        rule_id: Option<&str>,
    ) -> Result<Vec<Backend>> {
        validate_lb_id(lb_id)?;
        let topology: LoadBalancerTopology = topology.parse()?;
        self.list_backends_for(topology, lb_id, listener_id, rule_id)
            .await
    }

    /// Same as [`list_backends`](Self::list_backends) with an already parsed topology
    pub async fn list_backends_for(
        &self,
        topology: LoadBalancerTopology,
        lb_id: &str,
        listener_id: Option<&str>,
        rule_id: Option<&str>,
    ) -> Result<Vec<Backend>> {
        validate_lb_id(lb_id)?;
        let listener_id = listener_id.filter(|id| !id.is_empty());
        let rule_id = rule_id.filter(|id| !id.is_empty());

        debug!(
            "Listing {} backends of {} (listener {:?}, rule {:?})",
            topology, lb_id, listener_id, rule_id
        );
        let backends = self
            .strategy(topology)
            .list(lb_id, listener_id, rule_id)
            .await?;
        debug!("Resolved {} backend(s) for {}", backends.len(), lb_id);
        Ok(backends)
    }

    /// Listing strategy for `topology`
    pub fn strategy(&self, topology: LoadBalancerTopology) -> Box<dyn BackendListing + 'a> {
        let lister = PagedLister::new(self.transport).with_page_size(self.page_size);
        match topology {
            LoadBalancerTopology::Classic => Box::new(ClassicBackends::new(lister)),
            LoadBalancerTopology::Application => Box::new(ApplicationBackends::new(lister)),
        }
    }
}

fn validate_lb_id(lb_id: &str) -> Result<()> {
    if lb_id.trim().is_empty() {
        return Err(ControlPlaneError::InvalidArgument(
            "load balancer id must not be empty".to_string(),
        ));
    }
    Ok(())
}
