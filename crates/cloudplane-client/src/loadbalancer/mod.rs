//! Load balancer backend resolution
//!
//! Two topologies are supported, each with its own listing strategy:
//!
//! - **classic**: one read of every target registered on the load balancer;
//! - **application**: one read of per-listener target sets, narrowed to a
//!   listener's default targets or to a forwarding rule's targets.
//!
//! HTTP/HTTPS listeners only route through rules, so resolving their backends
//! requires a rule id.

pub mod models;
pub mod resolver;

use crate::error::ControlPlaneError;
use std::fmt;
use std::str::FromStr;

pub use models::{Backend, BackendGroup, ForwardingRule, GroupScope, ListenerTargets, Target};
pub use resolver::{ApplicationBackends, BackendListing, BackendResolver, ClassicBackends};

/// Load balancer architecture variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadBalancerTopology {
    Classic,
    Application,
}

impl LoadBalancerTopology {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadBalancerTopology::Classic => "classic",
            LoadBalancerTopology::Application => "application",
        }
    }
}

impl fmt::Display for LoadBalancerTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadBalancerTopology {
    type Err = ControlPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(LoadBalancerTopology::Classic),
            "application" => Ok(LoadBalancerTopology::Application),
            _ => Err(ControlPlaneError::UnsupportedTopology(s.to_string())),
        }
    }
}
