//! Load balancer target models
//!
//! Wire types mirror the provider's `DescribeTargets` / `DescribeClassicalLBTargets`
//! payloads (PascalCase keys). [`Backend`] is the domain view handed to callers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format of `RegisteredTime`
const REGISTERED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A traffic destination as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Target {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(default)]
    pub instance_name: String,
    #[serde(rename = "Type", default)]
    pub target_type: String,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(rename = "PublicIpAddresses", default)]
    pub public_ip_addresses: Vec<String>,
    #[serde(rename = "PrivateIpAddresses", default)]
    pub private_ip_addresses: Vec<String>,
    #[serde(default)]
    pub registered_time: String,
}

/// Listener-scoped forwarding rule (URL/domain match) with its own targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardingRule {
    #[serde(rename = "LocationId")]
    pub rule_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// One listener of an application load balancer with its default and rule-scoped targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerTargets {
    #[serde(rename = "ListenerId")]
    pub listener_id: String,
    pub protocol: String,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub rules: Vec<ForwardingRule>,
}

impl ListenerTargets {
    /// HTTP and HTTPS listeners route through rules; their targets can only be
    /// resolved with a rule id.
    pub fn requires_rule(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("HTTP") || self.protocol.eq_ignore_ascii_case("HTTPS")
    }

    /// Rule with the given id
    pub fn rule(&self, rule_id: &str) -> Option<&ForwardingRule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }
}

/// Which entity a backend group stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupScope {
    /// All targets of a classic load balancer
    LoadBalancer,
    /// Default targets of a listener
    Listener,
    /// Targets of a forwarding rule
    Rule,
}

/// A set of backends sharing one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendGroup {
    pub id: String,
    pub lb_id: String,
    pub scope: GroupScope,
}

impl BackendGroup {
    pub fn new(id: impl Into<String>, lb_id: impl Into<String>, scope: GroupScope) -> Self {
        Self {
            id: id.into(),
            lb_id: lb_id.into(),
            scope,
        }
    }

    /// Whether `backend` belongs to this group
    pub fn owns(&self, backend: &Backend) -> bool {
        backend.group_id == self.id
    }
}

/// A traffic destination owned by exactly one [`BackendGroup`].
///
/// The owner is referenced by id; use [`Backend::group`] to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub group_id: String,
    pub backend_id: String,
    pub instance_name: String,
    pub backend_type: String,
    pub port: u32,
    pub weight: u32,
    pub public_ip_addresses: Vec<String>,
    pub private_ip_addresses: Vec<String>,
    pub registered_time: String,
}

impl Backend {
    /// Domain view of `target`, owned by the group `group_id`
    pub fn from_target(group_id: &str, target: Target) -> Self {
        Self {
            group_id: group_id.to_string(),
            backend_id: target.instance_id,
            instance_name: target.instance_name,
            backend_type: target.target_type,
            port: target.port,
            weight: target.weight,
            public_ip_addresses: target.public_ip_addresses,
            private_ip_addresses: target.private_ip_addresses,
            registered_time: target.registered_time,
        }
    }

    /// `{group}/{backend}`
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.group_id, self.backend_id)
    }

    /// Owning group among `groups`
    pub fn group<'g>(&self, groups: &'g [BackendGroup]) -> Option<&'g BackendGroup> {
        groups.iter().find(|g| g.owns(self))
    }

    /// Registration time, when the API reported a parseable one
    pub fn registered_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.registered_time, REGISTERED_TIME_FORMAT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_listener_payload() {
        let listener: ListenerTargets = serde_json::from_value(json!({
            "ListenerId": "lbl-1",
            "Protocol": "HTTPS",
            "Port": 443,
            "Targets": [],
            "Rules": [{
                "LocationId": "loc-1",
                "Url": "/api",
                "Domain": "example.com",
                "Targets": [{
                    "InstanceId": "ins-1",
                    "InstanceName": "web-1",
                    "Type": "CVM",
                    "Port": 8080,
                    "Weight": 10,
                    "PrivateIpAddresses": ["10.0.0.4"],
                    "RegisteredTime": "2019-05-28 16:05:23"
                }]
            }]
        }))
        .unwrap();

        assert!(listener.requires_rule());
        let rule = listener.rule("loc-1").unwrap();
        assert_eq!(rule.targets[0].instance_id, "ins-1");
        assert_eq!(rule.targets[0].public_ip_addresses, Vec::<String>::new());
        assert!(listener.rule("loc-2").is_none());
    }

    #[test]
    fn test_tcp_listener_without_rules() {
        let listener: ListenerTargets = serde_json::from_value(json!({
            "ListenerId": "lbl-2",
            "Protocol": "TCP",
            "Targets": [{"InstanceId": "ins-2"}]
        }))
        .unwrap();
        assert!(!listener.requires_rule());
        assert!(listener.rules.is_empty());
        assert_eq!(listener.targets.len(), 1);
    }

    #[test]
    fn test_backend_group_back_reference() {
        let target: Target = serde_json::from_value(json!({
            "InstanceId": "ins-1",
            "Weight": 10,
            "Port": 80,
            "RegisteredTime": "2019-05-28 16:05:23"
        }))
        .unwrap();
        let backend = Backend::from_target("loc-1", target);
        let groups = [
            BackendGroup::new("lbl-1", "lb-1", GroupScope::Listener),
            BackendGroup::new("loc-1", "lb-1", GroupScope::Rule),
        ];

        assert_eq!(backend.display_name(), "loc-1/ins-1");
        assert_eq!(backend.group(&groups).unwrap().scope, GroupScope::Rule);
        assert!(!groups[0].owns(&backend));

        let at = backend.registered_at().unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2019, 5, 28));
        assert_eq!(at.hour(), 16);
    }

    #[test]
    fn test_unparseable_registration_time() {
        let backend = Backend::from_target(
            "lb-1",
            Target {
                instance_id: "ins-1".to_string(),
                instance_name: String::new(),
                target_type: String::new(),
                port: 0,
                weight: 0,
                public_ip_addresses: Vec::new(),
                private_ip_addresses: Vec::new(),
                registered_time: String::new(),
            },
        );
        assert!(backend.registered_at().is_none());
    }
}
