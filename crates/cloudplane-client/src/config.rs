//! Client configuration
//!
//! Loaded from environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `CLOUDPLANE_URL` | required |
//! | `CLOUDPLANE_USERNAME` | required |
//! | `CLOUDPLANE_PASSWORD` | required |
//! | `CLOUDPLANE_PAGE_SIZE` | 50 |
//! | `CLOUDPLANE_POLL_INTERVAL_SECS` | 5 |
//! | `CLOUDPLANE_JOB_TIMEOUT_SECS` | 1800 |
//! | `CLOUDPLANE_REQUEST_TIMEOUT_SECS` | 30 |

use crate::error::{ControlPlaneError, Result};
use crate::jobs::JobPolicy;
use crate::paging::DEFAULT_PAGE_SIZE;
use std::fmt;
use std::time::Duration;

pub const ENV_URL: &str = "CLOUDPLANE_URL";
pub const ENV_USERNAME: &str = "CLOUDPLANE_USERNAME";
pub const ENV_PASSWORD: &str = "CLOUDPLANE_PASSWORD";
pub const ENV_PAGE_SIZE: &str = "CLOUDPLANE_PAGE_SIZE";
pub const ENV_POLL_INTERVAL_SECS: &str = "CLOUDPLANE_POLL_INTERVAL_SECS";
pub const ENV_JOB_TIMEOUT_SECS: &str = "CLOUDPLANE_JOB_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CLOUDPLANE_REQUEST_TIMEOUT_SECS";

/// Per-request HTTP timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Long-lived account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything needed to build a [`ControlPlaneClient`](crate::ControlPlaneClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub page_size: usize,
    pub job_policy: JobPolicy,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default paging, polling and timeouts
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Credentials::new(username, password),
            page_size: DEFAULT_PAGE_SIZE,
            job_policy: JobPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = required(&lookup, ENV_URL)?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ControlPlaneError::InvalidConfig(format!(
                "{ENV_URL} must be an http(s) URL, got {base_url}"
            )));
        }

        let mut config = Self::new(
            base_url,
            required(&lookup, ENV_USERNAME)?,
            required(&lookup, ENV_PASSWORD)?,
        );

        config.page_size = usize::try_from(positive(&lookup, ENV_PAGE_SIZE, DEFAULT_PAGE_SIZE as u64)?)
            .map_err(|e| ControlPlaneError::InvalidConfig(format!("{ENV_PAGE_SIZE}: {e}")))?;
        config.job_policy = JobPolicy {
            poll_interval: Duration::from_secs(positive(
                &lookup,
                ENV_POLL_INTERVAL_SECS,
                config.job_policy.poll_interval.as_secs(),
            )?),
            timeout: Duration::from_secs(positive(
                &lookup,
                ENV_JOB_TIMEOUT_SECS,
                config.job_policy.timeout.as_secs(),
            )?),
        };
        config.request_timeout = Duration::from_secs(positive(
            &lookup,
            ENV_REQUEST_TIMEOUT_SECS,
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        )?);

        Ok(config)
    }
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ControlPlaneError::InvalidConfig(format!("{key} environment variable is required"))
        })
}

fn positive<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u64) -> Result<u64> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ControlPlaneError::InvalidConfig(format!(
            "{key} must be greater than zero"
        ))),
        Ok(value) => Ok(value),
        Err(e) => Err(ControlPlaneError::InvalidConfig(format!(
            "{key}={raw} is not a number: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        (ENV_URL, "http://zstack:8080/zstack/"),
        (ENV_USERNAME, "admin"),
        (ENV_PASSWORD, "password"),
    ];

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.base_url, "http://zstack:8080/zstack");
        assert_eq!(config.credentials, Credentials::new("admin", "password"));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.job_policy.poll_interval, Duration::from_secs(5));
        assert_eq!(config.job_policy.timeout, Duration::from_secs(1800));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            (ENV_PAGE_SIZE, "200"),
            (ENV_POLL_INTERVAL_SECS, "2"),
            (ENV_JOB_TIMEOUT_SECS, "600"),
            (ENV_REQUEST_TIMEOUT_SECS, "10"),
        ]);
        let config = ClientConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.page_size, 200);
        assert_eq!(config.job_policy.poll_interval, Duration::from_secs(2));
        assert_eq!(config.job_policy.timeout, Duration::from_secs(600));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_password() {
        let err = ClientConfig::from_lookup(lookup(&BASE[..2])).unwrap_err();
        assert!(err.to_string().contains(ENV_PASSWORD));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = BASE.to_vec();
        vars.push((ENV_PAGE_SIZE, "0"));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&vars)),
            Err(ControlPlaneError::InvalidConfig(_))
        ));

        let mut vars = BASE.to_vec();
        vars.push((ENV_JOB_TIMEOUT_SECS, "half an hour"));
        assert!(ClientConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = BASE.to_vec();
        vars[0] = (ENV_URL, "zstack:8080");
        assert!(ClientConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = ClientConfig::new("http://zstack", "admin", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
