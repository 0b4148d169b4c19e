//! Asynchronous job handling for mutating calls
//!
//! Creates, actions and deletes may be accepted asynchronously: the response then
//! carries a `location` pointing at a job resource. The job is polled with a plain
//! `GET` at a fixed interval until it answers 200, or until the ceiling measured
//! from the submission has passed.
//!
//! Any non-200 poll status counts as "still pending". A job that failed
//! server-side is therefore indistinguishable from a slow one and runs into the
//! timeout.
//!
//! The ceiling is inclusive: a poll answered at or after it ends the wait with
//! [`ControlPlaneError::JobTimeout`]. Waits between polls keep the fixed interval
//! except the last one, which is shortened so that a final poll lands exactly on
//! the ceiling instead of up to one interval past it.

use crate::common::{ApiRequest, Envelope};
use crate::error::{ControlPlaneError, Result};
use crate::transport_trait::Transport;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between job status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling on the time a job may take, measured from submission
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How jobs are awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

/// Issues mutating calls and waits for any job they spawn
#[derive(Debug)]
pub struct JobAwaitingInvoker<'a, T: Transport + ?Sized> {
    transport: &'a T,
    policy: JobPolicy,
    cancel: CancellationToken,
}

impl<'a, T: Transport + ?Sized> JobAwaitingInvoker<'a, T> {
    /// Create an invoker with the default policy
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            policy: JobPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Override interval and ceiling
    #[must_use]
    pub fn with_policy(mut self, policy: JobPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort polling when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Issue `request`; if it returns a job location, wait for the job.
    ///
    /// # Returns
    /// * `Ok(Envelope)` - The initial response when no job was spawned,
    ///   otherwise the first successful job status response
    /// * `Err(ControlPlaneError::JobTimeout)` - The job was still pending at the ceiling
    /// * `Err(ControlPlaneError::JobCancelled)` - The cancellation token fired
    /// * `Err(ControlPlaneError::Transport)` - Submission failed or a poll could not be sent
    pub async fn invoke(&self, request: ApiRequest) -> Result<Envelope> {
        let submitted = Instant::now();
        let method = request.method.to_string();
        let target = request.target_str().to_string();
        let params = request.params_string();

        let envelope = self.transport.send(request).await?;
        let Some(location) = envelope.location().map(str::to_string) else {
            return Ok(envelope);
        };

        debug!("{} {} accepted as job {}", method, target, location);
        self.await_job(&location, submitted, &method, &target, &params)
            .await
    }

    async fn await_job(
        &self,
        location: &str,
        submitted: Instant,
        method: &str,
        target: &str,
        params: &str,
    ) -> Result<Envelope> {
        let deadline = submitted + self.policy.timeout;

        loop {
            let response = self.transport.execute(ApiRequest::poll(location)).await?;
            if response.status == 200 {
                info!(
                    "Job {} for {} {} completed after {:?}",
                    location,
                    method,
                    target,
                    submitted.elapsed()
                );
                return Ok(Envelope::new(response.status, response.body));
            }

            let elapsed = submitted.elapsed();
            if elapsed >= self.policy.timeout {
                warn!(
                    "Job {} for {} {} still pending after {:?}",
                    location, method, target, elapsed
                );
                return Err(ControlPlaneError::JobTimeout {
                    method: method.to_string(),
                    url: target.to_string(),
                    params: params.to_string(),
                    elapsed,
                });
            }

            debug!(
                "Wait for job {} ({} {} {}) to complete, status {}",
                location, method, target, params, response.status
            );
            let wake = std::cmp::min(Instant::now() + self.policy.poll_interval, deadline);
            tokio::select! {
                () = sleep_until(wake) => {}
                () = self.cancel.cancelled() => {
                    return Err(ControlPlaneError::JobCancelled {
                        url: location.to_string(),
                    });
                }
            }
        }
    }
}
