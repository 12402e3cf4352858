//! Decide when a freshly booted instance is ready to serve traffic.

use super::Deadline;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Maximum time to wait for a single health request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Reports whether the application on `address` is ready.
pub trait Readiness: Send + Sync {
    fn is_ready(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// Waits a fixed duration and assumes the bootstrap script has completed.
///
/// Nothing is verified: the instance is reported ready once the delay elapses.
#[derive(Clone, Copy, Debug)]
pub struct Delay {
    pub duration: Duration,
}

impl Delay {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Readiness for Delay {
    async fn is_ready(&self, address: &str) -> bool {
        info!(address, delay = ?self.duration, "waiting for web server to start");
        sleep(self.duration).await;
        true
    }
}

/// Polls `http://{address}{path}` until it responds with a success status.
#[derive(Clone, Debug)]
pub struct Http {
    client: reqwest::Client,
    path: String,
    interval: Duration,
    timeout: Duration,
}

impl Http {
    pub fn new(path: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            path: path.into(),
            interval,
            timeout,
        }
    }

    /// Replaces the HTTP client used for health requests.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl Readiness for Http {
    async fn is_ready(&self, address: &str) -> bool {
        let url = format!("http://{}{}", address, self.path);
        info!(url = url.as_str(), timeout = ?self.timeout, "polling web server");
        let deadline = Deadline::after(self.timeout);
        loop {
            match self.client.get(&url).timeout(REQUEST_TIMEOUT).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(url = url.as_str(), "web server is ready");
                    return true;
                }
                Ok(response) => {
                    debug!(url = url.as_str(), status = %response.status(), "web server not ready");
                }
                Err(err) => {
                    debug!(url = url.as_str(), error = %err, "web server unreachable");
                }
            }
            if deadline.passed_after(self.interval) {
                warn!(url = url.as_str(), "web server not ready before timeout");
                return false;
            }
            sleep(self.interval).await;
        }
    }
}
