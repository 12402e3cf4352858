//! Provision a single web server instance.

use crate::cloud::{CloudError, IngressRule, InstanceState};
use std::{fmt, time::Duration};
use thiserror::Error;
use tokio::time::Instant;

mod group;
pub use group::resolve;
mod instance;
pub use instance::{launch, wait_until_running};
mod monitoring;
pub use monitoring::enable;
mod orchestrator;
pub use orchestrator::Orchestrator;
pub mod readiness;
pub use readiness::Readiness;

/// Default interval between instance state checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on the time spent waiting for an instance to run
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default time given to the bootstrap script after the instance is running
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(60);

/// Path of the application feature advertised once the deployment settles
pub const FEATURE_PATH: &str = "/ai";

/// Fatal provisioning errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("no default network found")]
    NoDefaultNetwork,
    #[error("failed to describe default network: {0}")]
    DescribeNetwork(#[source] CloudError),
    #[error("failed to create security group {name}: {source}")]
    CreateGroup {
        name: String,
        #[source]
        source: CloudError,
    },
    #[error("failed to authorize ingress on security group {group_id}: {source}")]
    Authorize {
        group_id: String,
        #[source]
        source: CloudError,
    },
    #[error("security group {0} reported as duplicate but not found")]
    GroupNotFound(String),
    #[error("failed to look up security group {name}: {source}")]
    FindGroup {
        name: String,
        #[source]
        source: CloudError,
    },
    #[error("failed to launch instance {tag}: {source}")]
    Launch {
        tag: String,
        #[source]
        source: CloudError,
    },
    #[error("failed to describe instance {instance_id}: {source}")]
    Describe {
        instance_id: String,
        #[source]
        source: CloudError,
    },
    #[error("instance {instance_id} entered {state} while waiting to run")]
    InstanceStopped {
        instance_id: String,
        state: InstanceState,
    },
    #[error("instance {instance_id} not running after {timeout:?} (last state: {state})")]
    WaitTimeout {
        instance_id: String,
        state: InstanceState,
        timeout: Duration,
    },
    #[error("instance {0} is running but has no public address")]
    MissingAddress(String),
}

/// Immutable description of the deployment to perform.
#[derive(Clone, Debug)]
pub struct Request {
    pub region: String,
    pub image: String,
    pub instance_type: String,
    pub key_name: String,
    pub security_group: String,
    pub description: String,
    pub ports: Vec<IngressRule>,

    /// Value of the `Name` tag applied to the instance
    pub tag: String,

    /// Script executed by the instance on first boot
    pub user_data: String,
}

/// Bounds for the running-state poll loop.
#[derive(Clone, Copy, Debug)]
pub struct Wait {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Point after which a poll loop gives up.
///
/// Bounds too large to represent as an [Instant] never expire.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub(crate) fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// Returns true if waiting another `interval` would pass the deadline.
    pub(crate) fn passed_after(&self, interval: Duration) -> bool {
        let Some(deadline) = self.0 else {
            return false;
        };
        Instant::now()
            .checked_add(interval)
            .map_or(true, |next| next > deadline)
    }
}

/// Outcome of a successful deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub instance_id: String,
    pub ip: String,
    pub monitoring: bool,
}

impl Deployment {
    /// URL of the application root
    pub fn root_url(&self) -> String {
        format!("http://{}/", self.ip)
    }

    /// URL of the application feature endpoint
    pub fn feature_url(&self) -> String {
        format!("http://{}{}", self.ip, FEATURE_PATH)
    }
}

/// Progress of a deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Start,
    GroupResolved,
    InstanceRunning,
    MonitoringAttempted,
    Settled,
    Reported,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::GroupResolved => "group_resolved",
            Self::InstanceRunning => "instance_running",
            Self::MonitoringAttempted => "monitoring_attempted",
            Self::Settled => "settled",
            Self::Reported => "reported",
        };
        f.write_str(name)
    }
}
