//! Capabilities the orchestrator requires from a cloud provider.

use std::{fmt, future::Future};
use thiserror::Error;

/// Classification of a provider failure.
///
/// Providers must map their own error codes onto these kinds so that callers never inspect
/// error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A resource with the same unique name already exists.
    Duplicate,

    /// The referenced resource does not exist.
    NotFound,

    /// The request was rejected (invalid parameters, quota, permissions).
    Rejected,

    /// Any other failure (transport, throttling exhausted, unknown codes).
    Other,
}

/// Failure returned by a [Cloud] operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct CloudError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CloudError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == ErrorKind::Duplicate
    }
}

/// A single inbound rule: traffic on `port` over `protocol` from `cidr`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IngressRule {
    pub protocol: String,
    pub port: u16,
    pub cidr: String,
}

impl IngressRule {
    pub fn tcp(port: u16, cidr: impl Into<String>) -> Self {
        Self {
            protocol: "tcp".to_string(),
            port,
            cidr: cidr.into(),
        }
    }
}

/// Lifecycle state reported for an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

impl InstanceState {
    /// Returns true if the instance can no longer reach the running state on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stopping | Self::Stopped | Self::ShuttingDown | Self::Terminated
        )
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Snapshot of an instance as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub state: InstanceState,

    /// Absent until the instance is running.
    pub public_ip: Option<String>,
}

/// Parameters for launching one instance.
#[derive(Clone, Debug)]
pub struct LaunchSpec<'a> {
    pub image: &'a str,
    pub instance_type: &'a str,
    pub key_name: &'a str,
    pub group_id: &'a str,

    /// Value of the `Name` tag.
    pub tag: &'a str,

    /// Executed once by the guest on first boot. Passed through unmodified.
    pub user_data: &'a str,
}

/// Control-plane operations consumed by the orchestrator.
///
/// Any provider exposing these operations can be substituted.
pub trait Cloud: Send + Sync {
    /// Returns the identifier of the default network, if one exists.
    fn describe_default_network(
        &self,
    ) -> impl Future<Output = Result<Option<String>, CloudError>> + Send;

    /// Creates a security group and returns its identifier.
    ///
    /// Must fail with [ErrorKind::Duplicate] if a group with `name` already exists in `network`.
    fn create_security_group(
        &self,
        network: &str,
        name: &str,
        description: &str,
    ) -> impl Future<Output = Result<String, CloudError>> + Send;

    /// Looks up a security group by name within `network`.
    fn find_security_group(
        &self,
        network: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, CloudError>> + Send;

    /// Adds the provided inbound rules to a security group.
    fn authorize_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
    ) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Requests exactly one instance and returns its identifier.
    fn create_instance(
        &self,
        spec: &LaunchSpec<'_>,
    ) -> impl Future<Output = Result<String, CloudError>> + Send;

    /// Returns the current state of an instance.
    fn describe_instance(
        &self,
        instance_id: &str,
    ) -> impl Future<Output = Result<Instance, CloudError>> + Send;

    /// Turns on detailed monitoring for an instance.
    fn enable_monitoring(
        &self,
        instance_id: &str,
    ) -> impl Future<Output = Result<(), CloudError>> + Send;
}
