//! Provision a single cloud instance that serves a web application.
//!
//! A deployment resolves (or creates) a security group in the default network, launches exactly
//! one instance carrying a bootstrap script as user data, requests detailed monitoring, waits for
//! the bootstrap script to settle, and reports the endpoints at which the application should be
//! reachable.
//!
//! # Lifecycle
//!
//! ```txt
//! Start -> GroupResolved -> InstanceRunning -> MonitoringAttempted -> Settled -> Reported
//! ```
//!
//! There is no rollback. If a step fails, resources created by earlier steps are left in place
//! for manual inspection.
//!
//! # Providers
//!
//! The orchestrator only depends on the [cloud::Cloud] capability trait. The `aws` feature
//! (enabled by default) provides an implementation backed by EC2 and the `deployer` binary.
//!
//! # Example Configuration
//!
//! ```yaml
//! region: us-east-1
//! image: ami-0c94855ba95c71c99
//! instance_type: t3.medium
//! key_name: my-ec2-keypair
//! security_group: langraph-web-sg
//! tag: LangraphWebServer
//! ports:
//!   - protocol: tcp
//!     port: 22
//!     cidr: 0.0.0.0/0
//!   - protocol: tcp
//!     port: 80
//!     cidr: 0.0.0.0/0
//! settle_secs: 60
//! readiness: delay
//! ```

pub mod cloud;
pub mod provision;

#[cfg(test)]
pub mod mocks;

cfg_if::cfg_if! {
    if #[cfg(feature = "aws")] {
        pub mod aws;
    }
}
