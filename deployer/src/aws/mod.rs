//! Deploy a single web server to AWS EC2.
//!
//! The instance is launched into the default VPC of the configured region with a security group
//! that opens the configured ports. The bootstrap script is passed as user data and executed on
//! first boot.

use crate::{
    cloud::IngressRule,
    provision::{self, Request, Wait, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

mod create;
pub use create::{create, until_interrupted};
pub mod ec2;
pub mod services;

pub const CREATE_CMD: &str = "create";
pub const TEMPLATE_CMD: &str = "template";

/// Region used if none is configured
const DEFAULT_REGION: &str = "us-east-1";

/// Instance type used if none is configured
const DEFAULT_INSTANCE_TYPE: &str = "t3.medium";

/// Security group name used if none is configured
const DEFAULT_SECURITY_GROUP: &str = "langraph-web-sg";

/// Security group description used if none is configured
const DEFAULT_DESCRIPTION: &str = "Security group for Langraph web server";

/// Instance name tag used if none is configured
const DEFAULT_TAG: &str = "LangraphWebServer";

/// Source range allowed by the default ports
const DEFAULT_CIDR: &str = "0.0.0.0/0";

/// Errors that can occur when deploying to AWS
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroField(&'static str),
    #[error("failed to read user data from {path:?}: {source}")]
    UserData {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("provisioning failed: {0}")]
    Provision(#[from] provision::Error),
}

/// An inbound port to open on the security group
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PortConfig {
    pub protocol: String,
    pub port: u16,
    pub cidr: String,
}

impl From<&PortConfig> for IngressRule {
    fn from(port: &PortConfig) -> Self {
        Self {
            protocol: port.protocol.clone(),
            port: port.port,
            cidr: port.cidr.clone(),
        }
    }
}

/// How to decide that the web server has started
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessConfig {
    /// Wait `settle_secs` and assume the bootstrap script finished
    #[default]
    Delay,

    /// Poll the web server root for up to `settle_secs`
    Http,
}

/// Deployment configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_region")]
    pub region: String,
    pub image: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    pub key_name: String,
    #[serde(default = "default_security_group")]
    pub security_group: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_ports")]
    pub ports: Vec<PortConfig>,

    /// Script to run on first boot (defaults to [services::BOOTSTRAP_SCRIPT])
    #[serde(default)]
    pub user_data: Option<PathBuf>,
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_instance_type() -> String {
    DEFAULT_INSTANCE_TYPE.to_string()
}

fn default_security_group() -> String {
    DEFAULT_SECURITY_GROUP.to_string()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_ports() -> Vec<PortConfig> {
    [22, 80]
        .into_iter()
        .map(|port| PortConfig {
            protocol: "tcp".to_string(),
            port,
            cidr: DEFAULT_CIDR.to_string(),
        })
        .collect()
}

fn default_settle_secs() -> u64 {
    DEFAULT_SETTLE_DELAY.as_secs()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_wait_timeout_secs() -> u64 {
    provision::DEFAULT_WAIT_TIMEOUT.as_secs()
}

impl Config {
    /// Loads and validates a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        Self::parse(file)
    }

    /// Parses and validates a configuration from YAML.
    pub fn parse(reader: impl std::io::Read) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        let required = [
            ("region", &self.region),
            ("image", &self.image),
            ("instance_type", &self.instance_type),
            ("key_name", &self.key_name),
            ("security_group", &self.security_group),
            ("tag", &self.tag),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingField(field));
            }
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::ZeroField("poll_interval_secs"));
        }
        Ok(())
    }

    /// Builds the provisioning request, reading the user data script if one is configured.
    pub fn request(&self) -> Result<Request, Error> {
        let user_data = match &self.user_data {
            Some(path) => std::fs::read_to_string(path).map_err(|source| Error::UserData {
                path: path.clone(),
                source,
            })?,
            None => services::BOOTSTRAP_SCRIPT.to_string(),
        };
        Ok(Request {
            region: self.region.clone(),
            image: self.image.clone(),
            instance_type: self.instance_type.clone(),
            key_name: self.key_name.clone(),
            security_group: self.security_group.clone(),
            description: self.description.clone(),
            ports: self.ports.iter().map(IngressRule::from).collect(),
            tag: self.tag.clone(),
            user_data,
        })
    }

    pub fn wait(&self) -> Wait {
        Wait {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: Duration::from_secs(self.wait_timeout_secs),
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}
