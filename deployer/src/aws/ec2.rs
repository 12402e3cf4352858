//! [Cloud] implementation backed by the AWS EC2 SDK

use crate::cloud::{Cloud, CloudError, ErrorKind, IngressRule, Instance, InstanceState, LaunchSpec};
use aws_config::BehaviorVersion;
pub use aws_config::Region;
use aws_sdk_ec2::{
    config::retry::ReconnectMode,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{
        Filter, InstanceStateName, InstanceType, IpPermission, IpRange, ResourceType, Tag,
        TagSpecification,
    },
    Client as Ec2Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{error::Error as StdError, fmt::Debug, time::Duration};
use tracing::debug;
use uuid::Uuid;

/// Maximum attempts for a single EC2 API call (including retries)
const MAX_ATTEMPTS: u32 = 10;

/// Creates an EC2 client for the specified AWS region
pub async fn create_client(region: Region) -> Ec2Client {
    let retry = aws_config::retry::RetryConfig::adaptive()
        .with_max_attempts(MAX_ATTEMPTS)
        .with_initial_backoff(Duration::from_millis(500))
        .with_max_backoff(Duration::from_secs(30))
        .with_reconnect_mode(ReconnectMode::ReconnectOnTransientError);
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .retry_config(retry)
        .load()
        .await;
    Ec2Client::new(&config)
}

/// Codes returned once the client has exhausted its retries against API rate limits
const THROTTLING_CODES: &[&str] = &["RequestLimitExceeded", "Throttling", "ThrottlingException"];

/// Maps an EC2 error code onto an [ErrorKind].
///
/// EC2 codes follow a `<Resource>.<Condition>` convention (e.g. `InvalidGroup.Duplicate`).
/// Errors without a code never reached the service.
pub fn classify(code: Option<&str>) -> ErrorKind {
    match code {
        Some(code) if code.ends_with(".Duplicate") => ErrorKind::Duplicate,
        Some(code) if code.ends_with(".NotFound") => ErrorKind::NotFound,
        Some(code) if THROTTLING_CODES.contains(&code) => ErrorKind::Other,
        Some(_) => ErrorKind::Rejected,
        None => ErrorKind::Other,
    }
}

fn cloud_error<E, R>(err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    let kind = classify(err.code());
    CloudError::new(kind, DisplayErrorContext(&err).to_string())
}

fn missing(field: &str) -> CloudError {
    CloudError::new(ErrorKind::Other, format!("response missing {field}"))
}

fn state(name: &InstanceStateName) -> InstanceState {
    match name {
        InstanceStateName::Running => InstanceState::Running,
        InstanceStateName::Stopping => InstanceState::Stopping,
        InstanceStateName::Stopped => InstanceState::Stopped,
        InstanceStateName::ShuttingDown => InstanceState::ShuttingDown,
        InstanceStateName::Terminated => InstanceState::Terminated,
        _ => InstanceState::Pending,
    }
}

fn ip_permission(rule: &IngressRule) -> IpPermission {
    IpPermission::builder()
        .ip_protocol(&rule.protocol)
        .from_port(i32::from(rule.port))
        .to_port(i32::from(rule.port))
        .ip_ranges(IpRange::builder().cidr_ip(&rule.cidr).build())
        .build()
}

/// EC2 control plane for a single region
#[derive(Clone)]
pub struct Ec2 {
    client: Ec2Client,
}

impl Ec2 {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }

    /// Creates a client for `region` with adaptive retries.
    pub async fn connect(region: Region) -> Self {
        Self::new(create_client(region).await)
    }
}

impl Cloud for Ec2 {
    async fn describe_default_network(&self) -> Result<Option<String>, CloudError> {
        let resp = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("is-default").values("true").build())
            .send()
            .await
            .map_err(cloud_error)?;
        Ok(resp
            .vpcs()
            .first()
            .and_then(|vpc| vpc.vpc_id())
            .map(String::from))
    }

    async fn create_security_group(
        &self,
        network: &str,
        name: &str,
        description: &str,
    ) -> Result<String, CloudError> {
        let resp = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .vpc_id(network)
            .send()
            .await
            .map_err(cloud_error)?;
        resp.group_id()
            .map(String::from)
            .ok_or_else(|| missing("group id"))
    }

    async fn find_security_group(
        &self,
        network: &str,
        name: &str,
    ) -> Result<Option<String>, CloudError> {
        let resp = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(name).build())
            .filters(Filter::builder().name("vpc-id").values(network).build())
            .send()
            .await
            .map_err(cloud_error)?;
        Ok(resp
            .security_groups()
            .first()
            .and_then(|sg| sg.group_id())
            .map(String::from))
    }

    async fn authorize_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
    ) -> Result<(), CloudError> {
        if rules.is_empty() {
            return Ok(());
        }
        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .set_ip_permissions(Some(rules.iter().map(ip_permission).collect()))
            .send()
            .await
            .map_err(cloud_error)?;
        Ok(())
    }

    async fn create_instance(&self, spec: &LaunchSpec<'_>) -> Result<String, CloudError> {
        // Retries of this request reuse the token, so EC2 launches at most one instance
        let token = Uuid::new_v4().to_string();
        debug!(token = token.as_str(), "launching with client token");
        let resp = self
            .client
            .run_instances()
            .image_id(spec.image)
            .instance_type(InstanceType::from(spec.instance_type))
            .key_name(spec.key_name)
            .min_count(1)
            .max_count(1)
            .security_group_ids(spec.group_id)
            .user_data(STANDARD.encode(spec.user_data))
            .client_token(token)
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::Instance)
                    .tags(Tag::builder().key("Name").value(spec.tag).build())
                    .build(),
            )
            .send()
            .await
            .map_err(cloud_error)?;
        resp.instances()
            .first()
            .and_then(|instance| instance.instance_id())
            .map(String::from)
            .ok_or_else(|| missing("instance id"))
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Instance, CloudError> {
        let resp = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(cloud_error)?;
        let instance = resp
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .next()
            .ok_or_else(|| CloudError::new(ErrorKind::NotFound, instance_id))?;
        let state = instance
            .state()
            .and_then(|s| s.name())
            .map(state)
            .unwrap_or(InstanceState::Pending);
        Ok(Instance {
            id: instance_id.to_string(),
            state,
            public_ip: instance.public_ip_address().map(String::from),
        })
    }

    async fn enable_monitoring(&self, instance_id: &str) -> Result<(), CloudError> {
        self.client
            .monitor_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(cloud_error)?;
        Ok(())
    }
}
