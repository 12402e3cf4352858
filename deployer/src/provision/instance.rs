use super::{Deadline, Error, Request, Wait};
use crate::cloud::{Cloud, ErrorKind, Instance, InstanceState, LaunchSpec};
use tokio::time::sleep;
use tracing::{debug, info};

/// Launches one instance for `request` in `group_id` and waits for it to run.
///
/// Returns the instance once it is running, along with its public address.
pub async fn launch<C: Cloud>(
    cloud: &C,
    request: &Request,
    group_id: &str,
    wait: Wait,
) -> Result<(Instance, String), Error> {
    let spec = LaunchSpec {
        image: &request.image,
        instance_type: &request.instance_type,
        key_name: &request.key_name,
        group_id,
        tag: &request.tag,
        user_data: &request.user_data,
    };
    let instance_id = cloud
        .create_instance(&spec)
        .await
        .map_err(|source| Error::Launch {
            tag: request.tag.clone(),
            source,
        })?;
    info!(
        instance = instance_id.as_str(),
        tag = request.tag.as_str(),
        "launching instance"
    );
    wait_until_running(cloud, &instance_id, wait).await?;

    // Addresses are assigned on the transition to running, so read the instance again
    let instance = cloud
        .describe_instance(&instance_id)
        .await
        .map_err(|source| Error::Describe {
            instance_id: instance_id.clone(),
            source,
        })?;
    let Some(ip) = instance.public_ip.clone() else {
        return Err(Error::MissingAddress(instance_id));
    };
    info!(instance = instance_id.as_str(), ip = ip.as_str(), "instance is running");
    Ok((instance, ip))
}

/// Polls `instance_id` every `wait.interval` until it is running.
///
/// Fails if the instance enters a terminal state or if it is not running after `wait.timeout`.
pub async fn wait_until_running<C: Cloud>(
    cloud: &C,
    instance_id: &str,
    wait: Wait,
) -> Result<(), Error> {
    let deadline = Deadline::after(wait.timeout);
    loop {
        let state = match cloud.describe_instance(instance_id).await {
            Ok(instance) => instance.state,

            // New instances may not be visible to describe calls yet
            Err(err) if err.kind == ErrorKind::NotFound => InstanceState::Pending,
            Err(source) => {
                return Err(Error::Describe {
                    instance_id: instance_id.to_string(),
                    source,
                })
            }
        };
        match state {
            InstanceState::Running => return Ok(()),
            state if state.is_terminal() => {
                return Err(Error::InstanceStopped {
                    instance_id: instance_id.to_string(),
                    state,
                });
            }
            state => {
                if deadline.passed_after(wait.interval) {
                    return Err(Error::WaitTimeout {
                        instance_id: instance_id.to_string(),
                        state,
                        timeout: wait.timeout,
                    });
                }
                debug!(instance = instance_id, %state, "waiting for instance to run");
            }
        }
        sleep(wait.interval).await;
    }
}
