use crate::cloud::Cloud;
use tracing::{info, warn};

/// Requests detailed monitoring for `instance_id`.
///
/// Monitoring is optional, so failures are logged and reported as `false` instead of aborting
/// the deployment.
pub async fn enable<C: Cloud>(cloud: &C, instance_id: &str) -> bool {
    match cloud.enable_monitoring(instance_id).await {
        Ok(()) => {
            info!(instance = instance_id, "enabled detailed monitoring");
            true
        }
        Err(err) => {
            warn!(instance = instance_id, error = %err, "could not enable monitoring");
            false
        }
    }
}
