//! `create` subcommand

use crate::{
    aws::{
        ec2::{Ec2, Region},
        Config, Error, ReadinessConfig,
    },
    provision::{
        readiness::{Delay, Http},
        Deployment, Orchestrator, FEATURE_PATH,
    },
};
use std::{future::Future, io, path::PathBuf, time::Duration};
use tracing::{info, warn};

/// Interval between HTTP readiness checks
const HTTP_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Provisions the instance described by the configuration at `config_path`
pub async fn create(config_path: &PathBuf) -> Result<Deployment, Error> {
    // Load configuration from YAML file
    let config = Config::load(config_path)?;
    info!(
        region = config.region.as_str(),
        tag = config.tag.as_str(),
        "loaded configuration"
    );
    let request = config.request()?;

    // Create client for region
    let cloud = Ec2::connect(Region::new(config.region.clone())).await;
    info!(region = config.region.as_str(), "created EC2 client");

    // Run deployment
    let deployment = match config.readiness {
        ReadinessConfig::Delay => {
            let readiness = Delay::new(config.settle());
            Orchestrator::new(cloud, request, readiness)
                .with_wait(config.wait())
                .run()
                .await?
        }
        ReadinessConfig::Http => {
            let readiness = Http::new("/", HTTP_POLL_INTERVAL, config.settle());
            Orchestrator::new(cloud, request, readiness)
                .with_wait(config.wait())
                .run()
                .await?
        }
    };
    info!(
        url = %deployment.root_url(),
        "website should be available"
    );
    info!(
        url = %deployment.feature_url(),
        path = FEATURE_PATH,
        "feature endpoint available (POST JSON with a text field)"
    );
    info!(
        instance = deployment.instance_id.as_str(),
        monitoring = deployment.monitoring,
        "monitor the instance in the AWS console for resource usage and uptime"
    );
    Ok(deployment)
}

/// Runs `task` until it completes or `signal` fires.
///
/// Returns `None` if interrupted. If `signal` fails to install, `task` runs to completion.
pub async fn until_interrupted<T>(
    task: impl Future<Output = T>,
    signal: impl Future<Output = io::Result<()>>,
) -> Option<T> {
    tokio::pin!(task);
    tokio::select! {
        output = &mut task => Some(output),
        result = signal => match result {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "failed to listen for interrupts");
                Some(task.await)
            }
        },
    }
}
