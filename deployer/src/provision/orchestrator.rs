use super::{enable, launch, resolve, Deployment, Error, Readiness, Request, Stage, Wait};
use crate::cloud::Cloud;
use tracing::{debug, info, warn};

/// Sequences a single deployment.
///
/// Dropping the future returned by [Orchestrator::run] cancels the deployment at its current
/// suspension point. Resources created before cancellation are left in place.
pub struct Orchestrator<C: Cloud, R: Readiness> {
    cloud: C,
    request: Request,
    readiness: R,
    wait: Wait,
}

impl<C: Cloud, R: Readiness> Orchestrator<C, R> {
    pub fn new(cloud: C, request: Request, readiness: R) -> Self {
        Self {
            cloud,
            request,
            readiness,
            wait: Wait::default(),
        }
    }

    /// Overrides the bounds used while waiting for the instance to run.
    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    /// Provisions the instance and returns its deployment.
    pub async fn run(&self) -> Result<Deployment, Error> {
        let request = &self.request;
        info!(
            region = request.region.as_str(),
            tag = request.tag.as_str(),
            "starting deployment"
        );
        transition(Stage::Start);

        // Resolve security group in the default network
        let network = self
            .cloud
            .describe_default_network()
            .await
            .map_err(Error::DescribeNetwork)?
            .ok_or(Error::NoDefaultNetwork)?;
        debug!(network = network.as_str(), "found default network");
        let group_id = resolve(
            &self.cloud,
            &network,
            &request.security_group,
            &request.description,
            &request.ports,
        )
        .await?;
        transition(Stage::GroupResolved);

        // Launch instance
        let (instance, ip) = launch(&self.cloud, request, &group_id, self.wait).await?;
        transition(Stage::InstanceRunning);

        // Enable monitoring
        let monitoring = enable(&self.cloud, &instance.id).await;
        transition(Stage::MonitoringAttempted);

        // Wait for the bootstrap script
        if !self.readiness.is_ready(&ip).await {
            warn!(
                instance = instance.id.as_str(),
                ip = ip.as_str(),
                "web server did not report ready"
            );
        }
        transition(Stage::Settled);

        // Report
        let deployment = Deployment {
            instance_id: instance.id,
            ip,
            monitoring,
        };
        info!(
            instance = deployment.instance_id.as_str(),
            ip = deployment.ip.as_str(),
            monitoring = deployment.monitoring,
            root = %deployment.root_url(),
            feature = %deployment.feature_url(),
            "deployment complete"
        );
        transition(Stage::Reported);
        Ok(deployment)
    }
}

fn transition(stage: Stage) {
    debug!(%stage, "deployment stage");
}
