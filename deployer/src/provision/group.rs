use super::Error;
use crate::cloud::{Cloud, IngressRule};
use tracing::info;

/// Ensures a security group named `name` exists in `network` and returns its identifier.
///
/// A newly created group receives `rules`. If the provider reports that the group already
/// exists, the existing identifier is looked up and returned with its rules left untouched.
pub async fn resolve<C: Cloud>(
    cloud: &C,
    network: &str,
    name: &str,
    description: &str,
    rules: &[IngressRule],
) -> Result<String, Error> {
    let group_id = match cloud.create_security_group(network, name, description).await {
        Ok(group_id) => group_id,
        Err(err) if err.is_duplicate() => {
            info!(name, network, "security group already exists");
            let group_id = cloud
                .find_security_group(network, name)
                .await
                .map_err(|source| Error::FindGroup {
                    name: name.to_string(),
                    source,
                })?
                .ok_or_else(|| Error::GroupNotFound(name.to_string()))?;
            info!(name, group_id, "using existing security group");
            return Ok(group_id);
        }
        Err(source) => {
            return Err(Error::CreateGroup {
                name: name.to_string(),
                source,
            })
        }
    };
    info!(name, group_id, "created security group");

    // Open configured ports
    cloud
        .authorize_ingress(&group_id, rules)
        .await
        .map_err(|source| Error::Authorize {
            group_id: group_id.clone(),
            source,
        })?;
    info!(group_id, rules = rules.len(), "configured security group ingress");
    Ok(group_id)
}
