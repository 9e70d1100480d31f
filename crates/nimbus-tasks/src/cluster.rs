use crate::context::TaskScope;
use crate::error::Result;
use nimbus_client::ClientError;
use nimbus_core::model::{ClusterHandle, ClusterName, ClusterStatus};

/// Provisions `cluster` from `template`. A failure while launching is
/// returned as is; no `error` status is pushed on its behalf.
pub async fn start(scope: &TaskScope<'_>, cluster: &ClusterName, template: &str) -> Result<()> {
    let config = scope.fetch_config().await?;
    let mut handle = ClusterHandle::new(cluster.clone(), Some(template.to_string()));
    scope.report(handle.status()).await?;

    scope
        .ctx
        .provider
        .launch(config.path(), cluster, template, &scope.log)
        .await?;

    handle.transition(ClusterStatus::Running)?;
    scope.report(handle.status()).await?;
    scope.log.info(format!("Cluster '{}' is running", cluster));
    Ok(())
}

/// Decommissions `cluster`. A cluster that no longer exists counts as
/// terminated.
pub async fn terminate(scope: &TaskScope<'_>, cluster: &ClusterName) -> Result<()> {
    let config = scope.fetch_config().await?;
    let mut handle = ClusterHandle::new(cluster.clone(), None);

    match scope
        .ctx
        .provider
        .terminate(config.path(), cluster, &scope.log)
        .await
    {
        Ok(()) => {}
        Err(ClientError::ClusterNotFound(_)) => {
            scope.log.warn(format!(
                "Cluster '{}' does not exist, treating it as terminated",
                cluster
            ));
        }
        Err(e) => return Err(e.into()),
    }

    handle.transition(ClusterStatus::Terminated)?;
    scope.report(handle.status()).await
}
