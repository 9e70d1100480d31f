//! Integrations that provision, decommission and locate clusters. The
//! fetched configuration document is handed over as a local file path and
//! its format belongs to the provider.

mod inventory;
mod starcluster;

pub use inventory::InventoryProvider;
pub use starcluster::StarClusterProvider;

use crate::error::Result;
use crate::logs::LogCapture;
use crate::ssh::{ControlNode, RemoteConnector};
use async_trait::async_trait;
use nimbus_core::config::{ProviderConfig, ProviderKind, SshConfig};
use nimbus_core::model::ClusterName;
use std::path::Path;
use std::sync::Arc;

#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Brings up `name` from `template`. Blocks until the cluster is usable.
    async fn launch(
        &self,
        config: &Path,
        name: &ClusterName,
        template: &str,
        capture: &LogCapture,
    ) -> Result<()>;

    /// Fails with `ClientError::ClusterNotFound` when there is nothing to
    /// terminate.
    async fn terminate(&self, config: &Path, name: &ClusterName, capture: &LogCapture)
        -> Result<()>;

    async fn control_node(&self, config: &Path, name: &ClusterName) -> Result<ControlNode>;
}

pub fn from_config(
    config: &ProviderConfig,
    ssh: &SshConfig,
    connector: Arc<dyn RemoteConnector>,
) -> Arc<dyn ClusterProvider> {
    match config.kind {
        ProviderKind::Starcluster => Arc::new(StarClusterProvider::new(
            config.program.clone(),
            ssh.user.clone(),
        )),
        ProviderKind::Inventory => Arc::new(InventoryProvider::new(connector)),
    }
}
