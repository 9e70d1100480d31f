use super::ClusterProvider;
use crate::error::{ClientError, Result};
use crate::logs::LogCapture;
use crate::remote_command::RemoteCommand;
use crate::ssh::{ControlNode, RemoteConnector};
use async_trait::async_trait;
use nimbus_core::constants::inventory as names;
use nimbus_core::inventory::{Inventory, InventoryHost};
use nimbus_core::model::ClusterName;
use std::path::Path;
use std::sync::Arc;

/// A pre-provisioned cluster described by a host inventory. Launching only
/// checks that the template's hosts answer; terminating releases nothing.
pub struct InventoryProvider {
    connector: Arc<dyn RemoteConnector>,
}

impl InventoryProvider {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self { connector }
    }

    fn node_for(host: &InventoryHost) -> ControlNode {
        let user = names::USER_VARS
            .iter()
            .find_map(|var| host.variables.get(var))
            .map(String::from);
        ControlNode::new(host.host.clone(), user)
    }

    fn find_control_node(inventory: &Inventory) -> Option<ControlNode> {
        inventory
            .group(names::CONTROL_GROUP)
            .and_then(|g| g.hosts.first())
            .or_else(|| inventory.global_hosts.first())
            .map(Self::node_for)
    }
}

#[async_trait]
impl ClusterProvider for InventoryProvider {
    async fn launch(
        &self,
        config: &Path,
        name: &ClusterName,
        template: &str,
        capture: &LogCapture,
    ) -> Result<()> {
        let inventory = Inventory::from_path(config)?;
        let group = inventory
            .group(template)
            .ok_or_else(|| ClientError::UnknownTemplate(template.to_string()))?;

        capture.info(format!(
            "Bringing up cluster '{}' from {} host(s) in '{}'",
            name,
            group.hosts.len(),
            template
        ));

        for host in &group.hosts {
            let session = self.connector.connect(&Self::node_for(host)).await?;
            let answer = session.execute(&RemoteCommand::new("hostname")).await?;
            capture.info(format!(
                "{} is reachable ({})",
                host.host,
                answer.first().map(String::as_str).unwrap_or("no hostname")
            ));
        }
        Ok(())
    }

    async fn terminate(
        &self,
        config: &Path,
        name: &ClusterName,
        capture: &LogCapture,
    ) -> Result<()> {
        let inventory = Inventory::from_path(config)?;
        if Self::find_control_node(&inventory).is_none() {
            return Err(ClientError::ClusterNotFound(name.0.clone()));
        }
        capture.info(format!(
            "Cluster '{}' is statically provisioned, nothing to release",
            name
        ));
        Ok(())
    }

    async fn control_node(&self, config: &Path, name: &ClusterName) -> Result<ControlNode> {
        let inventory = Inventory::from_path(config)?;
        Self::find_control_node(&inventory)
            .ok_or_else(|| ClientError::ClusterNotFound(name.0.clone()))
    }
}
