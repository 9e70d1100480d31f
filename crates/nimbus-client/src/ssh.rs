use crate::error::{ClientError, Result};
use crate::remote_command::RemoteCommand;
use async_trait::async_trait;
use nimbus_core::config::SshConfig;
use nimbus_core::logging;
use std::fmt;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// The node of a cluster that accepts remote commands and file transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNode {
    pub host: String,
    pub user: Option<String>,
}

impl ControlNode {
    pub fn new(host: impl Into<String>, user: Option<String>) -> Self {
        Self {
            host: host.into(),
            user,
        }
    }

    pub fn address(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for ControlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    fn node(&self) -> &ControlNode;

    /// Runs `command` on the node and returns its standard output lines.
    async fn execute(&self, command: &RemoteCommand) -> Result<Vec<String>>;

    /// Copies a local file into `remote_dir`, keeping its file name.
    async fn put(&self, local: &Path, remote_dir: &str) -> Result<()>;
}

#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, node: &ControlNode) -> Result<Box<dyn RemoteExecutor>>;
}

pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RemoteConnector for SshConnector {
    async fn connect(&self, node: &ControlNode) -> Result<Box<dyn RemoteExecutor>> {
        let node = ControlNode {
            host: node.host.clone(),
            user: node.user.clone().or_else(|| self.config.user.clone()),
        };
        tracing::debug!("Opening ssh session to {}", node);
        Ok(Box::new(SshExecutor {
            node,
            config: self.config.clone(),
        }))
    }
}

pub struct SshExecutor {
    node: ControlNode,
    config: SshConfig,
}

impl SshExecutor {
    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.config.connect_timeout_secs));
        if let Some(identity) = &self.config.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.args(&self.config.extra_args);
        cmd.kill_on_drop(true);
        cmd
    }

    fn failure(&self, command: &str, message: String) -> ClientError {
        ClientError::RemoteCommandFailure {
            node: self.node.address(),
            command: command.to_string(),
            message,
        }
    }

    async fn run(&self, mut cmd: Command, shown: &str) -> Result<Output> {
        let pending = cmd.output();
        let result = match self.config.command_timeout() {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                self.failure(shown, format!("timed out after {}s", limit.as_secs()))
            })?,
            None => pending.await,
        };

        let output = result.map_err(|e| self.failure(shown, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(self.failure(shown, message));
        }

        Ok(output)
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    fn node(&self) -> &ControlNode {
        &self.node
    }

    async fn execute(&self, command: &RemoteCommand) -> Result<Vec<String>> {
        let shown = command.to_string();
        let mut cmd = self.command(&self.config.program);
        cmd.arg(self.node.address()).arg(command.to_shell_string());

        tracing::debug!("[CMD] {} {} {}", self.config.program, self.node, shown);
        let output = self.run(cmd, &shown).await?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(String::from)
            .collect())
    }

    async fn put(&self, local: &Path, remote_dir: &str) -> Result<()> {
        let destination = format!("{}:{}/", self.node.address(), remote_dir);
        let mut cmd = self.command(&self.config.copy_program);
        cmd.arg(local).arg(&destination);

        logging::log_command(cmd.as_std());
        let shown = format!("{} {} {}", self.config.copy_program, local.display(), destination);
        self.run(cmd, &shown).await?;
        Ok(())
    }
}
