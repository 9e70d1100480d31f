use super::ClusterProvider;
use crate::error::{ClientError, Result};
use crate::logs::LogCapture;
use crate::ssh::ControlNode;
use async_trait::async_trait;
use nimbus_core::logging;
use nimbus_core::model::ClusterName;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;

static MASTER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*master\s+running\s+\S+\s+(\S+)").expect("master line pattern is valid")
});

/// Drives the `starcluster` command line tool against the fetched config.
pub struct StarClusterProvider {
    program: String,
    ssh_user: Option<String>,
}

struct CliOutput {
    success: bool,
    lines: Vec<String>,
}

impl CliOutput {
    fn mentions_missing_cluster(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.to_lowercase().contains("does not exist"))
    }

    fn summary(&self) -> String {
        self.lines
            .iter()
            .rev()
            .find(|l| !l.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "no output".to_string())
    }
}

impl StarClusterProvider {
    pub fn new(program: String, ssh_user: Option<String>) -> Self {
        Self { program, ssh_user }
    }

    async fn run(
        &self,
        config: &Path,
        args: &[&str],
        capture: Option<&LogCapture>,
    ) -> Result<CliOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg(config).args(args).kill_on_drop(true);

        logging::log_command(cmd.as_std());
        let output = cmd.output().await.map_err(|e| {
            ClientError::Provider(format!("failed to run '{}': {}", self.program, e))
        })?;

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(String::from)
            .collect();

        if let Some(capture) = capture {
            for line in lines.iter().filter(|l| !l.trim().is_empty()) {
                capture.info(line.clone());
            }
        }

        Ok(CliOutput {
            success: output.status.success(),
            lines,
        })
    }
}

pub(crate) fn parse_master_host(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| MASTER_LINE.captures(line))
        .map(|caps| caps[1].to_string())
}

#[async_trait]
impl ClusterProvider for StarClusterProvider {
    async fn launch(
        &self,
        config: &Path,
        name: &ClusterName,
        template: &str,
        capture: &LogCapture,
    ) -> Result<()> {
        let output = self
            .run(config, &["start", "-c", template, &name.0], Some(capture))
            .await?;

        if !output.success {
            return Err(ClientError::Provider(format!(
                "starting cluster '{}' failed: {}",
                name,
                output.summary()
            )));
        }
        Ok(())
    }

    async fn terminate(
        &self,
        config: &Path,
        name: &ClusterName,
        capture: &LogCapture,
    ) -> Result<()> {
        let output = self
            .run(config, &["terminate", "-f", "-c", &name.0], Some(capture))
            .await?;

        if output.mentions_missing_cluster() {
            return Err(ClientError::ClusterNotFound(name.0.clone()));
        }
        if !output.success {
            return Err(ClientError::Provider(format!(
                "terminating cluster '{}' failed: {}",
                name,
                output.summary()
            )));
        }
        Ok(())
    }

    async fn control_node(&self, config: &Path, name: &ClusterName) -> Result<ControlNode> {
        let output = self.run(config, &["listclusters", &name.0], None).await?;

        if output.mentions_missing_cluster() {
            return Err(ClientError::ClusterNotFound(name.0.clone()));
        }

        let host = parse_master_host(&output.lines).ok_or_else(|| {
            ClientError::Provider(format!("cluster '{}' has no running master node", name))
        })?;
        Ok(ControlNode::new(host, self.ssh_user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(String::from).collect()
    }

    #[test]
    fn test_parse_master_host() {
        let output = lines(
            "-------------------------------------\n\
             mycluster (security group: @sc-mycluster)\n\
             -------------------------------------\n\
             Cluster nodes:\n\
             \x20    master running i-14b3c37c ec2-50-17-78-8.compute-1.amazonaws.com\n\
             \x20   node001 running i-16b3c37e ec2-50-17-78-9.compute-1.amazonaws.com\n",
        );
        assert_eq!(
            parse_master_host(&output).as_deref(),
            Some("ec2-50-17-78-8.compute-1.amazonaws.com")
        );
    }

    #[test]
    fn test_stopped_master_is_not_a_control_node() {
        let output = lines("    master stopped i-14b3c37c ec2-1.amazonaws.com\n");
        assert_eq!(parse_master_host(&output), None);
    }

    #[test]
    fn test_missing_cluster_detection() {
        let output = CliOutput {
            success: false,
            lines: lines("!!! ERROR - cluster gone does not exist"),
        };
        assert!(output.mentions_missing_cluster());
        assert_eq!(output.summary(), "!!! ERROR - cluster gone does not exist");
    }

    #[tokio::test]
    async fn test_launch_failure_is_provider_error() {
        let provider = StarClusterProvider::new("false".to_string(), None);
        let err = provider
            .launch(Path::new("/dev/null"), &"c1".into(), "small", &LogCapture::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Provider(_)));
    }

    #[tokio::test]
    async fn test_launch_output_is_captured() {
        // `echo` prints the arguments it was given, standing in for the CLI.
        let provider = StarClusterProvider::new("echo".to_string(), None);
        let capture = LogCapture::new();
        provider
            .launch(Path::new("/tmp/sc.cfg"), &"c1".into(), "small", &capture)
            .await
            .unwrap();

        let records = capture.drain();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "-c /tmp/sc.cfg start -c small c1");
    }
}
