use crate::context::TaskScope;
use crate::error::{Result, TaskError};
use nimbus_client::{ClientError, RemoteCommand};
use nimbus_core::errors::ConfigError;
use nimbus_core::model::{ClusterName, SchedulerJobId};
use once_cell::sync::Lazy;
use regex::Regex;

static JOBS_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.*)/jobs.*").expect("jobs suffix pattern is valid"));

/// The orchestrator's API root, i.e. the status URL with its `/jobs/...`
/// part removed.
pub fn base_url(status_url: &str) -> Result<String> {
    JOBS_SUFFIX
        .captures(status_url)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| TaskError::UploadUrl(status_url.to_string()))
}

/// Pushes the job directory to storage through the helper program. This is
/// the last step of a job and never reports a status.
pub async fn upload(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    scheduler_job_id: &SchedulerJobId,
    job_dir: &str,
) -> Result<()> {
    match push_output(scope, cluster, scheduler_job_id, job_dir).await {
        Err(e) if e.is_remote_failure() && !scope.settings().tasks.escalate_remote_failures => {
            scope.log.error(e.to_string());
            Ok(())
        }
        other => other,
    }
}

async fn push_output(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    scheduler_job_id: &SchedulerJobId,
    job_dir: &str,
) -> Result<()> {
    let ctx = scope.ctx;
    let upload = &scope.settings().upload;
    let callbacks = scope.callbacks();
    let url = base_url(&callbacks.status_url)?;

    let helper_name = upload
        .helper
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            ClientError::from(ConfigError::General(format!(
                "upload.helper '{}' does not name a file",
                upload.helper.display()
            )))
        })?;

    let config = scope.fetch_config().await?;
    let node = ctx.provider.control_node(config.path(), cluster).await?;
    let session = ctx.connector.connect(&node).await?;

    session.put(&upload.helper, ".").await?;

    let command = RemoteCommand::new(&upload.interpreter)
        .arg(&helper_name)
        .args([
            "--dir",
            job_dir,
            "--url",
            url.as_str(),
            "--collection",
            upload.collection.as_str(),
            "--token",
        ])
        .secret_arg(callbacks.token.expose())
        .args(["--folder", scheduler_job_id.0.as_str()]);
    scope.log.info(format!("Uploading output: {}", command));

    for line in session.execute(&command).await? {
        scope.log.info(line);
    }
    Ok(())
}
