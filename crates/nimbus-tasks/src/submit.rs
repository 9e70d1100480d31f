use crate::context::TaskScope;
use crate::error::{Result, TaskError};
use crate::sge;
use crate::task::Task;
use chrono::{DateTime, Utc};
use nimbus_client::{ClientError, RemoteCommand, RemoteExecutor, ScopedFile};
use nimbus_core::constants::files;
use nimbus_core::model::{ClusterName, JobId, JobRecord, JobStatus, SchedulerJobId};

/// `<job id>/<timestamp>`, relative to the login directory on the control
/// node.
pub fn job_directory(job_id: &JobId, at: DateTime<Utc>) -> String {
    format!("{}/{}", job_id, at.format(files::JOB_DIR_TIMESTAMP))
}

pub async fn submit(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    job_id: &JobId,
    script: &str,
    job_id_url: &str,
) -> Result<()> {
    let result = submit_job(scope, cluster, job_id, script, job_id_url).await;
    scope.settle(result, JobStatus::Error).await
}

async fn submit_job(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    job_id: &JobId,
    script: &str,
    job_id_url: &str,
) -> Result<()> {
    let ctx = scope.ctx;
    let parallel_env = &scope.settings().scheduler.parallel_env;

    let config = scope.fetch_config().await?;
    let script_file = ScopedFile::with_contents(files::SCRIPT_PREFIX, script.as_bytes())?;
    let script_name = script_file.file_name();
    let mut record = JobRecord::new(job_id.clone());

    let node = ctx.provider.control_node(config.path(), cluster).await?;
    let session = ctx.connector.connect(&node).await?;

    let job_dir = job_directory(job_id, Utc::now());
    create_job_directory(session.as_ref(), job_id, &job_dir).await?;
    record.job_dir = Some(job_dir.clone());

    session.put(script_file.path(), &job_dir).await?;

    let slots = sge::parse_slots(
        &session.execute(&sge::slots_query(parallel_env)).await?,
        parallel_env,
    )?;
    let submission = sge::submit_command(&job_dir, &script_name, parallel_env, slots);
    scope.log.info(format!("Submitting: {}", submission));

    let scheduler_job_id = sge::parse_submission(&session.execute(&submission).await?)?;
    record.assign_scheduler_id(scheduler_job_id.clone())?;
    scope.log.info(format!(
        "Job '{}' accepted as scheduler job {} with {} slot(s)",
        job_id, scheduler_job_id, slots
    ));

    announce(scope, cluster, record, scheduler_job_id.clone(), job_id_url, job_dir)
        .await
        .map_err(|e| TaskError::Submitted {
            job: scheduler_job_id.0,
            source: Box::new(e),
        })
}

/// Records the accepted job with the orchestrator and hands it to the
/// monitor.
async fn announce(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    mut record: JobRecord,
    scheduler_job_id: SchedulerJobId,
    job_id_url: &str,
    job_dir: String,
) -> Result<()> {
    let callbacks = scope.callbacks();

    scope
        .ctx
        .reporter
        .push_scheduler_job_id(job_id_url, &callbacks.token, &scheduler_job_id)
        .await?;
    record.transition(JobStatus::Queued)?;
    scope.report(record.status()).await?;

    scope
        .dispatch(Task::MonitorJob {
            cluster: cluster.clone(),
            job_id: record.id.clone(),
            scheduler_job_id,
            job_dir,
            callbacks: callbacks.clone(),
        })
        .await?;
    Ok(())
}

/// The parent directory may already exist; the leaf must not, so two
/// submissions of one job within the same second cannot share a directory.
async fn create_job_directory(
    session: &dyn RemoteExecutor,
    job_id: &JobId,
    job_dir: &str,
) -> Result<()> {
    let mkdir = RemoteCommand::new("mkdir")
        .arg("-p")
        .arg(&job_id.0)
        .and(RemoteCommand::new("mkdir").arg(job_dir));

    match session.execute(&mkdir).await {
        Ok(_) => Ok(()),
        Err(ClientError::RemoteCommandFailure { message, .. }) if message.contains("File exists") => {
            Err(TaskError::JobDirectoryCollision {
                dir: job_dir.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}
