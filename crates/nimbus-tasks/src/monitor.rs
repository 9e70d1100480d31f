use crate::context::TaskScope;
use crate::error::Result;
use crate::sge;
use crate::task::Task;
use nimbus_core::model::{ClusterName, JobId, JobStatus, SchedulerJobId};

/// One poll of the scheduler queue. While the job is queued or running the
/// task reports that and requeues itself; once the job has left the queue
/// it dispatches the output upload and reports `complete`.
pub async fn monitor(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    job_id: &JobId,
    scheduler_job_id: &SchedulerJobId,
    job_dir: &str,
) -> Result<()> {
    let result = poll(scope, cluster, job_id, scheduler_job_id, job_dir).await;
    scope.settle(result, JobStatus::Error).await
}

async fn poll(
    scope: &TaskScope<'_>,
    cluster: &ClusterName,
    job_id: &JobId,
    scheduler_job_id: &SchedulerJobId,
    job_dir: &str,
) -> Result<()> {
    let ctx = scope.ctx;
    let config = scope.fetch_config().await?;
    let node = ctx.provider.control_node(config.path(), cluster).await?;
    let session = ctx.connector.connect(&node).await?;
    let listing = session.execute(&sge::queue_listing()).await?;

    let Some(code) = sge::find_job_state(&listing, scheduler_job_id) else {
        scope.log.info(format!(
            "Scheduler job {} has left the queue",
            scheduler_job_id
        ));
        scope
            .dispatch(Task::UploadOutput {
                cluster: cluster.clone(),
                job_id: job_id.clone(),
                scheduler_job_id: scheduler_job_id.clone(),
                job_dir: job_dir.to_string(),
                callbacks: scope.callbacks().clone(),
            })
            .await?;
        return scope.report(JobStatus::Complete).await;
    };

    let status = sge::classify(scheduler_job_id, &code)?;
    tracing::debug!(
        "Scheduler job {} is '{}' ({}), poll #{}",
        scheduler_job_id,
        code,
        status,
        scope.envelope.reschedules + 1
    );
    scope.report(status).await?;
    scope
        .reschedule(scope.settings().scheduler.poll_interval())
        .await
}
