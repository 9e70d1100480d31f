use nimbus_core::model::JobStatus;
use nimbus_test_utils::fakes::{Outcome, RecordingLogSink};
use nimbus_test_utils::harness::{callbacks, TestContext, JOB_ID_URL};
use nimbus_tasks::{LocalTaskQueue, Task, TaskQueue, WorkerPool};
use std::sync::Arc;
use std::time::Duration;

const QCONF: &str = "slots              4\n";
const QSUB: &str = "Your job 123 (\"script\") has been submitted\n";
const RUNNING: &str = "    123 0.55500 job.sh  sgeadmin  r  11/11/2014 16:22:03 all.q 4\n";

fn submit() -> Task {
    Task::SubmitJob {
        cluster: "c1".into(),
        job_id: "j1".into(),
        script: "#!/bin/sh\necho hi\n".to_string(),
        job_id_url: JOB_ID_URL.to_string(),
        callbacks: callbacks(),
    }
}

fn start() -> Task {
    Task::StartCluster {
        cluster: "c1".into(),
        template: "small".to_string(),
        callbacks: callbacks(),
    }
}

/// Harness whose tasks run on a real local queue and worker pool.
fn with_pool(
    mut harness: TestContext,
    helper_dir: &tempfile::TempDir,
) -> (TestContext, LocalTaskQueue, WorkerPool) {
    let helper = helper_dir.path().join("girderclient.py");
    std::fs::write(&helper, "print('ok')\n").unwrap();
    harness.settings.upload.helper = helper;
    harness.settings.scheduler.poll_interval_secs = 0;
    harness.settings.workers.count = 2;
    harness.settings.workers.retry_delay_secs = 0;

    let (queue, receiver) = LocalTaskQueue::new();
    let context = Arc::new(harness.context_with_queue(Arc::new(queue.clone())));
    let pool = WorkerPool::new(context, queue.clone(), receiver);
    (harness, queue, pool)
}

#[tokio::test]
async fn test_job_pipeline_runs_to_upload() {
    let dir = tempfile::tempdir().unwrap();
    let (harness, queue, pool) = with_pool(TestContext::new(), &dir);
    harness
        .remote
        .respond("qconf", QCONF)
        .respond("qsub", QSUB)
        .respond_times("qstat", RUNNING, 3);

    queue.dispatch(submit()).await.unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), pool.run_until_idle())
        .await
        .unwrap();

    assert!(summary.failed.is_empty());
    // submit, four monitor polls, upload
    assert_eq!(summary.succeeded, 6);
    assert_eq!(
        harness.reporter.statuses(),
        vec!["queued", "running", "running", "running", "complete"]
    );

    let helper_runs: Vec<_> = harness
        .remote
        .commands()
        .into_iter()
        .filter(|c| c.starts_with("python 'girderclient.py'"))
        .collect();
    assert_eq!(helper_runs.len(), 1);
    assert!(helper_runs[0].contains("'--folder' '123'"));
    assert_eq!(queue.outstanding(), 0);
}

#[tokio::test]
async fn test_failed_task_is_retried_up_to_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = TestContext::new();
    harness.settings.workers.max_failure_retries = 2;
    harness.provider.on_launch(Outcome::Fail);
    let (harness, queue, pool) = with_pool(harness, &dir);

    queue.dispatch(start()).await.unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), pool.run_until_idle())
        .await
        .unwrap();

    assert_eq!(summary.retried, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].task, "start_cluster");

    let launches = harness
        .provider
        .calls()
        .into_iter()
        .filter(|c| c.action == "launch")
        .count();
    assert_eq!(launches, 3);
}

#[tokio::test]
async fn test_no_retries_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestContext::new();
    harness.provider.on_launch(Outcome::Fail);
    let (harness, queue, pool) = with_pool(harness, &dir);

    queue.dispatch(start()).await.unwrap();
    let summary = pool.run_until_idle().await;

    assert_eq!(summary.retried, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(harness.provider.calls().len(), 1);
}

#[tokio::test]
async fn test_log_forwarding_failure_does_not_fail_task() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestContext {
        logs: Arc::new(RecordingLogSink::failing()),
        ..TestContext::new()
    };
    let (harness, queue, pool) = with_pool(harness, &dir);

    queue.dispatch(start()).await.unwrap();
    let summary = pool.run_until_idle().await;

    assert_eq!(summary.succeeded, 1);
    assert!(summary.failed.is_empty());
    assert_eq!(harness.logs.batches().len(), 1);
}

#[tokio::test]
async fn test_idle_pool_stops_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let (_harness, _queue, pool) = with_pool(TestContext::new(), &dir);

    let summary = tokio::time::timeout(Duration::from_secs(5), pool.run_until_idle())
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 0);
}

#[tokio::test]
async fn test_shutdown_token_stops_long_running_pool() {
    let dir = tempfile::tempdir().unwrap();
    let (_harness, _queue, pool) = with_pool(TestContext::new(), &dir);
    let token = pool.shutdown_token();

    let handle = tokio::spawn(pool.run());
    token.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(summary.failed.is_empty());
}

#[tokio::test]
async fn test_monitor_delivery_reports_every_poll() {
    let dir = tempfile::tempdir().unwrap();
    let (harness, queue, pool) = with_pool(TestContext::new(), &dir);
    harness.remote.respond_times("qstat", RUNNING, 5);

    queue
        .dispatch(Task::MonitorJob {
            cluster: "c1".into(),
            job_id: "j1".into(),
            scheduler_job_id: "123".into(),
            job_dir: "j1/2014-11-11-16-21-57".to_string(),
            callbacks: callbacks(),
        })
        .await
        .unwrap();
    pool.run_until_idle().await;

    let statuses = harness.reporter.statuses();
    assert_eq!(statuses.len(), 6);
    assert_eq!(statuses.last().map(String::as_str), Some(JobStatus::Complete.as_str()));
}

#[tokio::test]
async fn test_unrecognized_state_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = TestContext::new();
    harness.settings.workers.max_failure_retries = 2;
    let (harness, queue, pool) = with_pool(harness, &dir);
    harness.remote.respond(
        "qstat",
        "    123 0.55500 job.sh  sgeadmin  Eqw  11/11/2014 16:22:03 all.q 4\n",
    );

    queue
        .dispatch(Task::MonitorJob {
            cluster: "c1".into(),
            job_id: "j1".into(),
            scheduler_job_id: "123".into(),
            job_dir: "j1/2014-11-11-16-21-57".to_string(),
            callbacks: callbacks(),
        })
        .await
        .unwrap();
    let summary = pool.run_until_idle().await;

    assert_eq!(summary.retried, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].task, "monitor_job");
    assert_eq!(harness.reporter.statuses(), vec!["error"]);
}

#[tokio::test]
async fn test_accepted_submission_is_not_resubmitted() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = TestContext::new();
    harness.settings.workers.max_failure_retries = 1;
    harness.reporter.reject_status("queued");
    let (harness, queue, pool) = with_pool(harness, &dir);
    harness.remote.respond("qconf", QCONF).respond("qsub", QSUB);

    queue.dispatch(submit()).await.unwrap();
    let summary = pool.run_until_idle().await;

    assert_eq!(summary.retried, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].task, "submit_job");

    let qsub_runs = harness
        .remote
        .commands()
        .into_iter()
        .filter(|c| c.contains("qsub"))
        .count();
    assert_eq!(qsub_runs, 1);
    assert_eq!(harness.reporter.job_ids().len(), 1);
    assert_eq!(harness.reporter.statuses(), vec!["queued", "error"]);
}

#[tokio::test]
async fn test_transient_failure_before_submission_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = TestContext::new();
    harness.settings.workers.max_failure_retries = 1;
    harness.provider.on_control_node(Outcome::Fail);
    let (harness, queue, pool) = with_pool(harness, &dir);

    queue.dispatch(submit()).await.unwrap();
    let summary = pool.run_until_idle().await;

    assert_eq!(summary.retried, 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(harness.reporter.job_ids().is_empty());
}
