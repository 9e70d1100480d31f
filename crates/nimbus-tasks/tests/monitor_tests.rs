use nimbus_core::constants::sge;
use nimbus_test_utils::harness::{callbacks, TestContext};
use nimbus_tasks::{Envelope, Task, TaskError};
use std::time::Duration;

fn monitor() -> Task {
    Task::MonitorJob {
        cluster: "c1".into(),
        job_id: "j1".into(),
        scheduler_job_id: "123".into(),
        job_dir: "j1/2014-11-11-16-21-57".to_string(),
        callbacks: callbacks(),
    }
}

fn listing(state: &str) -> String {
    format!(
        "job-ID  prior   name       user         state submit/start at     queue  slots\n\
         -----------------------------------------------------------------------------\n\
         \x20   122 0.55500 other.sh   sgeadmin     r     11/11/2014 16:21:57 all.q  2\n\
         \x20   123 0.55500 job.sh     sgeadmin     {}    11/11/2014 16:22:03 all.q  4\n",
        state
    )
}

#[tokio::test]
async fn test_running_states_report_running_and_reschedule() {
    for code in sge::RUNNING_STATES {
        let harness = TestContext::new();
        harness.remote.respond("qstat", &listing(code));

        harness.run(monitor()).await.unwrap();

        assert_eq!(harness.reporter.statuses(), vec!["running"], "state {}", code);
        let rescheduled = harness.queue.rescheduled();
        assert_eq!(rescheduled.len(), 1);
        assert_eq!(rescheduled[0].1, Duration::from_secs(5));
        assert!(harness.queue.dispatched().is_empty());
    }
}

#[tokio::test]
async fn test_queued_states_report_queued_and_reschedule() {
    for code in sge::QUEUED_STATES {
        let harness = TestContext::new();
        harness.remote.respond("qstat", &listing(code));

        harness.run(monitor()).await.unwrap();

        assert_eq!(harness.reporter.statuses(), vec!["queued"], "state {}", code);
        assert_eq!(harness.queue.rescheduled().len(), 1);
    }
}

#[tokio::test]
async fn test_job_gone_from_queue_completes_and_uploads_once() {
    let harness = TestContext::new();
    harness.remote.respond(
        "qstat",
        "    122 0.55500 other.sh   sgeadmin     r     11/11/2014 16:21:57 all.q  2\n",
    );

    harness.run(monitor()).await.unwrap();

    assert_eq!(harness.reporter.statuses(), vec!["complete"]);
    assert!(harness.queue.rescheduled().is_empty());

    let dispatched = harness.queue.dispatched();
    assert_eq!(dispatched.len(), 1);
    match &dispatched[0] {
        Task::UploadOutput {
            scheduler_job_id,
            job_dir,
            ..
        } => {
            assert_eq!(scheduler_job_id.0, "123");
            assert_eq!(job_dir, "j1/2014-11-11-16-21-57");
        }
        other => panic!("unexpected task: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_queue_completes() {
    let harness = TestContext::new();
    harness.run(monitor()).await.unwrap();
    assert_eq!(harness.reporter.statuses(), vec!["complete"]);
}

#[tokio::test]
async fn test_unrecognized_state_reports_error_without_reschedule() {
    let harness = TestContext::new();
    harness.remote.respond("qstat", &listing("Eqw"));

    let err = harness.run(monitor()).await.unwrap_err();

    assert!(matches!(err, TaskError::UnrecognizedSchedulerState { code, .. } if code == "Eqw"));
    assert_eq!(harness.reporter.statuses(), vec!["error"]);
    assert!(harness.queue.rescheduled().is_empty());
    assert!(harness.queue.dispatched().is_empty());
}

#[tokio::test]
async fn test_queue_query_failure_is_swallowed() {
    let harness = TestContext::new();
    harness.remote.fail("qstat", "ssh: connect to host master: Connection refused");

    harness.run(monitor()).await.unwrap();
    assert!(harness.reporter.statuses().is_empty());
    assert!(harness.queue.rescheduled().is_empty());
}

#[tokio::test]
async fn test_reschedule_counter_grows_without_bound() {
    let mut harness = TestContext::new();
    harness.settings.scheduler.poll_interval_secs = 30;
    harness.remote.respond("qstat", &listing("r"));

    let context = harness.context();
    let mut envelope = Envelope::new(monitor());
    for _ in 0..50 {
        context.execute(&envelope).await.unwrap();
        envelope = harness.queue.rescheduled().last().unwrap().0.clone();
    }

    assert_eq!(envelope.reschedules, 50);
    assert_eq!(envelope.failures, 0);
    assert!(harness
        .queue
        .rescheduled()
        .iter()
        .all(|(_, delay)| *delay == Duration::from_secs(30)));
}

#[tokio::test]
async fn test_config_removed_on_every_path() {
    for output in [listing("r"), listing("Eqw"), String::new()] {
        let harness = TestContext::new();
        harness.remote.respond("qstat", &output);
        let _ = harness.run(monitor()).await;

        for path in harness.config.issued_paths() {
            assert!(!path.exists());
        }
    }
}
