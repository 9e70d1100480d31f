use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use std::path::Path;

fn nimbus(home: &Path) -> AssertCommand {
    let mut cmd = AssertCommand::new(env!("CARGO_BIN_EXE_nimbus"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env("XDG_CACHE_HOME", home.join("cache"));
    cmd.env_remove("RUST_LOG");
    cmd.arg("--stderr");
    cmd
}

fn callback_args() -> Vec<&'static str> {
    vec![
        "--config-url",
        "http://127.0.0.1:1/api/v1/clusters/c1/config",
        "--status-url",
        "http://127.0.0.1:1/api/v1/clusters/c1/status",
        "--token",
        "zq9-secret-value",
    ]
}

#[test]
fn test_help_lists_task_commands() {
    let home = tempfile::tempdir().unwrap();
    nimbus(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start-cluster"))
        .stdout(predicate::str::contains("terminate-cluster"))
        .stdout(predicate::str::contains("submit-job"))
        .stdout(predicate::str::contains("monitor-job"))
        .stdout(predicate::str::contains("worker"));
}

#[test]
fn test_unreachable_config_url_fails_task() {
    let home = tempfile::tempdir().unwrap();
    nimbus(home.path())
        .arg("terminate-cluster")
        .args(["--name", "c1"])
        .args(callback_args())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch cluster configuration"))
        .stderr(predicate::str::contains("1 of 1 task deliveries failed"));
}

#[test]
fn test_token_never_reaches_the_log() {
    let home = tempfile::tempdir().unwrap();
    nimbus(home.path())
        .arg("-v")
        .arg("start-cluster")
        .args(["--name", "c1", "--template", "small"])
        .args(callback_args())
        .assert()
        .failure()
        .stderr(predicate::str::contains("zq9-secret-value").not());
}

#[test]
fn test_invalid_settings_are_rejected() {
    let home = tempfile::tempdir().unwrap();
    let settings = home.path().join("settings.toml");
    std::fs::write(&settings, "[workers]\ncount = 0\n").unwrap();

    nimbus(home.path())
        .arg("--config")
        .arg(&settings)
        .arg("worker")
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers.count"));
}

#[test]
fn test_missing_script_fails_before_dispatch() {
    let home = tempfile::tempdir().unwrap();
    nimbus(home.path())
        .arg("submit-job")
        .args(["--cluster", "c1", "--job-id", "j1"])
        .args(["--script", "/nonexistent/job.sh"])
        .args(["--job-id-url", "http://127.0.0.1:1/api/v1/jobs/j1/sgeJobId"])
        .args(callback_args())
        .assert()
        .failure()
        .stderr(predicate::str::contains("job.sh"));
}

#[test]
fn test_worker_skips_undecodable_messages() {
    let home = tempfile::tempdir().unwrap();
    nimbus(home.path())
        .arg("worker")
        .write_stdin("{\"task\":\"reboot_cluster\"}\n\nnot json\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipping task message"))
        .stdout(predicate::str::contains("0 task(s) finished"));
}

#[test]
fn test_worker_runs_queued_messages() {
    let home = tempfile::tempdir().unwrap();
    let message = r#"{"task":"terminate_cluster","cluster":"c1","config_url":"http://127.0.0.1:1/config","status_url":"http://127.0.0.1:1/status","token":"t"}"#;

    nimbus(home.path())
        .arg("worker")
        .write_stdin(format!("{}\n", message))
        .assert()
        .success()
        .stderr(predicate::str::contains("Task failed"));
}
