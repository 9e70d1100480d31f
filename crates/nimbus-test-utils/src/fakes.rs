//! In-memory stand-ins for the collaborators a task talks to. Each one
//! records what it was asked to do so tests can assert on it afterwards.

use async_trait::async_trait;
use nimbus_client::fetch::ConfigDocument;
use nimbus_client::{
    ClientError, ClusterProvider, ConfigSource, ControlNode, LogCapture, LogRecord, LogSink,
    RemoteCommand, RemoteConnector, RemoteExecutor, Result, ScopedFile, StatusReporter,
};
use nimbus_core::constants::files;
use nimbus_core::model::{AuthToken, ClusterName, SchedulerJobId, Status};
use nimbus_tasks::{Envelope, Task, TaskId, TaskQueue};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serves the same document on every fetch and remembers where each copy
/// was written.
#[derive(Default)]
pub struct StaticConfigSource {
    contents: Vec<u8>,
    failure: Option<String>,
    issued: Mutex<Vec<PathBuf>>,
}

impl StaticConfigSource {
    pub fn new(contents: &str) -> Self {
        Self {
            contents: contents.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn issued_paths(&self) -> Vec<PathBuf> {
        lock(&self.issued).clone()
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self, url: &str, _token: &AuthToken) -> Result<ConfigDocument> {
        if let Some(message) = &self.failure {
            return Err(ClientError::ConfigFetch {
                url: url.to_string(),
                message: message.clone(),
            });
        }
        let document = ScopedFile::with_contents(files::CONFIG_PREFIX, &self.contents)?;
        lock(&self.issued).push(document.path().to_path_buf());
        Ok(document)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPush {
    pub url: String,
    pub status: String,
}

/// Records status and scheduler-id callbacks. Can be told to reject one
/// particular status value.
#[derive(Default)]
pub struct RecordingReporter {
    pushes: Mutex<Vec<StatusPush>>,
    job_ids: Mutex<Vec<(String, SchedulerJobId)>>,
    reject: Mutex<Option<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_status(&self, status: &str) {
        *lock(&self.reject) = Some(status.to_string());
    }

    pub fn pushes(&self) -> Vec<StatusPush> {
        lock(&self.pushes).clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.pushes().into_iter().map(|p| p.status).collect()
    }

    pub fn job_ids(&self) -> Vec<(String, SchedulerJobId)> {
        lock(&self.job_ids).clone()
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn push_status(&self, url: &str, _token: &AuthToken, status: Status) -> Result<()> {
        lock(&self.pushes).push(StatusPush {
            url: url.to_string(),
            status: status.as_str().to_string(),
        });
        if lock(&self.reject).as_deref() == Some(status.as_str()) {
            return Err(ClientError::StatusPushFailure {
                url: url.to_string(),
                status: status.as_str().to_string(),
                message: "500 Internal Server Error".to_string(),
            });
        }
        Ok(())
    }

    async fn push_scheduler_job_id(
        &self,
        url: &str,
        _token: &AuthToken,
        id: &SchedulerJobId,
    ) -> Result<()> {
        lock(&self.job_ids).push((url.to_string(), id.clone()));
        Ok(())
    }
}

/// Keeps dispatched and rescheduled tasks instead of running them.
#[derive(Default)]
pub struct RecordingQueue {
    dispatched: Mutex<Vec<Task>>,
    rescheduled: Mutex<Vec<(Envelope, Duration)>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<Task> {
        lock(&self.dispatched).clone()
    }

    pub fn rescheduled(&self) -> Vec<(Envelope, Duration)> {
        lock(&self.rescheduled).clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn dispatch(&self, task: Task) -> nimbus_tasks::Result<TaskId> {
        lock(&self.dispatched).push(task);
        Ok(TaskId::new())
    }

    async fn reschedule(&self, envelope: Envelope, delay: Duration) -> nimbus_tasks::Result<()> {
        lock(&self.rescheduled).push((envelope, delay));
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Lines(Vec<String>),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub remote_dir: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    reply: Reply,
    remaining: Option<usize>,
}

#[derive(Default)]
struct RemoteState {
    rules: Vec<Rule>,
    commands: Vec<String>,
    uploads: Vec<Upload>,
    nodes: Vec<ControlNode>,
}

/// A control node that answers commands from a script. The first rule whose
/// pattern occurs in the command line decides the reply; unmatched commands
/// succeed with no output.
#[derive(Clone, Default)]
pub struct ScriptedRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(&self, pattern: &str, reply: Reply, remaining: Option<usize>) -> &Self {
        lock(&self.state).rules.push(Rule {
            pattern: pattern.to_string(),
            reply,
            remaining,
        });
        self
    }

    fn lines(output: &str) -> Reply {
        Reply::Lines(output.lines().map(String::from).collect())
    }

    pub fn respond(&self, pattern: &str, output: &str) -> &Self {
        self.rule(pattern, Self::lines(output), None)
    }

    /// Like `respond`, but the rule is dropped after `times` matches.
    pub fn respond_times(&self, pattern: &str, output: &str, times: usize) -> &Self {
        self.rule(pattern, Self::lines(output), Some(times))
    }

    pub fn fail(&self, pattern: &str, message: &str) -> &Self {
        self.rule(pattern, Reply::Failure(message.to_string()), None)
    }

    /// Command lines as they would be logged, secrets masked.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.state).commands.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        lock(&self.state).uploads.clone()
    }

    pub fn nodes(&self) -> Vec<ControlNode> {
        lock(&self.state).nodes.clone()
    }
}

struct ScriptedSession {
    node: ControlNode,
    state: Arc<Mutex<RemoteState>>,
}

#[async_trait]
impl RemoteConnector for ScriptedRemote {
    async fn connect(&self, node: &ControlNode) -> Result<Box<dyn RemoteExecutor>> {
        lock(&self.state).nodes.push(node.clone());
        Ok(Box::new(ScriptedSession {
            node: node.clone(),
            state: self.state.clone(),
        }))
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedSession {
    fn node(&self) -> &ControlNode {
        &self.node
    }

    async fn execute(&self, command: &RemoteCommand) -> Result<Vec<String>> {
        let line = command.to_shell_string();
        let mut state = lock(&self.state);
        state.commands.push(command.to_string());

        let matched = state
            .rules
            .iter()
            .position(|rule| line.contains(rule.pattern.as_str()));

        let reply = matched.map(|index| {
            let rule = &mut state.rules[index];
            let reply = rule.reply.clone();
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    state.rules.remove(index);
                }
            }
            reply
        });

        match reply {
            None => Ok(Vec::new()),
            Some(Reply::Lines(lines)) => Ok(lines),
            Some(Reply::Failure(message)) => Err(ClientError::RemoteCommandFailure {
                node: self.node.address(),
                command: command.to_string(),
                message,
            }),
        }
    }

    async fn put(&self, local: &Path, remote_dir: &str) -> Result<()> {
        let contents = std::fs::read(local).map_err(|e| ClientError::RemoteCommandFailure {
            node: self.node.address(),
            command: format!("put {}", local.display()),
            message: e.to_string(),
        })?;
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        lock(&self.state).uploads.push(Upload {
            file_name,
            remote_dir: remote_dir.to_string(),
            contents,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Succeed,
    Missing,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub action: &'static str,
    pub cluster: ClusterName,
    pub config_present: bool,
}

#[derive(Default)]
struct ProviderState {
    launch: Outcome,
    terminate: Outcome,
    locate: Outcome,
    calls: Vec<ProviderCall>,
}

/// A provider whose clusters always have `master` as control node unless
/// told otherwise. Each call records whether the config file it was handed
/// still existed at that moment.
pub struct ScriptedProvider {
    control: ControlNode,
    state: Mutex<ProviderState>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            control: ControlNode::new("master", Some("sgeadmin".to_string())),
            state: Mutex::new(ProviderState::default()),
        }
    }

    pub fn on_launch(&self, outcome: Outcome) -> &Self {
        lock(&self.state).launch = outcome;
        self
    }

    pub fn on_terminate(&self, outcome: Outcome) -> &Self {
        lock(&self.state).terminate = outcome;
        self
    }

    pub fn on_control_node(&self, outcome: Outcome) -> &Self {
        lock(&self.state).locate = outcome;
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.state).calls.clone()
    }

    fn record(&self, action: &'static str, config: &Path, cluster: &ClusterName) -> Outcome {
        let mut state = lock(&self.state);
        state.calls.push(ProviderCall {
            action,
            cluster: cluster.clone(),
            config_present: config.exists(),
        });
        match action {
            "launch" => state.launch,
            "terminate" => state.terminate,
            _ => state.locate,
        }
    }

    fn settle(outcome: Outcome, action: &str, cluster: &ClusterName) -> Result<()> {
        match outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Missing => Err(ClientError::ClusterNotFound(cluster.0.clone())),
            Outcome::Fail => Err(ClientError::Provider(format!(
                "{} of '{}' failed",
                action, cluster
            ))),
        }
    }
}

#[async_trait]
impl ClusterProvider for ScriptedProvider {
    async fn launch(
        &self,
        config: &Path,
        name: &ClusterName,
        template: &str,
        capture: &LogCapture,
    ) -> Result<()> {
        let outcome = self.record("launch", config, name);
        capture.info(format!("Launching '{}' from template '{}'", name, template));
        Self::settle(outcome, "launch", name)
    }

    async fn terminate(
        &self,
        config: &Path,
        name: &ClusterName,
        capture: &LogCapture,
    ) -> Result<()> {
        let outcome = self.record("terminate", config, name);
        capture.info(format!("Terminating '{}'", name));
        Self::settle(outcome, "terminate", name)
    }

    async fn control_node(&self, config: &Path, name: &ClusterName) -> Result<ControlNode> {
        let outcome = self.record("control_node", config, name);
        Self::settle(outcome, "lookup", name)?;
        Ok(self.control.clone())
    }
}

/// Collects forwarded log batches.
#[derive(Default)]
pub struct RecordingLogSink {
    batches: Mutex<Vec<(String, Vec<LogRecord>)>>,
    failing: bool,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<(String, Vec<LogRecord>)> {
        lock(&self.batches).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.batches()
            .into_iter()
            .flat_map(|(_, records)| records.into_iter().map(|r| r.message))
            .collect()
    }
}

#[async_trait]
impl LogSink for RecordingLogSink {
    async fn forward(&self, url: &str, _token: &AuthToken, records: &[LogRecord]) -> Result<()> {
        lock(&self.batches).push((url.to_string(), records.to_vec()));
        if self.failing {
            return Err(ClientError::LogForward {
                url: url.to_string(),
                message: "503 Service Unavailable".to_string(),
            });
        }
        Ok(())
    }
}
