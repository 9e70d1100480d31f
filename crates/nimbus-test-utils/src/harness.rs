use crate::fakes::{
    RecordingLogSink, RecordingQueue, RecordingReporter, ScriptedProvider, ScriptedRemote,
    StaticConfigSource,
};
use nimbus_core::config::Settings;
use nimbus_core::model::AuthToken;
use nimbus_tasks::{Callbacks, Envelope, Task, TaskContext, TaskQueue};
use std::sync::Arc;

pub const CONFIG_URL: &str = "http://girder.test/api/v1/clusters/c1/config";
pub const STATUS_URL: &str = "http://girder.test/api/v1/jobs/j1/status";
pub const JOB_ID_URL: &str = "http://girder.test/api/v1/jobs/j1/sgeJobId";
pub const LOG_URL: &str = "http://girder.test/api/v1/clusters/c1/log";
pub const TOKEN: &str = "s3cret-token";

/// All fakes wired into one `TaskContext`. Fields stay public so a test can
/// script a collaborator before building the context.
pub struct TestContext {
    pub config: Arc<StaticConfigSource>,
    pub reporter: Arc<RecordingReporter>,
    pub logs: Arc<RecordingLogSink>,
    pub remote: ScriptedRemote,
    pub provider: Arc<ScriptedProvider>,
    pub queue: Arc<RecordingQueue>,
    pub settings: Settings,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            config: Arc::new(StaticConfigSource::new("[cluster small]\nCLUSTER_SIZE = 2\n")),
            reporter: Arc::new(RecordingReporter::new()),
            logs: Arc::new(RecordingLogSink::new()),
            remote: ScriptedRemote::new(),
            provider: Arc::new(ScriptedProvider::new()),
            queue: Arc::new(RecordingQueue::new()),
            settings: Settings::default(),
        }
    }

    pub fn context(&self) -> TaskContext {
        self.context_with_queue(self.queue.clone())
    }

    pub fn context_with_queue(&self, queue: Arc<dyn TaskQueue>) -> TaskContext {
        TaskContext {
            config_source: self.config.clone(),
            reporter: self.reporter.clone(),
            log_sink: self.logs.clone(),
            connector: Arc::new(self.remote.clone()),
            provider: self.provider.clone(),
            queue,
            settings: self.settings.clone(),
        }
    }

    /// Runs one delivery of `task` against the fakes.
    pub async fn run(&self, task: Task) -> nimbus_tasks::Result<()> {
        self.context().execute(&Envelope::new(task)).await
    }
}

pub fn callbacks() -> Callbacks {
    Callbacks {
        config_url: CONFIG_URL.to_string(),
        status_url: STATUS_URL.to_string(),
        token: AuthToken::new(TOKEN),
        log_url: Some(LOG_URL.to_string()),
    }
}
