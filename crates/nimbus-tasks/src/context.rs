use crate::error::Result;
use crate::queue::{Envelope, TaskId, TaskQueue};
use crate::task::{Callbacks, Task};
use crate::{cluster, monitor, submit, upload};
use nimbus_client::fetch::ConfigDocument;
use nimbus_client::provider;
use nimbus_client::{
    ClusterProvider, ConfigSource, HttpCallbacks, LogCapture, LogSink, RemoteConnector,
    SshConnector, StatusReporter,
};
use nimbus_core::config::Settings;
use nimbus_core::model::Status;
use std::sync::Arc;
use std::time::Duration;

/// Everything a task handler talks to. Built once per process and shared by
/// all workers.
pub struct TaskContext {
    pub config_source: Arc<dyn ConfigSource>,
    pub reporter: Arc<dyn StatusReporter>,
    pub log_sink: Arc<dyn LogSink>,
    pub connector: Arc<dyn RemoteConnector>,
    pub provider: Arc<dyn ClusterProvider>,
    pub queue: Arc<dyn TaskQueue>,
    pub settings: Settings,
}

impl TaskContext {
    pub fn from_settings(settings: Settings, queue: Arc<dyn TaskQueue>) -> Result<Self> {
        let http = Arc::new(HttpCallbacks::new(&settings.http)?);
        let connector: Arc<dyn RemoteConnector> =
            Arc::new(SshConnector::new(settings.ssh.clone()));
        let provider = provider::from_config(&settings.provider, &settings.ssh, connector.clone());

        Ok(Self {
            config_source: http.clone(),
            reporter: http.clone(),
            log_sink: http,
            connector,
            provider,
            queue,
            settings,
        })
    }

    /// Runs one delivery of a task. Captured log lines are forwarded before
    /// this returns, whatever the outcome.
    pub async fn execute(&self, envelope: &Envelope) -> Result<()> {
        let scope = TaskScope::new(self, envelope);

        let result = match &envelope.task {
            Task::StartCluster {
                cluster, template, ..
            } => cluster::start(&scope, cluster, template).await,
            Task::TerminateCluster { cluster, .. } => cluster::terminate(&scope, cluster).await,
            Task::SubmitJob {
                cluster,
                job_id,
                script,
                job_id_url,
                ..
            } => submit::submit(&scope, cluster, job_id, script, job_id_url).await,
            Task::MonitorJob {
                cluster,
                job_id,
                scheduler_job_id,
                job_dir,
                ..
            } => monitor::monitor(&scope, cluster, job_id, scheduler_job_id, job_dir).await,
            Task::UploadOutput {
                cluster,
                scheduler_job_id,
                job_dir,
                ..
            } => upload::upload(&scope, cluster, scheduler_job_id, job_dir).await,
        };

        scope.release().await;
        result
    }
}

/// One task delivery's view of the context: its envelope, its callbacks and
/// the log lines it has captured so far.
pub struct TaskScope<'a> {
    pub ctx: &'a TaskContext,
    pub envelope: &'a Envelope,
    pub log: LogCapture,
}

impl<'a> TaskScope<'a> {
    pub fn new(ctx: &'a TaskContext, envelope: &'a Envelope) -> Self {
        Self {
            ctx,
            envelope,
            log: LogCapture::new(),
        }
    }

    pub fn callbacks(&self) -> &Callbacks {
        self.envelope.task.callbacks()
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    pub async fn fetch_config(&self) -> Result<ConfigDocument> {
        let callbacks = self.callbacks();
        Ok(self
            .ctx
            .config_source
            .fetch(&callbacks.config_url, &callbacks.token)
            .await?)
    }

    pub async fn report(&self, status: impl Into<Status>) -> Result<()> {
        let status = status.into();
        let callbacks = self.callbacks();
        tracing::debug!("Reporting status '{}'", status);
        self.ctx
            .reporter
            .push_status(&callbacks.status_url, &callbacks.token, status)
            .await?;
        Ok(())
    }

    pub async fn dispatch(&self, task: Task) -> Result<TaskId> {
        self.ctx.queue.dispatch(task).await
    }

    /// Requeues this task after `delay`. The current delivery should return
    /// right after.
    pub async fn reschedule(&self, delay: Duration) -> Result<()> {
        self.ctx
            .queue
            .reschedule(self.envelope.rescheduled(), delay)
            .await
    }

    /// Shared failure policy for job tasks. Remote command failures are
    /// logged and swallowed unless escalation is configured. Anything else
    /// gets a best-effort `error_status` push before being returned.
    pub async fn settle(&self, result: Result<()>, error_status: impl Into<Status>) -> Result<()> {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if err.is_remote_failure() && !self.settings().tasks.escalate_remote_failures {
            self.log.error(err.to_string());
            return Ok(());
        }

        if let Err(push_err) = self.report(error_status).await {
            tracing::warn!("Could not report error status: {}", push_err);
        }
        Err(err)
    }

    /// Forwards captured log lines to the task's log endpoint, if it has one.
    /// Forwarding problems are logged and otherwise ignored.
    async fn release(self) {
        let records = self.log.drain();
        let callbacks = self.envelope.task.callbacks();
        let Some(url) = callbacks.log_url.as_deref() else {
            return;
        };
        if records.is_empty() {
            return;
        }

        if let Err(e) = self
            .ctx
            .log_sink
            .forward(url, &callbacks.token, &records)
            .await
        {
            tracing::warn!("{}", e);
        }
    }
}
