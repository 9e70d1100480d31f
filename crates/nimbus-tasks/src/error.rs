use nimbus_client::ClientError;
use nimbus_core::errors::StateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Scheduler reported no slot count for parallel environment '{parallel_env}'")]
    SlotDiscovery { parallel_env: String },

    #[error("Unexpected submission output: {0}")]
    SubmissionParse(String),

    #[error("Scheduler job {job} is in unrecognized state '{code}'")]
    UnrecognizedSchedulerState { job: String, code: String },

    #[error("Job directory '{dir}' already exists on the control node")]
    JobDirectoryCollision { dir: String },

    #[error("Cannot derive an upload URL from status URL '{0}'")]
    UploadUrl(String),

    #[error("Scheduler job {job} was accepted but its submission did not complete: {source}")]
    Submitted {
        job: String,
        #[source]
        source: Box<TaskError>,
    },

    #[error("Task queue error: {0}")]
    Queue(String),

    #[error("Failed to decode task message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TaskError {
    /// Failures of a command on the control node. These are logged and
    /// swallowed unless `tasks.escalate_remote_failures` is set.
    pub fn is_remote_failure(&self) -> bool {
        match self {
            TaskError::Client(e) => e.is_remote_failure(),
            TaskError::Submitted { source, .. } => source.is_remote_failure(),
            _ => false,
        }
    }

    /// Whether a failed delivery may run again. Failures that already
    /// decided the job's fate, or that happened after the scheduler accepted
    /// it, are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TaskError::UnrecognizedSchedulerState { .. }
                | TaskError::SlotDiscovery { .. }
                | TaskError::SubmissionParse(_)
                | TaskError::JobDirectoryCollision { .. }
                | TaskError::Submitted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
