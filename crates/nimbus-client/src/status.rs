use crate::error::Result;
use async_trait::async_trait;
use nimbus_core::model::{AuthToken, SchedulerJobId, Status};

/// Pushes state transitions to the orchestrator. Updates are not sequenced
/// or deduplicated; receivers must tolerate repeats and reordering.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn push_status(&self, url: &str, token: &AuthToken, status: Status) -> Result<()>;

    async fn push_scheduler_job_id(
        &self,
        url: &str,
        token: &AuthToken,
        id: &SchedulerJobId,
    ) -> Result<()>;
}
