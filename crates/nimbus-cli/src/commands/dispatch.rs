use super::{cancel_on_interrupt, Runtime};
use crate::error::{CliError, Result};
use nimbus_core::config::Settings;
use nimbus_tasks::{RunSummary, Task, TaskQueue};

/// Dispatches `task` and runs workers until it and everything it chained
/// have finished.
pub async fn run(settings: Settings, task: Task) -> Result<RunSummary> {
    let runtime = Runtime::new(settings)?;
    cancel_on_interrupt(&runtime.pool);

    let id = runtime.queue.dispatch(task).await?;
    tracing::info!("Dispatched task {}", id);

    let summary = runtime.pool.run_until_idle().await;
    check(summary)
}

pub(crate) fn check(summary: RunSummary) -> Result<RunSummary> {
    if summary.failed.is_empty() {
        return Ok(summary);
    }
    Err(CliError::TasksFailed {
        failed: summary.failed.len(),
        total: summary.failed.len() + summary.succeeded + summary.retried,
    })
}
