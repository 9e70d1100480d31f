use super::{cancel_on_interrupt, Runtime};
use crate::error::Result;
use nimbus_core::config::Settings;
use nimbus_tasks::{LocalTaskQueue, RunSummary, Task, TaskQueue};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Feeds JSON task messages from stdin to the worker pool. Undecodable lines
/// are logged and skipped. At end of input the pool drains and stops.
pub async fn serve(settings: Settings) -> Result<RunSummary> {
    let runtime = Runtime::new(settings)?;
    cancel_on_interrupt(&runtime.pool);

    let queue = runtime.queue.clone();
    let shutdown = runtime.pool.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = read_tasks(&queue).await {
            tracing::error!("Failed to read task messages: {}", e);
        }
        queue.wait_idle().await;
        shutdown.cancel();
    });

    Ok(runtime.pool.run().await)
}

async fn read_tasks(queue: &LocalTaskQueue) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match Task::from_json(&line) {
            Ok(task) => {
                if let Err(e) = queue.dispatch(task).await {
                    tracing::error!("{}", e);
                }
            }
            Err(e) => tracing::error!("Skipping task message: {}", e),
        }
    }
    Ok(())
}
