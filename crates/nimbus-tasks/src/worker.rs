use crate::context::TaskContext;
use crate::queue::{Envelope, LocalTaskQueue, TaskId};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub id: TaskId,
    pub task: &'static str,
    pub message: String,
}

/// What a pool run got through. Rescheduled deliveries count as succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub retried: usize,
    pub failed: Vec<TaskFailure>,
}

struct Shared {
    context: Arc<TaskContext>,
    queue: LocalTaskQueue,
    receiver: Mutex<mpsc::UnboundedReceiver<Envelope>>,
    shutdown: CancellationToken,
    summary: StdMutex<RunSummary>,
}

/// A fixed number of workers pulling envelopes off a `LocalTaskQueue`. Each
/// delivery runs to completion on one worker.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(
        context: Arc<TaskContext>,
        queue: LocalTaskQueue,
        receiver: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        let workers = context.settings.workers.count.max(1);
        Self {
            shared: Arc::new(Shared {
                context,
                queue,
                receiver: Mutex::new(receiver),
                shutdown: CancellationToken::new(),
                summary: StdMutex::new(RunSummary::default()),
            }),
            workers,
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    /// Runs until the shutdown token is cancelled. Deliveries already in
    /// progress are finished first.
    pub async fn run(self) -> RunSummary {
        tracing::info!("Starting {} worker(s)", self.workers);
        let mut set = JoinSet::new();
        for index in 0..self.workers {
            let shared = self.shared.clone();
            set.spawn(worker_loop(index, shared));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker terminated abnormally: {}", e);
            }
        }

        self.summary()
    }

    /// Runs until nothing is queued, delayed or in flight, then shuts down.
    pub async fn run_until_idle(self) -> RunSummary {
        let queue = self.shared.queue.clone();
        let shutdown = self.shutdown_token();
        tokio::spawn(async move {
            queue.wait_idle().await;
            tracing::debug!("Task queue is idle");
            shutdown.cancel();
        });
        self.run().await
    }

    fn summary(&self) -> RunSummary {
        self.shared
            .summary
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

async fn worker_loop(index: usize, shared: Arc<Shared>) {
    loop {
        let next = {
            let mut receiver = shared.receiver.lock().await;
            tokio::select! {
                _ = shared.shutdown.cancelled() => None,
                envelope = receiver.recv() => envelope,
            }
        };

        let Some(envelope) = next else {
            tracing::debug!("Worker {} stopping", index);
            break;
        };

        shared.deliver(envelope).await;
    }
}

impl Shared {
    async fn deliver(&self, envelope: Envelope) {
        let span = tracing::info_span!(
            "task",
            name = envelope.task.name(),
            id = %envelope.id,
            cluster = %envelope.task.cluster(),
            attempt = envelope.failures + 1,
            reschedules = envelope.reschedules,
        );

        let outcome = self.context.execute(&envelope).instrument(span.clone()).await;
        let workers = &self.context.settings.workers;

        let _entered = span.enter();
        let mut retried = false;
        let mut failure = None;
        match outcome {
            Ok(()) => tracing::debug!("Task finished"),
            Err(e) if e.is_retryable() && envelope.failures < workers.max_failure_retries => {
                tracing::warn!(
                    "Task failed, retrying in {}s: {}",
                    workers.retry_delay_secs,
                    e
                );
                self.queue
                    .enqueue_after(envelope.failed(), workers.retry_delay());
                retried = true;
            }
            Err(e) => {
                tracing::error!("Task failed: {}", e);
                failure = Some(TaskFailure {
                    id: envelope.id,
                    task: envelope.task.name(),
                    message: e.to_string(),
                });
            }
        }

        if let Ok(mut summary) = self.summary.lock() {
            match failure {
                Some(f) => summary.failed.push(f),
                None if retried => summary.retried += 1,
                None => summary.succeeded += 1,
            }
        }
        self.queue.complete();
    }
}
