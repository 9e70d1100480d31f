//! The task queue runtime. Dispatch is fire-and-forget; a running task may
//! requeue itself after a delay instead of holding its worker.

use crate::error::{Result, TaskError};
use crate::task::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A task plus its delivery bookkeeping. `reschedules` counts voluntary
/// requeues and has no upper bound; `failures` counts failed deliveries and
/// is capped by the worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: TaskId,
    pub task: Task,
    pub reschedules: u64,
    pub failures: u32,
}

impl Envelope {
    pub fn new(task: Task) -> Self {
        Self {
            id: TaskId::new(),
            task,
            reschedules: 0,
            failures: 0,
        }
    }

    pub fn rescheduled(&self) -> Self {
        Self {
            reschedules: self.reschedules + 1,
            ..self.clone()
        }
    }

    pub fn failed(&self) -> Self {
        Self {
            failures: self.failures + 1,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn dispatch(&self, task: Task) -> Result<TaskId>;

    /// Puts `envelope` back on the queue once `delay` has elapsed. Returns
    /// immediately.
    async fn reschedule(&self, envelope: Envelope, delay: Duration) -> Result<()>;
}

#[derive(Debug, Default)]
struct Tracker {
    outstanding: AtomicUsize,
    idle: Notify,
}

/// In-process queue backed by an unbounded channel. Tracks every envelope
/// that is queued, waiting out a delay, or being worked on, so a one-shot
/// run can tell when nothing is left.
#[derive(Debug, Clone)]
pub struct LocalTaskQueue {
    sender: mpsc::UnboundedSender<Envelope>,
    tracker: Arc<Tracker>,
}

impl LocalTaskQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            sender,
            tracker: Arc::new(Tracker::default()),
        };
        (queue, receiver)
    }

    pub fn enqueue(&self, envelope: Envelope) -> Result<()> {
        self.tracker.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(envelope).is_err() {
            self.complete();
            return Err(TaskError::Queue("the worker pool has shut down".to_string()));
        }
        Ok(())
    }

    pub fn enqueue_after(&self, envelope: Envelope, delay: Duration) {
        if delay.is_zero() {
            if let Err(e) = self.enqueue(envelope) {
                tracing::warn!("Dropping requeued task: {}", e);
            }
            return;
        }

        // Counted now so the queue does not look idle while the timer runs.
        self.tracker.outstanding.fetch_add(1, Ordering::SeqCst);
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.sender.send(envelope).is_err() {
                tracing::warn!("Dropping requeued task: the worker pool has shut down");
                queue.complete();
            }
        });
    }

    /// Marks one envelope as finished with.
    pub fn complete(&self) {
        let previous = self.tracker.outstanding.fetch_sub(1, Ordering::SeqCst);
        if previous <= 1 {
            self.tracker.idle.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding.load(Ordering::SeqCst)
    }

    pub async fn wait_idle(&self) {
        loop {
            let notified = self.tracker.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn dispatch(&self, task: Task) -> Result<TaskId> {
        let envelope = Envelope::new(task);
        let id = envelope.id;
        tracing::debug!("Dispatching {} ({})", envelope.task.name(), id);
        self.enqueue(envelope)?;
        Ok(id)
    }

    async fn reschedule(&self, envelope: Envelope, delay: Duration) -> Result<()> {
        tracing::debug!(
            "Rescheduling {} ({}) in {}s",
            envelope.task.name(),
            envelope.id,
            delay.as_secs()
        );
        self.enqueue_after(envelope, delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Callbacks;
    use nimbus_core::model::AuthToken;

    fn terminate() -> Task {
        Task::TerminateCluster {
            cluster: "c1".into(),
            callbacks: Callbacks {
                config_url: "http://h/config".to_string(),
                status_url: "http://h/status".to_string(),
                token: AuthToken::new("t"),
                log_url: None,
            },
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_envelope() {
        let (queue, mut rx) = LocalTaskQueue::new();
        let id = queue.dispatch(terminate()).await.unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.id, id);
        assert_eq!(envelope.reschedules, 0);
        assert_eq!(queue.outstanding(), 1);

        queue.complete();
        assert_eq!(queue.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_waits_for_delay() {
        let (queue, mut rx) = LocalTaskQueue::new();
        let envelope = Envelope::new(terminate()).rescheduled();
        queue
            .reschedule(envelope.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(queue.outstanding(), 1);
        assert!(rx.try_recv().is_err());

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered, envelope);
        assert_eq!(delivered.reschedules, 1);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_fails() {
        let (queue, rx) = LocalTaskQueue::new();
        drop(rx);
        let err = queue.dispatch(terminate()).await.unwrap_err();
        assert!(matches!(err, TaskError::Queue(_)));
        assert_eq!(queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_returns_when_drained() {
        let (queue, mut rx) = LocalTaskQueue::new();
        queue.dispatch(terminate()).await.unwrap();

        let worker = queue.clone();
        tokio::spawn(async move {
            rx.recv().await.unwrap();
            worker.complete();
        });

        tokio::time::timeout(Duration::from_secs(5), queue.wait_idle())
            .await
            .unwrap();
    }

    #[test]
    fn test_counters_are_independent() {
        let envelope = Envelope::new(terminate()).rescheduled().rescheduled().failed();
        assert_eq!(envelope.reschedules, 2);
        assert_eq!(envelope.failures, 1);
    }
}
