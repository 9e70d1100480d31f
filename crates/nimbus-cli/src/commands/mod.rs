use crate::cli::CallbackArgs;
use crate::error::Result;
use nimbus_core::config::Settings;
use nimbus_core::model::AuthToken;
use nimbus_tasks::{Callbacks, LocalTaskQueue, TaskContext, WorkerPool};
use std::sync::Arc;

pub mod dispatch;
pub mod worker;

impl From<CallbackArgs> for Callbacks {
    fn from(args: CallbackArgs) -> Self {
        Callbacks {
            config_url: args.config_url,
            status_url: args.status_url,
            token: AuthToken::new(args.token),
            log_url: args.log_url,
        }
    }
}

/// A local queue plus the worker pool draining it.
pub struct Runtime {
    pub queue: LocalTaskQueue,
    pub pool: WorkerPool,
}

impl Runtime {
    pub fn new(settings: Settings) -> Result<Self> {
        let (queue, receiver) = LocalTaskQueue::new();
        let context = TaskContext::from_settings(settings, Arc::new(queue.clone()))?;
        let pool = WorkerPool::new(Arc::new(context), queue.clone(), receiver);
        Ok(Self { queue, pool })
    }
}

/// Cancels `pool` on Ctrl-C.
pub(crate) fn cancel_on_interrupt(pool: &WorkerPool) {
    let token = pool.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing tasks in progress");
            token.cancel();
        }
    });
}
