pub mod cluster;
pub mod context;
pub mod error;
pub mod monitor;
pub mod queue;
pub mod sge;
pub mod submit;
pub mod task;
pub mod upload;
pub mod worker;

pub use context::{TaskContext, TaskScope};
pub use error::{Result, TaskError};
pub use queue::{Envelope, LocalTaskQueue, TaskId, TaskQueue};
pub use task::{Callbacks, Task};
pub use worker::{RunSummary, WorkerPool};
