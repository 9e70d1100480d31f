pub mod error;
pub mod fetch;
pub mod http;
pub mod logs;
pub mod provider;
pub mod remote_command;
pub mod ssh;
pub mod status;

pub use error::{ClientError, Result};
pub use fetch::{ConfigSource, ScopedFile};
pub use http::HttpCallbacks;
pub use logs::{LogCapture, LogRecord, LogSink};
pub use provider::ClusterProvider;
pub use remote_command::RemoteCommand;
pub use ssh::{ControlNode, RemoteConnector, RemoteExecutor, SshConnector};
pub use status::StatusReporter;
