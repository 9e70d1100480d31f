use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] nimbus_core::errors::ConfigError),

    #[error(transparent)]
    Inventory(#[from] nimbus_core::errors::InventoryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to fetch cluster configuration from '{url}': {message}")]
    ConfigFetch { url: String, message: String },

    #[error("Remote command '{command}' failed on '{node}': {message}")]
    RemoteCommandFailure {
        node: String,
        command: String,
        message: String,
    },

    #[error("Status update '{status}' was rejected by '{url}': {message}")]
    StatusPushFailure {
        url: String,
        status: String,
        message: String,
    },

    #[error("Cluster '{0}' does not exist.")]
    ClusterNotFound(String),

    #[error("Cluster template '{0}' is not defined in the configuration.")]
    UnknownTemplate(String),

    #[error("Cluster provider failed: {0}")]
    Provider(String),

    #[error("Failed to forward log records to '{url}': {message}")]
    LogForward { url: String, message: String },
}

impl ClientError {
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, ClientError::RemoteCommandFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
