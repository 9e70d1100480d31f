use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] nimbus_core::errors::ConfigError),

    #[error(transparent)]
    Task(#[from] nimbus_tasks::TaskError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{failed} of {total} task deliveries failed")]
    TasksFailed { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, CliError>;
