use crate::model::{ClusterStatus, JobStatus, SchedulerJobId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path '{path}': {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    General(String),

    #[error("Could not determine the cache directory for log files.")]
    CacheDirectoryNotFound,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Could not parse {token} for host {host}")]
    MalformedVariable { token: String, host: String },

    #[error("Failed to read inventory '{path}': {message}")]
    Read { path: PathBuf, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Cluster '{name}' cannot move from '{from}' to '{to}'.")]
    ClusterTransition {
        name: String,
        from: ClusterStatus,
        to: ClusterStatus,
    },

    #[error("Job '{id}' cannot move from '{from}' to '{to}'.")]
    JobTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job '{id}' already has scheduler job id '{existing}'.")]
    SchedulerIdReassigned {
        id: String,
        existing: SchedulerJobId,
    },
}
