use crate::constants::http;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub ssh: SshConfig,
    pub scheduler: SchedulerConfig,
    pub upload: UploadConfig,
    pub workers: WorkerConfig,
    pub tasks: TaskPolicy,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub max_files: usize,
    pub max_age_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_age_days: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub token_header: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            token_header: http::DEFAULT_TOKEN_HEADER.to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub program: String,
    pub copy_program: String,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    /// Upper bound on a single remote command. Zero disables the limit.
    pub command_timeout_secs: u64,
    pub extra_args: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            copy_program: "scp".to_string(),
            user: None,
            identity_file: None,
            connect_timeout_secs: 10,
            command_timeout_secs: 300,
            extra_args: vec!["-o".to_string(), "BatchMode=yes".to_string()],
        }
    }
}

impl SshConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub parallel_env: String,
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel_env: "orte".to_string(),
            poll_interval_secs: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub helper: PathBuf,
    pub interpreter: String,
    pub collection: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            helper: PathBuf::from("girderclient.py"),
            interpreter: "python".to_string(),
            collection: "54513fa4ff34c70948c27fdb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    pub max_failure_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: num_cpus::get(),
            max_failure_retries: 0,
            retry_delay_secs: 30,
        }
    }
}

impl WorkerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPolicy {
    /// When set, a failed remote command is treated like any other fatal
    /// error: an `error` status is pushed and the task fails. Otherwise it
    /// is logged and the task completes.
    pub escalate_remote_failures: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Starcluster,
    Inventory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub program: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Starcluster,
            program: "starcluster".to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or from `$XDG_CONFIG_HOME/nimbus/config.toml`
    /// when no path is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => xdg::BaseDirectories::with_prefix("nimbus").find_config_file("config.toml"),
        };

        let Some(config_path) = resolved else {
            tracing::debug!("No configuration file found, using defaults");
            return Ok(Settings::default());
        };

        let content =
            fs_err::read_to_string(&config_path).map_err(|source| ConfigError::PathIo {
                path: config_path.clone(),
                source,
            })?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.count == 0 {
            return Err(ConfigError::General(
                "workers.count must be at least 1".to_string(),
            ));
        }
        if self.http.token_header.trim().is_empty() {
            return Err(ConfigError::General(
                "http.token_header must not be empty".to_string(),
            ));
        }
        if self.scheduler.parallel_env.trim().is_empty() {
            return Err(ConfigError::General(
                "scheduler.parallel_env must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
