use nimbus_core::model::{AuthToken, ClusterName, JobId, SchedulerJobId};
use serde::{Deserialize, Serialize};

/// Where a task reads its configuration from and reports back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callbacks {
    pub config_url: String,
    pub status_url: String,
    pub token: AuthToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

/// A unit of work as it travels through the queue. Externally produced
/// messages use the same shape, e.g. `{"task": "terminate_cluster", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    StartCluster {
        cluster: ClusterName,
        template: String,
        #[serde(flatten)]
        callbacks: Callbacks,
    },
    TerminateCluster {
        cluster: ClusterName,
        #[serde(flatten)]
        callbacks: Callbacks,
    },
    SubmitJob {
        cluster: ClusterName,
        job_id: JobId,
        script: String,
        job_id_url: String,
        #[serde(flatten)]
        callbacks: Callbacks,
    },
    MonitorJob {
        cluster: ClusterName,
        job_id: JobId,
        scheduler_job_id: SchedulerJobId,
        job_dir: String,
        #[serde(flatten)]
        callbacks: Callbacks,
    },
    UploadOutput {
        cluster: ClusterName,
        job_id: JobId,
        scheduler_job_id: SchedulerJobId,
        job_dir: String,
        #[serde(flatten)]
        callbacks: Callbacks,
    },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::StartCluster { .. } => "start_cluster",
            Task::TerminateCluster { .. } => "terminate_cluster",
            Task::SubmitJob { .. } => "submit_job",
            Task::MonitorJob { .. } => "monitor_job",
            Task::UploadOutput { .. } => "upload_output",
        }
    }

    pub fn cluster(&self) -> &ClusterName {
        match self {
            Task::StartCluster { cluster, .. }
            | Task::TerminateCluster { cluster, .. }
            | Task::SubmitJob { cluster, .. }
            | Task::MonitorJob { cluster, .. }
            | Task::UploadOutput { cluster, .. } => cluster,
        }
    }

    pub fn callbacks(&self) -> &Callbacks {
        match self {
            Task::StartCluster { callbacks, .. }
            | Task::TerminateCluster { callbacks, .. }
            | Task::SubmitJob { callbacks, .. }
            | Task::MonitorJob { callbacks, .. }
            | Task::UploadOutput { callbacks, .. } => callbacks,
        }
    }

    pub fn from_json(line: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callbacks() -> Callbacks {
        Callbacks {
            config_url: "http://girder/api/v1/clusters/c1/config".to_string(),
            status_url: "http://girder/api/v1/jobs/j1/status".to_string(),
            token: AuthToken::new("tok"),
            log_url: None,
        }
    }

    #[test]
    fn test_message_from_external_producer() {
        let line = r#"{"task":"terminate_cluster","cluster":"c1",
            "config_url":"http://girder/config","status_url":"http://girder/status",
            "token":"abc","log_url":"http://girder/log"}"#;
        let task = Task::from_json(line).unwrap();

        assert_eq!(task.name(), "terminate_cluster");
        assert_eq!(task.cluster(), &ClusterName::from("c1"));
        assert_eq!(task.callbacks().token.expose(), "abc");
        assert_eq!(task.callbacks().log_url.as_deref(), Some("http://girder/log"));
    }

    #[test]
    fn test_monitor_task_survives_the_queue() {
        let task = Task::MonitorJob {
            cluster: "c1".into(),
            job_id: "j1".into(),
            scheduler_job_id: "123".into(),
            job_dir: "j1/2024-01-01-00-00-00".to_string(),
            callbacks: callbacks(),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""task":"monitor_job""#));
        assert!(json.contains(r#""scheduler_job_id":"123""#));
        assert!(!json.contains("log_url"));
        assert_eq!(Task::from_json(&json).unwrap(), task);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let err = Task::from_json(r#"{"task":"reboot_cluster","cluster":"c1"}"#).unwrap_err();
        assert!(matches!(err, crate::TaskError::Decode(_)));
    }
}
