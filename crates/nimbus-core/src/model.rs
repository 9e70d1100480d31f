use crate::constants::sge;
use crate::errors::StateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ClusterName(pub String);

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClusterName {
    fn from(s: &str) -> Self {
        ClusterName(s.to_string())
    }
}

/// Caller-supplied identifier of a job record in the orchestrator.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Identifier assigned by the grid scheduler when a job is accepted.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SchedulerJobId(pub String);

impl fmt::Display for SchedulerJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SchedulerJobId {
    fn from(s: &str) -> Self {
        SchedulerJobId(s.to_string())
    }
}

/// Token presented to the orchestrator on every callback. Never printed.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Initializing,
    Running,
    Terminated,
    Error,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Initializing => "initializing",
            ClusterStatus::Running => "running",
            ClusterStatus::Terminated => "terminated",
            ClusterStatus::Error => "error",
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status: '{}'", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ClusterStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(ClusterStatus::Initializing),
            "running" => Ok(ClusterStatus::Running),
            "terminated" => Ok(ClusterStatus::Terminated),
            "error" => Ok(ClusterStatus::Error),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Queued,
    Running,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// Maps a raw grid-scheduler state code to the coarse status it
    /// represents. Unknown codes yield `None`.
    pub fn from_scheduler_code(code: &str) -> Option<JobStatus> {
        if sge::RUNNING_STATES.contains(&code) {
            Some(JobStatus::Running)
        } else if sge::QUEUED_STATES.contains(&code) {
            Some(JobStatus::Queued)
        } else {
            None
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobStatus::Created),
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "complete" => Ok(JobStatus::Complete),
            "error" => Ok(JobStatus::Error),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// A state-transition notification as it goes over the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Status {
    Cluster(ClusterStatus),
    Job(JobStatus),
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Cluster(s) => s.as_str(),
            Status::Job(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ClusterStatus> for Status {
    fn from(s: ClusterStatus) -> Self {
        Status::Cluster(s)
    }
}

impl From<JobStatus> for Status {
    fn from(s: JobStatus) -> Self {
        Status::Job(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub name: ClusterName,
    pub template: Option<String>,
    status: ClusterStatus,
}

impl ClusterHandle {
    pub fn new(name: ClusterName, template: Option<String>) -> Self {
        Self {
            name,
            template,
            status: ClusterStatus::Initializing,
        }
    }

    pub fn status(&self) -> ClusterStatus {
        self.status
    }

    /// Statuses only move forward; `error` can be entered from anywhere and
    /// is never left.
    pub fn transition(&mut self, to: ClusterStatus) -> Result<(), StateError> {
        let allowed = match (self.status, to) {
            (ClusterStatus::Error, _) => false,
            (_, ClusterStatus::Error) => true,
            (from, to) => to >= from,
        };
        if !allowed {
            return Err(StateError::ClusterTransition {
                name: self.name.0.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: JobId,
    pub job_dir: Option<String>,
    scheduler_job_id: Option<SchedulerJobId>,
    status: JobStatus,
}

impl JobRecord {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            job_dir: None,
            scheduler_job_id: None,
            status: JobStatus::Created,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn scheduler_job_id(&self) -> Option<&SchedulerJobId> {
        self.scheduler_job_id.as_ref()
    }

    pub fn assign_scheduler_id(&mut self, id: SchedulerJobId) -> Result<(), StateError> {
        if let Some(existing) = &self.scheduler_job_id {
            return Err(StateError::SchedulerIdReassigned {
                id: self.id.0.clone(),
                existing: existing.clone(),
            });
        }
        self.scheduler_job_id = Some(id);
        Ok(())
    }

    pub fn transition(&mut self, to: JobStatus) -> Result<(), StateError> {
        use JobStatus::*;
        let allowed = match (self.status, to) {
            (from, _) if from.is_terminal() => false,
            (_, Error) => true,
            (from, to) if from == to => true,
            (Created, Queued) => true,
            (Queued, Running) | (Running, Queued) => true,
            (Queued, Complete) | (Running, Complete) => true,
            _ => false,
        };
        if !allowed {
            return Err(StateError::JobTransition {
                id: self.id.0.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
