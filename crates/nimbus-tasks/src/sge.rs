//! Commands sent to the grid scheduler on the control node and the parsing of
//! what comes back.

use crate::error::{Result, TaskError};
use nimbus_client::RemoteCommand;
use nimbus_core::constants::sge;
use nimbus_core::model::{JobStatus, SchedulerJobId};
use once_cell::sync::Lazy;
use regex::Regex;

static SLOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"slots\s+(\d+)").expect("slots pattern is valid"));

static SUBMITTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[Yy]our job (\d+)").expect("submission pattern is valid"));

static QUEUE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s+\S+\s+\S+\s+\S+\s+(\w+)").expect("queue line pattern is valid")
});

pub fn slots_query(parallel_env: &str) -> RemoteCommand {
    RemoteCommand::new(sge::QCONF).arg("-sp").arg(parallel_env)
}

/// Slot count from the first line of `qconf -sp` output that carries one.
pub fn parse_slots(lines: &[String], parallel_env: &str) -> Result<u32> {
    lines
        .iter()
        .find_map(|line| SLOTS.captures(line))
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| TaskError::SlotDiscovery {
            parallel_env: parallel_env.to_string(),
        })
}

/// `cd <dir> && qsub -o <dir>/<script>.o -e <dir>/<script>.e -pe <pe> <n> ./<script>`
pub fn submit_command(job_dir: &str, script: &str, parallel_env: &str, slots: u32) -> RemoteCommand {
    let stdout = format!("{}/{}{}", job_dir, script, sge::STDOUT_SUFFIX);
    let stderr = format!("{}/{}{}", job_dir, script, sge::STDERR_SUFFIX);

    RemoteCommand::new("cd").arg(job_dir).and(
        RemoteCommand::new(sge::QSUB)
            .arg("-o")
            .arg(&stdout)
            .arg("-e")
            .arg(&stderr)
            .arg("-pe")
            .arg(parallel_env)
            .arg(&slots.to_string())
            .arg(&format!("./{}", script)),
    )
}

/// `qsub` is expected to answer with a single "Your job <id> ..." line.
/// Blank lines are ignored.
pub fn parse_submission(lines: &[String]) -> Result<SchedulerJobId> {
    let meaningful: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();

    let [line] = meaningful.as_slice() else {
        return Err(TaskError::SubmissionParse(format!(
            "expected one line, got {}: {:?}",
            meaningful.len(),
            meaningful
        )));
    };

    SUBMITTED
        .captures(line)
        .map(|caps| SchedulerJobId(caps[1].to_string()))
        .ok_or_else(|| TaskError::SubmissionParse(format!("no job id in '{}'", line)))
}

pub fn queue_listing() -> RemoteCommand {
    RemoteCommand::new(sge::QSTAT)
}

/// Raw state code of `job` in a `qstat` listing, or `None` once the job has
/// left the queue.
pub fn find_job_state(lines: &[String], job: &SchedulerJobId) -> Option<String> {
    lines
        .iter()
        .filter_map(|line| QUEUE_LINE.captures(line))
        .filter(|caps| &caps[1] == job.0.as_str())
        .map(|caps| caps[2].to_string())
        .last()
}

pub fn classify(job: &SchedulerJobId, code: &str) -> Result<JobStatus> {
    JobStatus::from_scheduler_code(code).ok_or_else(|| TaskError::UnrecognizedSchedulerState {
        job: job.0.clone(),
        code: code.to_string(),
    })
}
