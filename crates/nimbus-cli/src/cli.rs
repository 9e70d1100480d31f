use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nimbus",
    author,
    version,
    about = "Cluster and batch job orchestration tasks.",
    long_about = "Runs cluster lifecycle and grid-scheduler job tasks, reporting progress back to an orchestrator over HTTP."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Settings file (defaults to $XDG_CONFIG_HOME/nimbus/config.toml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Log to stderr instead of the session log file")]
    pub stderr: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Provision a cluster from a template")]
    StartCluster(StartClusterArgs),

    #[command(about = "Decommission a cluster")]
    TerminateCluster(TerminateClusterArgs),

    #[command(about = "Submit a job script and monitor it until its output is uploaded")]
    SubmitJob(SubmitJobArgs),

    #[command(about = "Monitor an already submitted job")]
    MonitorJob(MonitorJobArgs),

    #[command(about = "Run workers fed with JSON task messages on stdin, one per line")]
    Worker,
}

#[derive(Args, Clone)]
pub struct CallbackArgs {
    #[arg(long, help = "URL of the cluster configuration document")]
    pub config_url: String,

    #[arg(long, help = "URL that receives status updates")]
    pub status_url: String,

    #[arg(long, help = "Token sent with every callback")]
    pub token: String,

    #[arg(long, help = "URL that receives forwarded log records")]
    pub log_url: Option<String>,
}

#[derive(Args)]
pub struct StartClusterArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub template: String,

    #[command(flatten)]
    pub callbacks: CallbackArgs,
}

#[derive(Args)]
pub struct TerminateClusterArgs {
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub callbacks: CallbackArgs,
}

#[derive(Args)]
pub struct SubmitJobArgs {
    #[arg(long)]
    pub cluster: String,

    #[arg(long)]
    pub job_id: String,

    #[arg(long, help = "Local path of the job script")]
    pub script: PathBuf,

    #[arg(long, help = "URL that receives the scheduler job id")]
    pub job_id_url: String,

    #[command(flatten)]
    pub callbacks: CallbackArgs,
}

#[derive(Args)]
pub struct MonitorJobArgs {
    #[arg(long)]
    pub cluster: String,

    #[arg(long)]
    pub job_id: String,

    #[arg(long)]
    pub scheduler_job_id: String,

    #[arg(long, help = "Job directory on the control node")]
    pub job_dir: String,

    #[command(flatten)]
    pub callbacks: CallbackArgs,
}
