use clap::Parser;
use colored::Colorize;
use nimbus_core::config::Settings;
use nimbus_core::logging;
use nimbus_tasks::{RunSummary, Task};

mod cli;
mod commands;
mod error;

use cli::{Cli, Commands};
use error::Result;

fn init_logging(cli: &Cli, settings: &Settings) {
    logging::set_log_level_from_env();
    logging::set_log_level_from_verbosity(cli.verbose);

    if cli.stderr {
        logging::init_stderr_logger();
        return;
    }
    if let Err(e) = logging::init_session_logger(&settings.logging) {
        logging::init_stderr_logger();
        tracing::warn!("Session log unavailable, logging to stderr: {}", e);
    }
}

fn task_for(command: Commands) -> Result<Option<Task>> {
    let task = match command {
        Commands::StartCluster(args) => Task::StartCluster {
            cluster: args.name.as_str().into(),
            template: args.template,
            callbacks: args.callbacks.into(),
        },
        Commands::TerminateCluster(args) => Task::TerminateCluster {
            cluster: args.name.as_str().into(),
            callbacks: args.callbacks.into(),
        },
        Commands::SubmitJob(args) => Task::SubmitJob {
            cluster: args.cluster.as_str().into(),
            job_id: args.job_id.as_str().into(),
            script: fs_err::read_to_string(&args.script)?,
            job_id_url: args.job_id_url,
            callbacks: args.callbacks.into(),
        },
        Commands::MonitorJob(args) => Task::MonitorJob {
            cluster: args.cluster.as_str().into(),
            job_id: args.job_id.as_str().into(),
            scheduler_job_id: args.scheduler_job_id.as_str().into(),
            job_dir: args.job_dir,
            callbacks: args.callbacks.into(),
        },
        Commands::Worker => return Ok(None),
    };
    Ok(Some(task))
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(&cli, &settings);

    match task_for(cli.command)? {
        Some(task) => commands::dispatch::run(settings, task).await,
        None => commands::worker::serve(settings).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(summary) => {
            println!(
                "{} {} task(s) finished, {} retried",
                "Done:".green().bold(),
                summary.succeeded,
                summary.retried
            );
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
