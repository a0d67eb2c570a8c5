mod cache;
mod cli;
mod core;
mod environment;
mod error;
mod execution;

use anyhow::{Context, Result};
use cache::{CacheStore, FsCacheStore, MemoryCacheStore};
use cli::commands::{RunCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use environment::{GitCheckout, LocalProvisioner, NoCheckout, SourceControl};
use execution::PipelineEngine;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::core::config::JobConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_job(cmd).await?,
        Command::Validate(cmd) => validate_job(cmd)?,
    }

    Ok(())
}

async fn run_job(cmd: &RunCommand) -> Result<()> {
    // Load job config
    let config = JobConfig::from_file(&cmd.file).context("Failed to load job config")?;
    let job = config.to_job();

    println!("{} Loaded job: {}", INFO, style(&job.name).bold());

    // Wire up the collaborators
    let workspace_root = cmd
        .workspace
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("jobline"));
    let provisioner = Arc::new(LocalProvisioner::new(workspace_root));

    let source_control: Arc<dyn SourceControl> = match &job.repository {
        Some(url) => Arc::new(GitCheckout::new(url.clone(), job.reference.clone())),
        None => Arc::new(NoCheckout),
    };

    let store: Arc<dyn CacheStore> = if cmd.no_cache {
        Arc::new(MemoryCacheStore::new())
    } else if let Some(dir) = &cmd.cache_dir {
        Arc::new(FsCacheStore::new(dir.clone()))
    } else {
        Arc::new(FsCacheStore::with_default_path()?)
    };

    // Create execution engine
    let engine = PipelineEngine::new(provisioner, source_control, store);

    // Set up event handler for console output
    engine.add_event_handler(|event| {
        if let Some(line) = format_execution_event(&event) {
            println!("{}", line);
        }
    });

    // Ctrl-C aborts the current step and fails the run
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // Execute job
    println!();
    let report = engine.run_with_cancellation(&job, cancel).await;

    // Print final status
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else if report.succeeded() {
        println!(
            "\n{} {} {}",
            CHECK,
            style(&report.job_name).bold(),
            style("succeeded").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&report.job_name).bold(),
            style("failed").red()
        );
        if let Some(err) = &report.error {
            println!("  {}", style(err).red());
        }
    }

    let code = report.exit_code();
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn validate_job(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating job...", INFO);

    match JobConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Job configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Image: {}", style(&config.image).cyan());
            println!("  Steps: {}", style(config.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(2);
        }
    }
}
