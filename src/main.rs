//! msgbench - benchmark run orchestrator for messaging systems

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use msgbench::cli::{Cli, Commands};
use msgbench::{
    compare, BenchConfig, BenchError, MatrixScheduler, ProcessExecutor, ResultStore,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            workloads,
            drivers,
            duration,
            cooldown,
        } => cmd_run(&config, &workloads, &drivers, duration, cooldown).await,
        Commands::Report { config, workload } => cmd_report(&config, &workload),
        Commands::Validate { config } => cmd_validate(&config),
    }
}

async fn cmd_run(
    config_path: &Path,
    workloads: &[String],
    drivers: &[String],
    duration: Option<u64>,
    cooldown: Option<u64>,
) -> Result<ExitCode> {
    let config = BenchConfig::load(config_path)?;
    let store = ResultStore::open(&config.results_path)?;
    let executor = Arc::new(ProcessExecutor::new(config.executor.clone()));

    let (mut scheduler, cancel) = MatrixScheduler::new(config, executor, store);
    if let Some(secs) = cooldown {
        scheduler = scheduler.with_cooldown(Duration::from_secs(secs));
    }

    // First Ctrl+C stops at the next run boundary, a second one
    // force-terminates the in-flight run
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl+C, stopping after the in-flight run");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("second Ctrl+C, aborting the in-flight run");
            cancel.abort();
        }
    });

    let summary = scheduler
        .run_matrix(workloads, drivers, duration.map(Duration::from_secs))
        .await?;
    signal_task.abort();

    println!("{}", summary);

    Ok(if summary.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn cmd_report(config_path: &Path, workload: &str) -> Result<ExitCode> {
    let config = BenchConfig::load(config_path)?;
    let store = ResultStore::open(&config.results_path)?;

    match compare(&store, workload) {
        Ok(table) => {
            println!("{}", table);
            Ok(ExitCode::SUCCESS)
        }
        Err(BenchError::NoDataForWorkload(id)) => {
            eprintln!("no results recorded for workload: {}", id);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_validate(config_path: &Path) -> Result<ExitCode> {
    let config = BenchConfig::load(config_path)?;
    println!(
        "{}: OK ({} drivers, {} workloads)",
        config_path.display(),
        config.drivers.len(),
        config.workloads.len()
    );
    Ok(ExitCode::SUCCESS)
}
