//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// msgbench: benchmark run orchestrator for messaging systems
#[derive(Parser)]
#[command(name = "msgbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand)]
pub enum Commands {
    /// Execute a matrix of workloads x drivers
    ///
    /// Exits 0 if every run succeeded, 1 if any run failed or timed
    /// out; the matrix is fully executed either way.
    Run {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Workload ids to run, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        workloads: Vec<String>,

        /// Driver ids to run against, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        drivers: Vec<String>,

        /// Override every workload's duration, in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Cool-down between consecutive runs, in seconds
        #[arg(long)]
        cooldown: Option<u64>,
    },

    /// Print a cross-driver comparison for one workload
    ///
    /// Exits 2 when no results are recorded for the workload.
    Report {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Workload id to compare
        #[arg(long)]
        workload: String,
    },

    /// Load and validate a configuration file without running anything
    Validate {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse_comma_lists() {
        let cli = Cli::try_parse_from([
            "msgbench",
            "run",
            "--config",
            "bench.yaml",
            "--workloads",
            "w1,w2",
            "--drivers",
            "nats,pulsar,pravega",
            "--cooldown",
            "10",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                workloads,
                drivers,
                duration,
                cooldown,
                ..
            } => {
                assert_eq!(workloads, vec!["w1", "w2"]);
                assert_eq!(drivers, vec!["nats", "pulsar", "pravega"]);
                assert_eq!(duration, None);
                assert_eq!(cooldown, Some(10));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_requires_workloads_and_drivers() {
        let parsed = Cli::try_parse_from(["msgbench", "run", "--config", "bench.yaml"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_report_args() {
        let cli = Cli::try_parse_from([
            "msgbench",
            "report",
            "--config",
            "bench.yaml",
            "--workload",
            "loc-100k",
        ])
        .unwrap();

        match cli.command {
            Commands::Report { workload, .. } => assert_eq!(workload, "loc-100k"),
            _ => panic!("expected report command"),
        }
    }
}
