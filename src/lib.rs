//! msgbench: benchmark run orchestrator for messaging systems
//!
//! This crate sequences (workload, driver) benchmark runs against an
//! external benchmark framework and produces comparable reports:
//!
//! - Catalogs of driver targets and workload scenarios, validated at load
//! - A run executor that invokes the framework out of process with a
//!   hard wall-clock timeout
//! - A matrix scheduler that expands workloads x drivers, paces runs
//!   with a cool-down, and tolerates per-run failures
//! - An append-only result store and a cross-driver comparison report

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod cli;
pub mod error;
pub mod executor;
pub mod report;
pub mod run;
pub mod scheduler;
pub mod store;

pub use catalog::{BenchConfig, DriverTarget, ExecutorSettings, WorkloadSpec};
pub use error::{BenchError, BenchResult};
pub use executor::{ProcessExecutor, RunExecutor};
pub use report::{compare, ComparisonTable, DriverComparison, MetricColumn};
pub use run::{RunKey, RunMetrics, RunRequest, RunResult, RunStatus};
pub use scheduler::{CancelHandle, MatrixScheduler, MatrixSummary};
pub use store::{ResultSink, ResultStore};
