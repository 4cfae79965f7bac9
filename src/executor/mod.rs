//! Run executor: one request in, one classified result out
//!
//! The executor invokes the external benchmark framework as an isolated
//! out-of-process task. Its contract is "run once, report the outcome";
//! retry policy belongs to callers. The framework's own producer and
//! consumer concurrency is opaque here; a run is a single logical unit
//! of work with one start and one end time.

mod artifact;

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::process::Command;

use crate::catalog::{DriverTarget, ExecutorSettings};
use crate::run::{RunRequest, RunResult, RunStatus};

/// Executes a single run and classifies the outcome
///
/// The seam exists so the scheduler can be exercised without spawning
/// real benchmark processes.
#[async_trait]
pub trait RunExecutor: Send + Sync {
    /// Execute the request to completion, timeout or failure
    ///
    /// Never errors: inability to launch or finish the task is itself a
    /// classified outcome carried in the returned result.
    async fn execute(&self, request: &RunRequest) -> RunResult;
}

/// Executor that spawns the external benchmark framework as a subprocess
///
/// Per run it writes driver and workload descriptor files into a scratch
/// directory, substitutes their paths into the configured argument
/// template, and enforces a wall-clock budget of workload duration plus
/// a grace margin. A task that exceeds the budget is force-terminated
/// and classified `TimedOut`, never `Failed`.
pub struct ProcessExecutor {
    settings: ExecutorSettings,
}

enum LaunchFailure {
    Failed(String),
    TimedOut(Duration),
}

/// Driver descriptor handed to the framework, in its own naming scheme
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DriverDescriptor<'a> {
    name: &'a str,
    endpoint: &'a str,
    #[serde(flatten)]
    extra: &'a HashMap<String, serde_yaml::Value>,
}

/// Workload descriptor handed to the framework
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkloadDescriptor<'a> {
    name: &'a str,
    message_size: u32,
    producer_rate: u64,
    test_duration_seconds: u64,
    partitions_per_topic: u32,
}

impl ProcessExecutor {
    /// Create an executor from framework invocation settings
    pub fn new(settings: ExecutorSettings) -> Self {
        Self { settings }
    }

    async fn launch(&self, request: &RunRequest) -> Result<crate::run::RunMetrics, LaunchFailure> {
        let scratch = tempfile::tempdir()
            .map_err(|e| LaunchFailure::Failed(format!("cannot create scratch dir: {}", e)))?;
        let driver_file = scratch.path().join("driver.yaml");
        let workload_file = scratch.path().join("workload.yaml");
        let output_file = scratch.path().join("result.json");

        self.write_descriptors(request, &driver_file, &workload_file)?;

        let args: Vec<String> = self
            .settings
            .args
            .iter()
            .map(|arg| {
                arg.replace("{driver_file}", &driver_file.to_string_lossy())
                    .replace("{workload_file}", &workload_file.to_string_lossy())
                    .replace("{output_file}", &output_file.to_string_lossy())
            })
            .collect();

        let child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                LaunchFailure::Failed(format!("cannot spawn {}: {}", self.settings.program, e))
            })?;

        let budget = request.effective_duration() + self.settings.grace();

        // Dropping the wait future on timeout drops the child handle,
        // which kills the task via kill_on_drop.
        let output = match tokio::time::timeout(budget, child.wait_with_output()).await {
            Err(_) => return Err(LaunchFailure::TimedOut(budget)),
            Ok(Err(e)) => return Err(LaunchFailure::Failed(format!("task wait failed: {}", e))),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LaunchFailure::Failed(format!(
                "task exited with {}: {}",
                output.status,
                tail(&stderr)
            )));
        }

        let raw = std::fs::read_to_string(&output_file)
            .map_err(|_| LaunchFailure::Failed("result artifact missing".to_string()))?;
        artifact::parse_metrics(&raw)
            .map_err(|e| LaunchFailure::Failed(format!("unparseable result artifact: {}", e)))
    }

    fn write_descriptors(
        &self,
        request: &RunRequest,
        driver_file: &Path,
        workload_file: &Path,
    ) -> Result<(), LaunchFailure> {
        let driver = driver_descriptor(&request.target);
        let workload = WorkloadDescriptor {
            name: &request.workload.id,
            message_size: request.workload.message_size_bytes,
            producer_rate: request.workload.target_rate_per_sec,
            test_duration_seconds: request.effective_duration().as_secs(),
            partitions_per_topic: request.workload.partition_count,
        };

        for (path, rendered) in [
            (driver_file, serde_yaml::to_string(&driver)),
            (workload_file, serde_yaml::to_string(&workload)),
        ] {
            let rendered = rendered
                .map_err(|e| LaunchFailure::Failed(format!("cannot render descriptor: {}", e)))?;
            std::fs::write(path, rendered).map_err(|e| {
                LaunchFailure::Failed(format!("cannot write {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

fn driver_descriptor(target: &DriverTarget) -> DriverDescriptor<'_> {
    DriverDescriptor {
        name: &target.id,
        endpoint: &target.endpoint,
        extra: &target.extra,
    }
}

#[async_trait]
impl RunExecutor for ProcessExecutor {
    async fn execute(&self, request: &RunRequest) -> RunResult {
        let started_at = Utc::now();
        tracing::info!(
            workload = %request.workload.id,
            driver = %request.target.id,
            duration_secs = request.effective_duration().as_secs(),
            "launching benchmark task"
        );

        let outcome = self.launch(request).await;
        let finished_at = Utc::now();

        match outcome {
            Ok(metrics) => {
                tracing::info!(
                    workload = %request.workload.id,
                    driver = %request.target.id,
                    publish_rate = metrics.publish_rate,
                    "benchmark task succeeded"
                );
                RunResult::success(
                    &request.workload.id,
                    &request.target.id,
                    started_at,
                    finished_at,
                    metrics,
                )
            }
            Err(LaunchFailure::TimedOut(budget)) => {
                tracing::warn!(
                    workload = %request.workload.id,
                    driver = %request.target.id,
                    budget_secs = budget.as_secs(),
                    "benchmark task timed out"
                );
                RunResult::failure(
                    &request.workload.id,
                    &request.target.id,
                    started_at,
                    finished_at,
                    RunStatus::TimedOut,
                    format!("task exceeded {}s wall-clock budget", budget.as_secs()),
                )
            }
            Err(LaunchFailure::Failed(detail)) => {
                tracing::warn!(
                    workload = %request.workload.id,
                    driver = %request.target.id,
                    error = %detail,
                    "benchmark task failed"
                );
                RunResult::failure(
                    &request.workload.id,
                    &request.target.id,
                    started_at,
                    finished_at,
                    RunStatus::Failed,
                    detail,
                )
            }
        }
    }
}

impl std::fmt::Debug for ProcessExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessExecutor")
            .field("program", &self.settings.program)
            .field("grace_secs", &self.settings.grace_secs)
            .finish()
    }
}

/// Keep only the trailing portion of diagnostic output
fn tail(s: &str) -> &str {
    const MAX: usize = 500;
    let s = s.trim_end();
    let start = s.len().saturating_sub(MAX);
    let start = (start..=s.len())
        .find(|i| s.is_char_boundary(*i))
        .unwrap_or(0);
    &s[start..]
}
