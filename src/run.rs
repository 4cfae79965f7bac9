//! Run requests and run results
//!
//! A [`RunRequest`] pairs one workload with one driver target; it is
//! created by the scheduler and consumed exactly once by the executor.
//! A [`RunResult`] is the immutable outcome of that run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{DriverTarget, WorkloadSpec};

/// One (workload, driver) pairing plus optional overrides
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The workload scenario to run
    pub workload: WorkloadSpec,

    /// The driver target to run it against
    pub target: DriverTarget,

    /// Optional duration override replacing the workload's own duration
    pub duration_override: Option<Duration>,
}

impl RunRequest {
    /// The duration this run should execute for
    pub fn effective_duration(&self) -> Duration {
        self.duration_override.unwrap_or_else(|| self.workload.duration())
    }
}

/// Outcome classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Task exited cleanly and produced a parseable result artifact
    Success,
    /// Task exited with a non-zero status, or the artifact was missing/unparseable
    Failed,
    /// Task exceeded the wall-clock budget and was forcibly terminated
    TimedOut,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::Failed => f.write_str("failed"),
            RunStatus::TimedOut => f.write_str("timed_out"),
        }
    }
}

/// Metrics extracted from the framework's result artifact
///
/// Rates are messages per second, latencies are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Publish throughput
    pub publish_rate: f64,
    /// Consume throughput
    pub consume_rate: f64,
    /// Publish latency, 50th percentile
    pub publish_latency_p50_ms: f64,
    /// Publish latency, 95th percentile
    pub publish_latency_p95_ms: f64,
    /// Publish latency, 99th percentile
    pub publish_latency_p99_ms: f64,
    /// End-to-end latency, average
    pub e2e_latency_avg_ms: f64,
    /// End-to-end latency, 99th percentile
    pub e2e_latency_p99_ms: f64,
}

/// Identity of a stored result: (workload, driver, start timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    /// Workload id
    pub workload_id: String,
    /// Driver id
    pub driver_id: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
}

/// Outcome of one run; append-only once written to the store
///
/// Invariant: exactly one of `metrics` / `error_detail` is populated.
/// The constructors enforce it; the fields stay public for serde and
/// read access only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Workload id this run executed
    pub workload_id: String,

    /// Driver id this run executed against
    pub driver_id: String,

    /// When the run was dispatched
    pub started_at: DateTime<Utc>,

    /// When the run finished, timed out or was aborted
    pub finished_at: DateTime<Utc>,

    /// Outcome classification
    pub status: RunStatus,

    /// Extracted metrics; present iff `status == Success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,

    /// Diagnostic output; present iff `status != Success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl RunResult {
    /// Build a successful result
    pub fn success(
        workload_id: impl Into<String>,
        driver_id: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        metrics: RunMetrics,
    ) -> Self {
        Self {
            workload_id: workload_id.into(),
            driver_id: driver_id.into(),
            started_at,
            finished_at,
            status: RunStatus::Success,
            metrics: Some(metrics),
            error_detail: None,
        }
    }

    /// Build a failed or timed-out result
    ///
    /// `status` must not be `Success`.
    pub fn failure(
        workload_id: impl Into<String>,
        driver_id: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        status: RunStatus,
        error_detail: impl Into<String>,
    ) -> Self {
        assert!(
            status != RunStatus::Success,
            "failure result cannot carry Success status"
        );
        Self {
            workload_id: workload_id.into(),
            driver_id: driver_id.into(),
            started_at,
            finished_at,
            status,
            metrics: None,
            error_detail: Some(error_detail.into()),
        }
    }

    /// Whether this run succeeded
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Store identity of this result
    pub fn key(&self) -> RunKey {
        RunKey {
            workload_id: self.workload_id.clone(),
            driver_id: self.driver_id.clone(),
            started_at: self.started_at,
        }
    }

    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
pub(crate) fn test_metrics(publish_rate: f64, p99_ms: f64) -> RunMetrics {
    RunMetrics {
        publish_rate,
        consume_rate: publish_rate,
        publish_latency_p50_ms: p99_ms / 2.0,
        publish_latency_p95_ms: p99_ms * 0.9,
        publish_latency_p99_ms: p99_ms,
        e2e_latency_avg_ms: p99_ms,
        e2e_latency_p99_ms: p99_ms * 1.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_metrics_only() {
        let result = RunResult::success(
            "w1",
            "nats",
            Utc::now(),
            Utc::now(),
            test_metrics(10_000.0, 5.0),
        );
        assert!(result.is_success());
        assert!(result.metrics.is_some());
        assert!(result.error_detail.is_none());
    }

    #[test]
    fn test_failure_has_detail_only() {
        let result = RunResult::failure(
            "w1",
            "nats",
            Utc::now(),
            Utc::now(),
            RunStatus::TimedOut,
            "task exceeded budget",
        );
        assert!(!result.is_success());
        assert!(result.metrics.is_none());
        assert_eq!(result.error_detail.as_deref(), Some("task exceeded budget"));
    }

    #[test]
    #[should_panic(expected = "failure result cannot carry Success status")]
    fn test_failure_rejects_success_status() {
        let _ = RunResult::failure(
            "w1",
            "nats",
            Utc::now(),
            Utc::now(),
            RunStatus::Success,
            "not a real failure",
        );
    }

    #[test]
    fn test_effective_duration_override() {
        let request = RunRequest {
            workload: WorkloadSpec {
                id: "w1".into(),
                message_size_bytes: 200,
                target_rate_per_sec: 10_000,
                duration_secs: 900,
                partition_count: 16,
            },
            target: DriverTarget {
                id: "nats".into(),
                endpoint: "nats://localhost:4222".into(),
                extra: Default::default(),
            },
            duration_override: None,
        };
        assert_eq!(request.effective_duration(), Duration::from_secs(900));

        let request = RunRequest {
            duration_override: Some(Duration::from_secs(60)),
            ..request
        };
        assert_eq!(request.effective_duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_result_serialization_skips_absent_side() {
        let result = RunResult::failure(
            "w1",
            "nats",
            Utc::now(),
            Utc::now(),
            RunStatus::Failed,
            "boom",
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("metrics"));
        assert!(json.contains("\"status\":\"failed\""));

        let back: RunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, RunStatus::Failed);
        assert_eq!(back.key(), result.key());
    }
}
