//! Run matrix scheduler
//!
//! Expands a requested set of workloads x drivers into an ordered,
//! strictly sequential run sequence. Sequential execution is deliberate:
//! concurrent runs against shared infrastructure would contaminate each
//! other's throughput and latency measurements. A configurable cool-down
//! pause between runs lets the target system's resource usage settle
//! before the next run starts.
//!
//! Failed runs are recorded and the matrix continues; one driver's
//! failure must not abort the rest of the matrix. Store failures do
//! abort it, since results cannot be trusted without durable capture.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

use crate::catalog::BenchConfig;
use crate::error::BenchResult;
use crate::executor::RunExecutor;
use crate::run::{RunRequest, RunResult, RunStatus};
use crate::store::{ResultSink, ResultStore};


/// Default pause between consecutive runs
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Cancellation level, escalating and never downgraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CancelState {
    /// No cancellation requested
    Running,
    /// Stop at the next run boundary; the in-flight run finishes
    Cancel,
    /// Force-terminate the in-flight run and stop immediately
    Abort,
}

/// Handle for cancelling an in-flight matrix
///
/// Soft cancel takes effect at the next run boundary: the currently
/// executing run is allowed to finish or time out, so the external
/// task is not left in an inconsistent state. Hard abort terminates
/// the in-flight run, which is recorded as `Failed` with
/// `error_detail = "cancelled"`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<CancelState>,
}

impl CancelHandle {
    /// Request a stop at the next run boundary
    pub fn cancel(&self) {
        self.escalate(CancelState::Cancel);
    }

    /// Force-terminate the in-flight run and stop
    pub fn abort(&self) {
        self.escalate(CancelState::Abort);
    }

    fn escalate(&self, to: CancelState) {
        self.tx.send_if_modified(|state| {
            if *state < to {
                *state = to;
                true
            } else {
                false
            }
        });
    }
}

/// Wait until the cancellation level reaches `level`
async fn cancelled(rx: &mut watch::Receiver<CancelState>, level: CancelState) {
    loop {
        if *rx.borrow() >= level {
            return;
        }
        if rx.changed().await.is_err() {
            // All handles dropped; no cancellation can arrive anymore
            std::future::pending::<()>().await;
        }
    }
}

/// Running totals and per-run outcomes of one matrix execution
#[derive(Debug)]
pub struct MatrixSummary {
    /// Number of runs the matrix expanded to
    pub requested: usize,

    /// Runs that finished with `Success`
    pub completed: usize,

    /// Runs that finished `Failed` or `TimedOut`
    pub failed: usize,

    /// Whether the matrix stopped early due to cancellation
    pub cancelled: bool,

    /// Outcome of every executed run, in dispatch order
    pub results: Vec<RunResult>,
}

impl MatrixSummary {
    /// Whether every requested run executed and succeeded
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.completed == self.requested
    }
}

impl std::fmt::Display for MatrixSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<16}{:<14}{:<11}{:>10}  {}",
            "Workload", "Driver", "Status", "Elapsed", "Detail"
        )?;
        for result in &self.results {
            let detail = result.error_detail.as_deref().unwrap_or("");
            let detail: String = detail.chars().take(60).collect();
            writeln!(
                f,
                "{:<16}{:<14}{:<11}{:>9.1}s  {}",
                result.workload_id,
                result.driver_id,
                result.status.to_string(),
                result.elapsed().num_milliseconds() as f64 / 1000.0,
                detail
            )?;
        }
        writeln!(f)?;
        write!(
            f,
            "{} requested, {} succeeded, {} failed{}",
            self.requested,
            self.completed,
            self.failed,
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}

/// Sequences (workload, driver) runs, records results, tracks totals
///
/// Generic over the result sink so store failures can be injected in
/// tests; production callers use the default [`ResultStore`].
pub struct MatrixScheduler<S: ResultSink = ResultStore> {
    config: BenchConfig,
    executor: Arc<dyn RunExecutor>,
    store: S,
    cooldown: Duration,
    cancel_rx: watch::Receiver<CancelState>,
}

impl<S: ResultSink> MatrixScheduler<S> {
    /// Create a scheduler and the cancel handle paired with it
    pub fn new(
        config: BenchConfig,
        executor: Arc<dyn RunExecutor>,
        store: S,
    ) -> (Self, CancelHandle) {
        let (tx, cancel_rx) = watch::channel(CancelState::Running);
        let scheduler = Self {
            config,
            executor,
            store,
            cooldown: DEFAULT_COOLDOWN,
            cancel_rx,
        };
        (scheduler, CancelHandle { tx })
    }

    /// Set the cool-down pause between consecutive runs
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// The result sink backing this scheduler
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Expand and validate a matrix into an ordered run sequence
    ///
    /// Every id is checked against the catalogs before any run starts;
    /// an unknown id aborts the whole request. Order is deterministic:
    /// outer loop over workloads, inner loop over drivers, both in
    /// input order.
    pub fn expand(
        &self,
        workloads: &[String],
        drivers: &[String],
        duration_override: Option<Duration>,
    ) -> BenchResult<Vec<RunRequest>> {
        if workloads.is_empty() {
            return Err(crate::error::BenchError::Config(
                "at least one workload id is required".into(),
            ));
        }
        if drivers.is_empty() {
            return Err(crate::error::BenchError::Config(
                "at least one driver id is required".into(),
            ));
        }

        // Validate everything up front so nothing runs on a bad request
        let workloads = workloads
            .iter()
            .map(|id| self.config.workload(id))
            .collect::<BenchResult<Vec<_>>>()?;
        let drivers = drivers
            .iter()
            .map(|id| self.config.driver(id))
            .collect::<BenchResult<Vec<_>>>()?;

        let mut requests = Vec::with_capacity(workloads.len() * drivers.len());
        for workload in &workloads {
            for driver in &drivers {
                requests.push(RunRequest {
                    workload: (*workload).clone(),
                    target: (*driver).clone(),
                    duration_override,
                });
            }
        }
        Ok(requests)
    }

    /// Execute the matrix sequentially and record every outcome
    ///
    /// Returns an error only for request validation failures and store
    /// failures; per-run failures are captured in the summary.
    pub async fn run_matrix(
        &mut self,
        workloads: &[String],
        drivers: &[String],
        duration_override: Option<Duration>,
    ) -> BenchResult<MatrixSummary> {
        let requests = self.expand(workloads, drivers, duration_override)?;
        let start = Instant::now();

        tracing::info!(
            workloads = workloads.len(),
            drivers = drivers.len(),
            runs = requests.len(),
            cooldown_secs = self.cooldown.as_secs(),
            "starting benchmark matrix"
        );

        let pb = ProgressBar::new(requests.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .expect("static progress template")
                .progress_chars("#>-"),
        );

        let mut summary = MatrixSummary {
            requested: requests.len(),
            completed: 0,
            failed: 0,
            cancelled: false,
            results: Vec::with_capacity(requests.len()),
        };

        for (index, request) in requests.iter().enumerate() {
            if *self.cancel_rx.borrow() >= CancelState::Cancel {
                tracing::info!(
                    executed = summary.results.len(),
                    remaining = requests.len() - index,
                    "matrix cancelled at run boundary"
                );
                summary.cancelled = true;
                break;
            }

            pb.set_message(format!("{}/{}", request.workload.id, request.target.id));

            let dispatched_at = Utc::now();
            let mut abort_rx = self.cancel_rx.clone();
            let (result, aborted) = tokio::select! {
                biased;

                _ = cancelled(&mut abort_rx, CancelState::Abort) => {
                    tracing::warn!(
                        workload = %request.workload.id,
                        driver = %request.target.id,
                        "hard abort, terminating in-flight run"
                    );
                    let result = RunResult::failure(
                        &request.workload.id,
                        &request.target.id,
                        dispatched_at,
                        Utc::now(),
                        RunStatus::Failed,
                        "cancelled",
                    );
                    (result, true)
                }

                result = self.executor.execute(request) => (result, false),
            };

            match result.status {
                RunStatus::Success => summary.completed += 1,
                RunStatus::Failed | RunStatus::TimedOut => {
                    summary.failed += 1;
                    tracing::warn!(
                        workload = %result.workload_id,
                        driver = %result.driver_id,
                        status = %result.status,
                        "run did not succeed, matrix continues"
                    );
                }
            }

            // Store failures abort the matrix; unrecorded results are
            // worse than an incomplete matrix
            self.store.append(&result)?;
            summary.results.push(result);
            pb.inc(1);

            if aborted {
                summary.cancelled = true;
                break;
            }

            let last = index + 1 == requests.len();
            if !last && !self.cooldown.is_zero() {
                pb.set_message("cool-down");
                let mut cancel_rx = self.cancel_rx.clone();
                tokio::select! {
                    _ = tokio::time::sleep(self.cooldown) => {}
                    _ = cancelled(&mut cancel_rx, CancelState::Cancel) => {}
                }
            }
        }

        pb.finish_and_clear();
        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            requested = summary.requested,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "benchmark matrix finished"
        );

        Ok(summary)
    }
}

impl<S: ResultSink + std::fmt::Debug> std::fmt::Debug for MatrixScheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixScheduler")
            .field("cooldown", &self.cooldown)
            .field("store", &self.store)
            .finish()
    }
}
