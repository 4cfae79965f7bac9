//! Cross-driver comparison reports
//!
//! Reads every stored result for a workload, keeps the most recent
//! successful run per driver, and marks the best driver per metric
//! column. Drivers whose runs all failed stay visible in the table with
//! a "no successful run" marker; failure visibility is part of the
//! report contract.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{BenchError, BenchResult};
use crate::run::RunMetrics;
use crate::store::ResultStore;

/// One metric column of the comparison table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricColumn {
    /// Publish throughput, msg/s
    PublishRate,
    /// Consume throughput, msg/s
    ConsumeRate,
    /// Publish latency p50, ms
    PublishP50,
    /// Publish latency p95, ms
    PublishP95,
    /// Publish latency p99, ms
    PublishP99,
    /// End-to-end latency average, ms
    EndToEndAvg,
    /// End-to-end latency p99, ms
    EndToEndP99,
}

impl MetricColumn {
    /// All columns in rendering order
    pub const ALL: [MetricColumn; 7] = [
        MetricColumn::PublishRate,
        MetricColumn::ConsumeRate,
        MetricColumn::PublishP50,
        MetricColumn::PublishP95,
        MetricColumn::PublishP99,
        MetricColumn::EndToEndAvg,
        MetricColumn::EndToEndP99,
    ];

    /// Column header label
    pub fn label(self) -> &'static str {
        match self {
            MetricColumn::PublishRate => "Pub msg/s",
            MetricColumn::ConsumeRate => "Con msg/s",
            MetricColumn::PublishP50 => "Pub p50 ms",
            MetricColumn::PublishP95 => "Pub p95 ms",
            MetricColumn::PublishP99 => "Pub p99 ms",
            MetricColumn::EndToEndAvg => "E2E avg ms",
            MetricColumn::EndToEndP99 => "E2E p99 ms",
        }
    }

    /// Whether a larger value wins this column
    pub fn higher_is_better(self) -> bool {
        matches!(self, MetricColumn::PublishRate | MetricColumn::ConsumeRate)
    }

    /// Extract this column's value from a metrics record
    pub fn value(self, metrics: &RunMetrics) -> f64 {
        match self {
            MetricColumn::PublishRate => metrics.publish_rate,
            MetricColumn::ConsumeRate => metrics.consume_rate,
            MetricColumn::PublishP50 => metrics.publish_latency_p50_ms,
            MetricColumn::PublishP95 => metrics.publish_latency_p95_ms,
            MetricColumn::PublishP99 => metrics.publish_latency_p99_ms,
            MetricColumn::EndToEndAvg => metrics.e2e_latency_avg_ms,
            MetricColumn::EndToEndP99 => metrics.e2e_latency_p99_ms,
        }
    }
}

/// One driver's row in the comparison
#[derive(Debug, Clone, Serialize)]
pub struct DriverComparison {
    /// Driver id
    pub driver_id: String,

    /// Total runs recorded for this (workload, driver)
    pub attempts: usize,

    /// Start time of the selected run, if any succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Metrics of the most recent successful run; None if all runs failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,
}

/// Comparison of all drivers that ran a given workload
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTable {
    /// Workload id this table compares
    pub workload_id: String,

    /// One row per driver, in first-seen order
    pub rows: Vec<DriverComparison>,
}

impl ComparisonTable {
    /// The driver with the best value in a column, among successful rows
    ///
    /// Ties go to the first driver in row order.
    pub fn best_driver(&self, column: MetricColumn) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for row in &self.rows {
            let Some(metrics) = &row.metrics else { continue };
            let value = column.value(metrics);
            let wins = match best {
                None => true,
                Some((_, current)) => {
                    if column.higher_is_better() {
                        value > current
                    } else {
                        value < current
                    }
                }
            };
            if wins {
                best = Some((&row.driver_id, value));
            }
        }
        best.map(|(driver, _)| driver)
    }
}

/// Build a comparison table for one workload from the store
///
/// Groups results by driver; per driver the most recent `Success` wins
/// (latest `started_at` breaks ties). Fails with
/// [`BenchError::NoDataForWorkload`] when nothing is recorded.
pub fn compare(store: &ResultStore, workload_id: &str) -> BenchResult<ComparisonTable> {
    let results = store.query(workload_id);
    if results.is_empty() {
        return Err(BenchError::NoDataForWorkload(workload_id.to_string()));
    }

    let mut rows: Vec<DriverComparison> = Vec::new();
    for result in &results {
        let row = match rows.iter_mut().find(|r| r.driver_id == result.driver_id) {
            Some(row) => row,
            None => {
                rows.push(DriverComparison {
                    driver_id: result.driver_id.clone(),
                    attempts: 0,
                    started_at: None,
                    metrics: None,
                });
                rows.last_mut().expect("row just pushed")
            }
        };

        row.attempts += 1;
        if let Some(metrics) = &result.metrics {
            let newer = match row.started_at {
                Some(at) => result.started_at >= at,
                None => true,
            };
            if newer {
                row.started_at = Some(result.started_at);
                row.metrics = Some(metrics.clone());
            }
        }
    }

    Ok(ComparisonTable {
        workload_id: workload_id.to_string(),
        rows,
    })
}

impl std::fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Workload: {}", self.workload_id)?;
        writeln!(f)?;

        write!(f, "{:<14}", "Driver")?;
        for column in MetricColumn::ALL {
            write!(f, "{:>13}", column.label())?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(f, "{:<14}", row.driver_id)?;
            match &row.metrics {
                Some(metrics) => {
                    for column in MetricColumn::ALL {
                        let marker = if self.best_driver(column) == Some(row.driver_id.as_str()) {
                            "*"
                        } else {
                            ""
                        };
                        write!(f, "{:>13}", format!("{}{:.2}", marker, column.value(metrics)))?;
                    }
                    writeln!(f)?;
                }
                None => {
                    writeln!(f, "  no successful run ({} attempts)", row.attempts)?;
                }
            }
        }

        writeln!(f)?;
        if let Some(driver) = self.best_driver(MetricColumn::PublishRate) {
            writeln!(f, "Best throughput:  {}", driver)?;
        }
        if let Some(driver) = self.best_driver(MetricColumn::PublishP99) {
            writeln!(f, "Lowest pub p99:   {}", driver)?;
        }
        Ok(())
    }
}
