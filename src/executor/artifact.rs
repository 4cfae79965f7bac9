//! Result artifact parsing
//!
//! The external framework writes a JSON document whose metric fields are
//! either scalars or arrays of interval samples; arrays are averaged.

use serde_json::Value;

use crate::run::RunMetrics;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ArtifactError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or non-numeric field: {0}")]
    Field(&'static str),
}

pub(crate) fn parse_metrics(raw: &str) -> Result<RunMetrics, ArtifactError> {
    let doc: Value = serde_json::from_str(raw)?;
    Ok(RunMetrics {
        publish_rate: mean_field(&doc, "publishRate")?,
        consume_rate: mean_field(&doc, "consumeRate")?,
        publish_latency_p50_ms: mean_field(&doc, "publishLatency50pct")?,
        publish_latency_p95_ms: mean_field(&doc, "publishLatency95pct")?,
        publish_latency_p99_ms: mean_field(&doc, "publishLatency99pct")?,
        e2e_latency_avg_ms: mean_field(&doc, "endToEndLatencyAvg")?,
        e2e_latency_p99_ms: mean_field(&doc, "endToEndLatency99pct")?,
    })
}

/// Extract a metric that may be a single number or an array of samples
fn mean_field(doc: &Value, key: &'static str) -> Result<f64, ArtifactError> {
    match doc.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or(ArtifactError::Field(key)),
        Some(Value::Array(samples)) if !samples.is_empty() => {
            let mut sum = 0.0;
            for sample in samples {
                sum += sample.as_f64().ok_or(ArtifactError::Field(key))?;
            }
            Ok(sum / samples.len() as f64)
        }
        _ => Err(ArtifactError::Field(key)),
    }
}
