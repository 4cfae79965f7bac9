//! Driver registry and workload catalog
//!
//! Both catalogs are loaded once from a YAML configuration file and are
//! immutable afterwards. The schema is strict: unknown keys fail the
//! load with a named error instead of being silently ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// One messaging system under test
///
/// `extra` is an opaque key-value mapping passed through verbatim to the
/// external benchmark framework's driver descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverTarget {
    /// Unique driver identifier (e.g. "nats", "pulsar", "pravega")
    pub id: String,

    /// Connection string for the messaging system
    pub endpoint: String,

    /// Framework-specific configuration, passed through untouched
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// One parameterized test scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadSpec {
    /// Unique workload identifier (e.g. "loc-100k")
    pub id: String,

    /// Message payload size in bytes; must be positive
    pub message_size_bytes: u32,

    /// Target publish rate in messages per second; 0 means "maximum sustainable"
    pub target_rate_per_sec: u64,

    /// Run duration in seconds; must be positive
    pub duration_secs: u64,

    /// Number of partitions for the test topic/stream; must be at least 1
    pub partition_count: u32,
}

impl WorkloadSpec {
    /// Run duration as a [`Duration`]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Settings for invoking the external benchmark framework
///
/// `args` is an argument template; the placeholders `{driver_file}`,
/// `{workload_file}` and `{output_file}` are substituted with the paths
/// of the per-run descriptor files before the task is spawned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSettings {
    /// Benchmark framework executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Argument template, see the struct docs for placeholders
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Grace margin added to the workload duration for the wall-clock timeout
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl ExecutorSettings {
    /// Grace margin as a [`Duration`]
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            grace_secs: default_grace_secs(),
        }
    }
}

fn default_program() -> String {
    "benchmark".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "--drivers".to_string(),
        "{driver_file}".to_string(),
        "--output".to_string(),
        "{output_file}".to_string(),
        "{workload_file}".to_string(),
    ]
}

fn default_grace_secs() -> u64 {
    60
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results.jsonl")
}

/// Static orchestrator configuration: driver registry, workload catalog,
/// executor settings and the result store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// Driver targets, keyed by their `id`
    pub drivers: Vec<DriverTarget>,

    /// Workload scenarios, keyed by their `id`
    pub workloads: Vec<WorkloadSpec>,

    /// External framework invocation settings
    #[serde(default)]
    pub executor: ExecutorSettings,

    /// Result store file; relative paths resolve against the config file
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
}

impl BenchConfig {
    /// Load and validate a configuration file
    ///
    /// Relative `results_path` values are resolved against the directory
    /// containing the config file, so behavior does not depend on the
    /// process working directory.
    pub fn load(path: &Path) -> BenchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: BenchConfig = serde_yaml::from_str(&raw)
            .map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))?;

        if config.results_path.is_relative() {
            if let Some(parent) = path.parent() {
                config.results_path = parent.join(&config.results_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate catalog invariants
    pub fn validate(&self) -> BenchResult<()> {
        if self.drivers.is_empty() {
            return Err(BenchError::Config("at least one driver is required".into()));
        }
        if self.workloads.is_empty() {
            return Err(BenchError::Config(
                "at least one workload is required".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for driver in &self.drivers {
            if driver.id.is_empty() {
                return Err(BenchError::Config("driver id must not be empty".into()));
            }
            if !seen.insert(&driver.id) {
                return Err(BenchError::Config(format!(
                    "duplicate driver id: {}",
                    driver.id
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for workload in &self.workloads {
            if workload.id.is_empty() {
                return Err(BenchError::Config("workload id must not be empty".into()));
            }
            if !seen.insert(&workload.id) {
                return Err(BenchError::Config(format!(
                    "duplicate workload id: {}",
                    workload.id
                )));
            }
            if workload.message_size_bytes == 0 {
                return Err(BenchError::Config(format!(
                    "workload {}: message_size_bytes must be positive",
                    workload.id
                )));
            }
            if workload.duration_secs == 0 {
                return Err(BenchError::Config(format!(
                    "workload {}: duration_secs must be positive",
                    workload.id
                )));
            }
            if workload.partition_count == 0 {
                return Err(BenchError::Config(format!(
                    "workload {}: partition_count must be at least 1",
                    workload.id
                )));
            }
        }

        Ok(())
    }

    /// Look up a driver target by id
    pub fn driver(&self, id: &str) -> BenchResult<&DriverTarget> {
        self.drivers
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| BenchError::UnknownDriver(id.to_string()))
    }

    /// Look up a workload spec by id
    pub fn workload(&self, id: &str) -> BenchResult<&WorkloadSpec> {
        self.workloads
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| BenchError::UnknownWorkload(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> BenchConfig {
        BenchConfig {
            drivers: vec![
                DriverTarget {
                    id: "nats".into(),
                    endpoint: "nats://localhost:4222".into(),
                    extra: HashMap::new(),
                },
                DriverTarget {
                    id: "pulsar".into(),
                    endpoint: "pulsar://localhost:6650".into(),
                    extra: HashMap::new(),
                },
            ],
            workloads: vec![WorkloadSpec {
                id: "loc-100k".into(),
                message_size_bytes: 200,
                target_rate_per_sec: 10_000,
                duration_secs: 900,
                partition_count: 16,
            }],
            executor: ExecutorSettings::default(),
            results_path: default_results_path(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_zero_message_size_rejected() {
        let mut config = sample_config();
        config.workloads[0].message_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut config = sample_config();
        config.workloads[0].duration_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let mut config = sample_config();
        config.workloads[0].partition_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_driver_id_rejected() {
        let mut config = sample_config();
        config.drivers.push(config.drivers[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_catalogs_rejected() {
        let mut config = sample_config();
        config.drivers.clear();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.workloads.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lookup() {
        let config = sample_config();
        assert_eq!(config.driver("nats").unwrap().id, "nats");
        assert!(matches!(
            config.driver("kafka"),
            Err(BenchError::UnknownDriver(id)) if id == "kafka"
        ));
        assert!(matches!(
            config.workload("missing"),
            Err(BenchError::UnknownWorkload(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_unknown_yaml_key_rejected() {
        // Unknown properties must fail the load, not be silently ignored
        let yaml = r#"
drivers:
  - id: nats
    endpoint: nats://localhost:4222
    endpoiint: typo
workloads:
  - id: w1
    message_size_bytes: 100
    target_rate_per_sec: 0
    duration_secs: 60
    partition_count: 1
"#;
        let parsed: Result<BenchConfig, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_yaml_roundtrip_with_extra() {
        let yaml = r#"
drivers:
  - id: pulsar
    endpoint: pulsar://localhost:6650
    extra:
      ioThreads: 8
      batchingEnabled: true
workloads:
  - id: w1
    message_size_bytes: 100
    target_rate_per_sec: 0
    duration_secs: 60
    partition_count: 4
executor:
  program: bin/benchmark
  grace_secs: 30
"#;
        let config: BenchConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.executor.program, "bin/benchmark");
        assert_eq!(config.executor.grace(), Duration::from_secs(30));
        assert_eq!(config.drivers[0].extra.len(), 2);
        // 0 rate means "maximum sustainable"
        assert_eq!(config.workloads[0].target_rate_per_sec, 0);
    }
}
