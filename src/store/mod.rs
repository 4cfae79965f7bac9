//! Append-only result store
//!
//! One structured record per completed run, keyed by
//! (workload, driver, started_at). Physically a JSON Lines flat file:
//! existing records are loaded at open, appends write one line and sync
//! it, and nothing is ever updated in place. Access is single-writer by
//! construction (runs are strictly sequential), so no locking is needed
//! beyond atomic line appends.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{BenchError, BenchResult};
use crate::run::{RunKey, RunResult};

/// Persistence seam for recording run results
///
/// The matrix scheduler records outcomes through this trait, so append
/// failures can be injected when exercising the scheduler.
/// [`ResultStore`] is the durable implementation.
pub trait ResultSink: Send {
    /// Append one result; duplicate keys are rejected, never overwritten
    fn append(&mut self, result: &RunResult) -> BenchResult<()>;
}

/// Durable, append-only store of run results
pub struct ResultStore {
    path: PathBuf,
    file: File,
    records: Vec<RunResult>,
    keys: HashSet<RunKey>,
}

impl ResultStore {
    /// Open a store file, creating it if absent, and load existing records
    pub fn open(path: impl Into<PathBuf>) -> BenchResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BenchError::StoreUnavailable(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let (records, keys) = if path.exists() {
            Self::load(&path)?
        } else {
            (Vec::new(), HashSet::new())
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                BenchError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
            })?;

        Ok(Self {
            path,
            file,
            records,
            keys,
        })
    }

    fn load(path: &Path) -> BenchResult<(Vec<RunResult>, HashSet<RunKey>)> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BenchError::StoreUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut records = Vec::new();
        let mut keys = HashSet::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: RunResult = serde_json::from_str(line).map_err(|e| {
                BenchError::StoreUnavailable(format!(
                    "corrupt record at {}:{}: {}",
                    path.display(),
                    lineno + 1,
                    e
                ))
            })?;
            keys.insert(record.key());
            records.push(record);
        }
        Ok((records, keys))
    }

    /// Append one result
    ///
    /// Rejects a duplicate (workload, driver, started_at) key with
    /// [`BenchError::DuplicateResult`]; existing records are never
    /// overwritten.
    pub fn append(&mut self, result: &RunResult) -> BenchResult<()> {
        let key = result.key();
        if self.keys.contains(&key) {
            return Err(BenchError::DuplicateResult {
                workload: key.workload_id,
                driver: key.driver_id,
                started_at: key.started_at,
            });
        }

        let line = serde_json::to_string(result)
            .map_err(|e| BenchError::StoreUnavailable(format!("cannot encode record: {}", e)))?;
        writeln!(self.file, "{}", line).map_err(|e| {
            BenchError::StoreUnavailable(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        self.file.sync_data().map_err(|e| {
            BenchError::StoreUnavailable(format!("cannot sync {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(
            workload = %result.workload_id,
            driver = %result.driver_id,
            status = %result.status,
            "result recorded"
        );
        self.keys.insert(key);
        self.records.push(result.clone());
        Ok(())
    }

    /// All results for a workload across drivers, in insertion order
    ///
    /// An unknown or unrecorded workload yields an empty vec, not an error.
    pub fn query(&self, workload_id: &str) -> Vec<RunResult> {
        self.records
            .iter()
            .filter(|r| r.workload_id == workload_id)
            .cloned()
            .collect()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for ResultStore {
    fn append(&mut self, result: &RunResult) -> BenchResult<()> {
        ResultStore::append(self, result)
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("path", &self.path)
            .field("records", &self.records.len())
            .finish()
    }
}
