//! Append-only persistence of finished executions.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

use super::types::Execution;

#[derive(Debug, Error)]
pub enum HistoryStoreError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable log of finished executions.
pub trait HistoryStore: Send + Sync {
    /// All stored executions, oldest first, one record per id.
    fn load(&self) -> Result<Vec<Execution>, HistoryStoreError>;

    fn append(&self, execution: &Execution) -> Result<(), HistoryStoreError>;
}

/// JSON-lines file, one execution per line.
///
/// Duplicate ids keep their first occurrence; unparsable lines are skipped.
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn load(&self) -> Result<Vec<Execution>, HistoryStoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut seen = HashSet::new();
        let mut executions = Vec::new();

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Execution>(&line) {
                Ok(execution) if execution.is_running() => {
                    warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        "Skipping history record that never finished"
                    );
                }
                Ok(execution) => {
                    if seen.insert(execution.id) {
                        executions.push(execution);
                    }
                }
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping unparsable history line"
                    );
                }
            }
        }

        Ok(executions)
    }

    fn append(&self, execution: &Execution) -> Result<(), HistoryStoreError> {
        let mut line = serde_json::to_string(execution)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
