//! Persisted per-project build numbers for auto-versioning.
//!
//! The counter is a durable integer keyed by project name and scoped to
//! one output directory. Storage is pluggable through [`CounterStore`];
//! the shipped [`FsCounterStore`] keeps the original one-text-file-per-
//! project layout (`<project>.build.number`) and guards each access with
//! an advisory file lock so concurrent builds sharing an output directory
//! do not tear the file. In-run once-per-project increment semantics live
//! a level up, in [`crate::version::VersionResolver`].

use crate::core::{BinderyError, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

/// Pluggable key-value store for build numbers.
///
/// Implementations must be safe for concurrent use; the resolver
/// serializes read-modify-write sequences per project name on top of this
/// interface.
pub trait CounterStore: Send + Sync {
    /// Loads the current counter for `project`, `None` when absent.
    fn load(&self, project: &str) -> Result<Option<u32>>;

    /// Persists a new counter value for `project`.
    fn store(&self, project: &str, value: u32) -> Result<()>;
}

/// Filesystem counter store rooted at an output directory.
pub struct FsCounterStore {
    output_dir: PathBuf,
}

impl FsCounterStore {
    /// Creates a store over `output_dir`; the directory is created on
    /// first write.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn counter_path(&self, project: &str) -> PathBuf {
        self.output_dir.join(format!("{project}.build.number"))
    }

    /// Acquires the advisory lock guarding this output directory's
    /// counters. Released when the returned handle drops.
    fn lock(&self, project: &str) -> Result<File> {
        let guard_path = self.output_dir.join(".build.counters.lock");
        let store_error = |reason: String| BinderyError::CounterStoreError {
            key: project.to_string(),
            reason,
        };
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| store_error(format!("creating output directory: {e}")))?;
        let guard = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&guard_path)
            .map_err(|e| store_error(format!("opening counter lock: {e}")))?;
        guard
            .lock_exclusive()
            .map_err(|e| store_error(format!("locking counter store: {e}")))?;
        Ok(guard)
    }
}

impl CounterStore for FsCounterStore {
    fn load(&self, project: &str) -> Result<Option<u32>> {
        let _guard = self.lock(project)?;
        let path = self.counter_path(project);
        match std::fs::read_to_string(&path) {
            Ok(contents) => match contents.trim().parse::<u32>() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    // Unreadable content counts as "never incremented", the
                    // same as the original text-file counter behaved.
                    tracing::warn!(
                        path = %path.display(),
                        "ignoring unparseable build counter"
                    );
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BinderyError::CounterStoreError {
                key: project.to_string(),
                reason: format!("reading {}: {e}", path.display()),
            }),
        }
    }

    fn store(&self, project: &str, value: u32) -> Result<()> {
        let _guard = self.lock(project)?;
        let path = self.counter_path(project);
        std::fs::write(&path, value.to_string()).map_err(|e| BinderyError::CounterStoreError {
            key: project.to_string(),
            reason: format!("writing {}: {e}", path.display()),
        })
    }
}
