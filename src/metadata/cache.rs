//! Per-run memoization of artifact identity reads, with request
//! coalescing.
//!
//! One resolution run may ask for the same artifact's identity from many
//! graph branches at once. The cache guarantees exactly one sandboxed load
//! per path: the first caller inserts a `Pending` entry and performs the
//! load on the blocking pool; concurrent callers for the same path await a
//! notification instead of triggering a second load, then re-read the
//! settled entry. Outcomes - including typed failures - are memoized for
//! the lifetime of the cache, which is one run; artifacts may change
//! between runs, so nothing is persisted.

use crate::core::Result;
use crate::metadata::probe::{IdentityProbe, ProbeFailure};
use crate::metadata::{ArtifactIdentity, EmbeddedIdentityProbe};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
enum EntryState {
    /// Another task is loading this path; wait on the notify handle.
    Pending(Arc<Notify>),
    /// The load settled; successes and failures are both memoized.
    Ready(std::result::Result<Arc<ArtifactIdentity>, ProbeFailure>),
}

/// Memoizing, coalescing front end over an [`IdentityProbe`].
pub struct MetadataCache {
    probe: Arc<dyn IdentityProbe>,
    entries: DashMap<PathBuf, EntryState>,
}

impl MetadataCache {
    /// Creates a cache over an arbitrary probe implementation.
    pub fn new(probe: Arc<dyn IdentityProbe>) -> Self {
        Self {
            probe,
            entries: DashMap::new(),
        }
    }

    /// Creates a cache over the shipped embedded-identity probe.
    pub fn with_embedded_probe() -> Self {
        Self::new(Arc::new(EmbeddedIdentityProbe))
    }

    /// Returns the identity of the artifact at `path`, loading it at most
    /// once per run.
    ///
    /// Errors are the memoized typed probe failures with the path
    /// attached; callers that treat "no identity" as recoverable match on
    /// [`crate::core::BinderyError::NotAnArtifact`] /
    /// [`crate::core::BinderyError::ArtifactUnreadable`] and fall through.
    pub async fn identity(&self, path: &Path) -> Result<Arc<ArtifactIdentity>> {
        let key = normalize(path);

        loop {
            let notify = Arc::new(Notify::new());
            match self.entries.entry(key.clone()) {
                dashmap::mapref::entry::Entry::Occupied(entry) => match entry.get().clone() {
                    EntryState::Ready(outcome) => {
                        drop(entry);
                        return outcome.map_err(|failure| failure.into_error(&key));
                    }
                    EntryState::Pending(existing) => {
                        // Register interest before releasing the entry so a
                        // notify_waiters() between the release and the await
                        // cannot be missed.
                        let notified = existing.notified();
                        tokio::pin!(notified);
                        notified.as_mut().enable();
                        drop(entry);
                        notified.await;
                        continue;
                    }
                },
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    entry.insert(EntryState::Pending(notify.clone()));
                }
            }

            // This task owns the load for `key`.
            let probe = self.probe.clone();
            let load_path = key.clone();
            let outcome = match tokio::task::spawn_blocking(move || probe.read_identity(&load_path))
                .await
            {
                Ok(result) => result.map(Arc::new),
                Err(join_error) => Err(ProbeFailure::ReadFailure(format!(
                    "identity load task failed: {join_error}"
                ))),
            };

            tracing::debug!(
                path = %key.display(),
                ok = outcome.is_ok(),
                "artifact identity settled"
            );
            self.entries.insert(key.clone(), EntryState::Ready(outcome.clone()));
            notify.notify_waiters();
            return outcome.map_err(|failure| failure.into_error(&key));
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    // Absolute paths are the cache identity; relative inputs are anchored
    // to the current directory so aliases collapse to one entry.
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    }
}
