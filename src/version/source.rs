//! Output-version resolution under the three version-source policies.
//!
//! A package's final version comes from exactly one of:
//!
//! - **Manual** - the spec manifest's version, verbatim.
//! - **Library** - the first referenced build artifact that carries a
//!   non-zero product version, falling back to the manifest version when
//!   none does.
//! - **Auto** - manifest major/minor with a generated build component: an
//!   externally supplied build number when one was given (CI systems), or
//!   a persisted per-project counter incremented once per run.
//!
//! The auto counter increment is the only durable side effect in the
//! engine. [`VersionResolver`] guarantees it happens at most once per run
//! per project name, no matter how many times `resolve` is invoked, and
//! serializes store access per project so concurrent resolutions of
//! same-named manifests cannot lose updates.

use crate::core::{BinderyError, Result};
use crate::metadata::MetadataCache;
use crate::version::{CounterStore, Version};
use dashmap::DashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the output version comes from; mutually exclusive policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// Use the spec manifest version as written.
    Manual,
    /// Derive from the first versioned referenced artifact.
    Library,
    /// Compose from manifest major/minor and a generated build number.
    Auto,
}

impl FromStr for VersionSource {
    type Err = BinderyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "library" => Ok(Self::Library),
            "auto" => Ok(Self::Auto),
            _ => Err(BinderyError::InvalidVersionSource {
                value: s.to_string(),
            }),
        }
    }
}

/// Inputs for one version resolution.
#[derive(Debug, Clone)]
pub struct VersionContext<'a> {
    /// The spec manifest's declared version (all-zero when the manifest
    /// used the `$version$` placeholder).
    pub spec_version: Version,
    /// Selected policy.
    pub source: VersionSource,
    /// Project name; keys the persisted build counter.
    pub project_name: &'a str,
    /// Externally supplied build number; `0` means "generate".
    pub explicit_build_number: u32,
    /// Candidate artifact paths for the library policy, in scan order:
    /// directly referenced artifacts first, then the manifest file list.
    pub artifact_paths: &'a [PathBuf],
}

/// Resolves output versions; holds the run-scoped auto-counter state.
pub struct VersionResolver {
    store: Arc<dyn CounterStore>,
    /// Build numbers already issued this run, keyed by project name.
    issued: DashMap<String, u32>,
    /// Per-project locks serializing store read-modify-write sequences.
    guards: DashMap<String, Arc<Mutex<()>>>,
}

impl VersionResolver {
    /// Creates a resolver over the given counter store.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            issued: DashMap::new(),
            guards: DashMap::new(),
        }
    }

    /// Resolves the output version for one package under `ctx.source`.
    pub async fn resolve(
        &self,
        metadata: &MetadataCache,
        ctx: VersionContext<'_>,
    ) -> Result<Version> {
        match ctx.source {
            VersionSource::Manual => Ok(ctx.spec_version),
            VersionSource::Library => Ok(self.library_version(metadata, &ctx).await),
            VersionSource::Auto => self.auto_version(&ctx).await,
        }
    }

    /// First non-zero artifact version in scan order, else the manifest
    /// version.
    async fn library_version(&self, metadata: &MetadataCache, ctx: &VersionContext<'_>) -> Version {
        for path in ctx.artifact_paths {
            if !path.exists() {
                continue;
            }
            match metadata.identity(path).await {
                // Identity versions are already zero-normalized.
                Ok(identity) => {
                    if let Some(version) = identity.version {
                        tracing::debug!(
                            artifact = %path.display(),
                            version = %version,
                            "library policy took artifact version"
                        );
                        return version;
                    }
                }
                // No identity available; keep scanning.
                Err(e) => {
                    tracing::debug!(
                        artifact = %path.display(),
                        error = %e,
                        "skipping artifact without readable identity"
                    );
                }
            }
        }
        ctx.spec_version
    }

    async fn auto_version(&self, ctx: &VersionContext<'_>) -> Result<Version> {
        let build = if ctx.explicit_build_number != 0 {
            u64::from(ctx.explicit_build_number)
        } else {
            u64::from(self.next_build_number(ctx.project_name).await?)
        };
        Ok(Version::new(
            ctx.spec_version.major(),
            ctx.spec_version.minor(),
            build,
            ctx.spec_version.revision(),
        ))
    }

    /// Increments and persists the project's counter, at most once per
    /// run; repeated calls return the already-issued number.
    async fn next_build_number(&self, project: &str) -> Result<u32> {
        if let Some(issued) = self.issued.get(project) {
            return Ok(*issued);
        }

        let guard = self
            .guards
            .entry(project.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _held = guard.lock().await;

        // A concurrent resolve for the same project may have issued the
        // number while we waited on the guard.
        if let Some(issued) = self.issued.get(project) {
            return Ok(*issued);
        }

        let store = self.store.clone();
        let key = project.to_string();
        let next = tokio::task::spawn_blocking(move || -> Result<u32> {
            let next = store.load(&key)?.unwrap_or(0) + 1;
            store.store(&key, next)?;
            Ok(next)
        })
        .await
        .map_err(|e| BinderyError::CounterStoreError {
            key: project.to_string(),
            reason: format!("counter task failed: {e}"),
        })??;

        tracing::debug!(project, build = next, "issued auto build number");
        self.issued.insert(project.to_string(), next);
        Ok(next)
    }
}
