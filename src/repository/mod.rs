//! Package repository collaborator - resolves package ids to their own
//! dependency metadata.
//!
//! Minimal-set reduction needs to know what each candidate package itself
//! depends on. That knowledge lives behind [`PackageRepository`]: the
//! engine asks, the repository answers from whatever store it fronts.
//! Resolution is *optional* everywhere - a run without a repository keeps
//! every candidate explicit rather than failing, and an id the repository
//! does not know is simply a dead end.
//!
//! Shipped implementations:
//! - [`MemoryPackageRepository`] - an in-memory index, also the building
//!   block for tests;
//! - [`LocalPackageRepository`] - a scan of a workspace's local packages
//!   directory (`*.bpkg.toml` metadata documents).
//!
//! [`locate_repository`] finds the conventional local store for a project:
//! the workspace config's `repository` key when present, else the
//! `packages/` folder under the workspace root.

use crate::core::{BinderyError, Result};
use crate::project::{workspace_root, TargetFramework, WORKSPACE_FILE_NAME};
use crate::version::{Version, VersionConstraint};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Extension of package metadata documents in a local repository.
pub const PACKAGE_METADATA_EXTENSION: &str = ".bpkg.toml";

/// A dependency declared by a package, optionally scoped to a framework.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PackageDependency {
    /// Target package id; compared case-insensitively.
    pub id: String,
    /// Version constraint, when the package narrows one.
    #[serde(default)]
    pub constraint: Option<VersionConstraint>,
    /// Framework this dependency applies to; `None` means every framework.
    #[serde(default, rename = "framework")]
    pub target_framework: Option<TargetFramework>,
}

/// A package the repository knows, with its declared dependencies.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Package id as published.
    pub id: String,
    /// Published version.
    pub version: Version,
    /// Declared dependencies in declaration order.
    pub dependencies: Vec<PackageDependency>,
}

impl ResolvedPackage {
    /// Creates package metadata; mostly useful for tests and in-memory
    /// repositories.
    pub fn new(id: impl Into<String>, version: Version, dependencies: Vec<PackageDependency>) -> Self {
        Self {
            id: id.into(),
            version,
            dependencies,
        }
    }

    /// Dependencies applicable to `framework`: framework-agnostic entries
    /// plus those scoped to a matching framework.
    pub fn dependencies_for<'a>(
        &'a self,
        framework: &'a TargetFramework,
    ) -> impl Iterator<Item = &'a PackageDependency> {
        self.dependencies.iter().filter(move |dependency| {
            dependency
                .target_framework
                .as_ref()
                .is_none_or(|scoped| scoped == framework)
        })
    }
}

/// Collaborator interface onto a package store.
pub trait PackageRepository: Send + Sync {
    /// Exact lookup by id (case-insensitive) and version.
    fn find(&self, id: &str, version: &Version) -> Option<Arc<ResolvedPackage>>;

    /// Best match for a declared dependency: the *lowest* known version
    /// satisfying its constraint (minimal-version selection), or the
    /// lowest known version at all when the dependency carries no
    /// constraint.
    fn resolve_dependency(&self, dependency: &PackageDependency) -> Option<Arc<ResolvedPackage>>;
}

/// In-memory package index.
pub struct MemoryPackageRepository {
    packages: Vec<Arc<ResolvedPackage>>,
}

impl MemoryPackageRepository {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            packages: Vec::new(),
        }
    }

    /// Adds a package to the index.
    pub fn insert(&mut self, package: ResolvedPackage) {
        self.packages.push(Arc::new(package));
    }

    /// Number of indexed packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Default for MemoryPackageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageRepository for MemoryPackageRepository {
    fn find(&self, id: &str, version: &Version) -> Option<Arc<ResolvedPackage>> {
        self.packages
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id) && p.version == *version)
            .cloned()
    }

    fn resolve_dependency(&self, dependency: &PackageDependency) -> Option<Arc<ResolvedPackage>> {
        self.packages
            .iter()
            .filter(|p| p.id.eq_ignore_ascii_case(&dependency.id))
            .filter(|p| {
                dependency
                    .constraint
                    .as_ref()
                    .is_none_or(|constraint| constraint.satisfied_by(&p.version))
            })
            .min_by_key(|p| p.version)
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
struct RawPackageMetadata {
    package: RawPackageHeader,
    #[serde(default)]
    dependencies: Vec<PackageDependency>,
}

#[derive(Debug, Deserialize)]
struct RawPackageHeader {
    id: String,
    version: Version,
}

/// Repository backed by a directory of package metadata documents.
pub struct LocalPackageRepository {
    index: MemoryPackageRepository,
}

impl LocalPackageRepository {
    /// Scans `dir` recursively for `*.bpkg.toml` documents and indexes
    /// them.
    ///
    /// Individual malformed documents surface as
    /// [`ManifestParseError`](BinderyError::ManifestParseError): a local
    /// store with corrupt metadata would silently skew reduction
    /// otherwise.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut index = MemoryPackageRepository::new();
        let mut documents: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .file_name()
                        .to_string_lossy()
                        .to_lowercase()
                        .ends_with(PACKAGE_METADATA_EXTENSION)
            })
            .map(|entry| entry.into_path())
            .collect();
        documents.sort();

        for document in documents {
            let file = document.display().to_string();
            let contents =
                std::fs::read_to_string(&document).map_err(|e| BinderyError::ManifestParseError {
                    file: file.clone(),
                    reason: e.to_string(),
                })?;
            let raw: RawPackageMetadata =
                toml::from_str(&contents).map_err(|e| BinderyError::ManifestParseError {
                    file,
                    reason: e.to_string(),
                })?;
            index.insert(ResolvedPackage::new(
                raw.package.id,
                raw.package.version,
                raw.dependencies,
            ));
        }

        tracing::debug!(dir = %dir.display(), packages = index.len(), "local package repository opened");
        Ok(Self { index })
    }

    /// Number of indexed packages.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the repository indexed nothing.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl PackageRepository for LocalPackageRepository {
    fn find(&self, id: &str, version: &Version) -> Option<Arc<ResolvedPackage>> {
        self.index.find(id, version)
    }

    fn resolve_dependency(&self, dependency: &PackageDependency) -> Option<Arc<ResolvedPackage>> {
        self.index.resolve_dependency(dependency)
    }
}

#[derive(Debug, Deserialize, Default)]
struct WorkspaceConfig {
    #[serde(default)]
    repository: Option<PathBuf>,
}

/// Finds the local package store for a project: the workspace config's
/// `repository` path when configured, else the conventional `packages/`
/// folder under the workspace root. `None` when neither exists - callers
/// degrade to resolution-free collection.
pub fn locate_repository(project_dir: &Path) -> Option<PathBuf> {
    let root = workspace_root(project_dir)?;
    let config_path = root.join(WORKSPACE_FILE_NAME);
    let config = std::fs::read_to_string(&config_path)
        .ok()
        .and_then(|contents| match toml::from_str::<WorkspaceConfig>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(
                    file = %config_path.display(),
                    error = %e,
                    "ignoring malformed workspace config"
                );
                None
            }
        })
        .unwrap_or_default();

    let dir = root.join(config.repository.unwrap_or_else(|| PathBuf::from("packages")));
    if dir.is_dir() {
        Some(dir)
    } else {
        tracing::debug!(dir = %dir.display(), "no local package repository");
        None
    }
}
