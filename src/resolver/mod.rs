//! Dependency resolution and package planning.
//!
//! This module ties the engine together: walk the project reference graph
//! ([`project_graph`]), aggregate declared dependencies into framework
//! buckets ([`collector`]), prune candidates implied by other candidates
//! ([`minimal_set`]), resolve the output version
//! ([`crate::version::VersionResolver`]), and hand the result back as a
//! [`PackagePlan`] for the external archive writer to serialize.
//!
//! The planner performs no user-facing I/O and writes nothing except the
//! auto-version counter (behind the counter store). A failure aborts only
//! the affected spec's plan; a front end packaging several specs in one
//! invocation keeps going with the rest.

pub mod collector;
pub mod minimal_set;
pub mod project_graph;

pub use collector::{
    AssemblyNameSet, CandidateSet, CollectedDependencies, DependencyCollector,
    FrameworkDependencies, PackageCandidate,
};
pub use minimal_set::reduce;
pub use project_graph::{walk, ProjectVisit};

use crate::core::Result;
use crate::manifest::PackageSpec;
use crate::metadata::MetadataCache;
use crate::project::{ProjectGraphProvider, SystemAssemblyIndex, TargetFramework};
use crate::repository::PackageRepository;
use crate::version::{CounterStore, Version, VersionConstraint, VersionContext, VersionResolver, VersionSource};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// A package dependency as it will be declared on the produced package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    /// Package id.
    pub id: String,
    /// Version constraint.
    pub constraint: VersionConstraint,
}

/// Dependencies declared for one target framework.
#[derive(Debug, Clone, Default)]
pub struct FrameworkDependencySet {
    /// Minimal explicit package dependencies.
    pub packages: Vec<DeclaredDependency>,
    /// Framework assembly reference names.
    pub framework_assemblies: Vec<String>,
}

/// Everything the archive writer needs to emit one package.
#[derive(Debug, Clone)]
pub struct PackagePlan {
    /// Final package id, after placeholder resolution.
    pub package_id: String,
    /// Resolved output version.
    pub version: Version,
    /// Target path of the package under the output directory.
    pub package_path: PathBuf,
    /// Declared dependencies per target framework.
    pub dependencies: BTreeMap<TargetFramework, FrameworkDependencySet>,
    /// Build-source files (spec, referenced artifacts, expanded file
    /// list) for incremental-build tracking.
    pub sources: Vec<PathBuf>,
    /// Build-target files (the package itself).
    pub targets: Vec<PathBuf>,
}

/// Inputs for planning one package.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Package spec manifest to plan.
    pub spec_path: PathBuf,
    /// Root project whose reference graph supplies dependencies.
    pub project_path: PathBuf,
    /// Framework to assume for projects that declare none.
    pub framework_hint: TargetFramework,
    /// Output-version policy.
    pub version_source: VersionSource,
    /// Externally supplied build number; `0` means "generate".
    pub build_number: u32,
    /// Whether the version participates in the package file name.
    pub versioned_file_name: bool,
    /// Directory the package (and the auto-version counter) lives in.
    pub output_dir: PathBuf,
    /// Compiled artifacts of referenced projects, in reference order.
    pub reference_artifacts: Vec<PathBuf>,
    /// Collect across the whole packable reference tree, or the root
    /// project only.
    pub recursive: bool,
}

/// The engine façade: one planner per run, shared across specs.
pub struct PackagePlanner {
    provider: Arc<dyn ProjectGraphProvider>,
    repository: Option<Arc<dyn PackageRepository>>,
    assembly_index: Arc<dyn SystemAssemblyIndex>,
    metadata: Arc<MetadataCache>,
    versions: VersionResolver,
}

impl PackagePlanner {
    /// Creates a planner over the collaborator handles.
    pub fn new(
        provider: Arc<dyn ProjectGraphProvider>,
        repository: Option<Arc<dyn PackageRepository>>,
        assembly_index: Arc<dyn SystemAssemblyIndex>,
        metadata: Arc<MetadataCache>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            provider,
            repository,
            assembly_index,
            metadata,
            versions: VersionResolver::new(counters),
        }
    }

    /// Plans one package: identity, version, minimal dependencies, and
    /// the build source/target lists.
    #[tracing::instrument(skip(self, options), fields(spec = %options.spec_path.display()))]
    pub async fn plan(&self, options: &PlanOptions) -> Result<PackagePlan> {
        let spec = PackageSpec::load(&options.spec_path)?;
        let file_sources = spec.file_sources()?;

        // Library-policy scan order: referenced artifacts first, then the
        // spec's file list.
        let mut artifact_paths = options.reference_artifacts.clone();
        artifact_paths.extend(file_sources.iter().cloned());

        let package_id = self.resolve_id(&spec, options).await;
        let version = self
            .versions
            .resolve(
                &self.metadata,
                VersionContext {
                    spec_version: spec.declared_version(),
                    source: options.version_source,
                    project_name: &project_name(options),
                    explicit_build_number: options.build_number,
                    artifact_paths: &artifact_paths,
                },
            )
            .await?;

        let collector = DependencyCollector::new(
            self.provider.as_ref(),
            self.repository.as_deref(),
            self.assembly_index.as_ref(),
        );
        let collected = collector.collect(
            &options.project_path,
            &options.framework_hint,
            options.recursive,
        )?;

        let mut dependencies = BTreeMap::new();
        for (framework, bucket) in collected.by_framework {
            let minimal = reduce(bucket.packages, &framework, self.repository.as_deref());
            dependencies.insert(
                framework,
                FrameworkDependencySet {
                    packages: minimal
                        .iter()
                        .map(|candidate| DeclaredDependency {
                            id: candidate.id.clone(),
                            constraint: candidate.constraint.clone(),
                        })
                        .collect(),
                    framework_assemblies: bucket
                        .framework_assemblies
                        .iter()
                        .map(str::to_string)
                        .collect(),
                },
            );
        }

        let package_path = options.output_dir.join(PackageSpec::package_file_name(
            &package_id,
            &version,
            options.versioned_file_name,
        ));

        let mut sources = vec![options.spec_path.clone()];
        sources.extend(options.reference_artifacts.iter().cloned());
        sources.extend(file_sources);

        Ok(PackagePlan {
            package_id,
            version,
            targets: vec![package_path.clone()],
            package_path,
            dependencies,
            sources,
        })
    }

    /// Resolves the `$id$` placeholder against the first referenced
    /// artifact whose identity can be read; keeps the raw id when nothing
    /// resolves.
    async fn resolve_id(&self, spec: &PackageSpec, options: &PlanOptions) -> String {
        if !spec.id_is_placeholder() {
            return spec.raw_id().to_string();
        }
        for artifact in &options.reference_artifacts {
            match self.metadata.identity(artifact).await {
                Ok(identity) => return identity.name.clone(),
                Err(e) => {
                    tracing::debug!(
                        artifact = %artifact.display(),
                        error = %e,
                        "artifact unusable for id placeholder"
                    );
                }
            }
        }
        tracing::warn!(
            spec = %spec.path().display(),
            "id placeholder could not be resolved from referenced artifacts"
        );
        spec.raw_id().to_string()
    }
}

fn project_name(options: &PlanOptions) -> String {
    options
        .project_path
        .file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            name.to_lowercase()
                .strip_suffix(crate::project::PROJECT_EXTENSION)
                .map(|stem| name[..stem.len()].to_string())
                .unwrap_or_else(|| name.into_owned())
        })
        .unwrap_or_default()
}
