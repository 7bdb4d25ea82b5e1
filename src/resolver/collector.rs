//! Dependency aggregation across a project reference tree.
//!
//! The collector visits each project in the walk plan and fills
//! framework-keyed buckets with two kinds of dependency:
//!
//! - **framework assembly references** - platform assemblies the packaged
//!   code links against, minus the language's implicit baseline set, minus
//!   anything marked copy-local (those ship inside the package instead);
//!   an unmarked reference counts only when the platform assembly index
//!   knows it;
//! - **package candidates** - the project's declared package references
//!   (development ones excluded), each resolved against the package
//!   repository when one is available so reduction can later walk its
//!   transitive dependencies.
//!
//! Merging is first-occurrence-wins per framework bucket, which together
//! with the walker's deterministic ordering makes collection reproducible.
//! A missing repository degrades to candidates without metadata; a
//! malformed reference manifest fails the collection outright.

use crate::core::Result;
use crate::manifest::ReferenceManifest;
use crate::project::{ProjectGraphProvider, SystemAssemblyIndex, TargetFramework};
use crate::repository::{PackageRepository, ResolvedPackage};
use crate::resolver::project_graph::{walk, ProjectVisit};
use crate::version::{Version, VersionConstraint};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// A package dependency identified during aggregation, subject to
/// redundancy elimination.
#[derive(Debug, Clone)]
pub struct PackageCandidate {
    /// Package id, in the repository's published casing when resolvable.
    pub id: String,
    /// Resolved (or declared) version.
    pub version: Version,
    /// Constraint to declare on the produced package.
    pub constraint: VersionConstraint,
    /// Whether the constraint came from the reference manifest rather
    /// than being derived from the version.
    pub explicit_constraint: bool,
    /// Repository metadata, when the package could be resolved; fuels the
    /// minimal-set walk.
    pub package: Option<Arc<ResolvedPackage>>,
}

impl PackageCandidate {
    fn key(&self) -> String {
        self.id.to_lowercase()
    }
}

/// Declaration-ordered candidate set with case-insensitive identity and
/// test-and-remove semantics.
///
/// Removal leaves a tombstone so iteration order stays stable while the
/// minimal-set walks prune the set they are iterating; a removed id
/// answers [`is_removed`](Self::is_removed) instead of reappearing.
#[derive(Debug, Default, Clone)]
pub struct CandidateSet {
    ordered: Vec<Option<PackageCandidate>>,
    slots: HashMap<String, usize>,
}

impl CandidateSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a candidate under first-occurrence-wins semantics.
    ///
    /// A later duplicate is dropped, with one exception: an explicit
    /// constraint upgrades an earlier derived one when both talk about the
    /// same version. Returns whether the candidate entered the set.
    pub fn insert(&mut self, candidate: PackageCandidate) -> bool {
        let key = candidate.key();
        if let Some(&slot) = self.slots.get(&key) {
            if let Some(existing) = self.ordered[slot].as_mut()
                && !existing.explicit_constraint
                && candidate.explicit_constraint
                && existing.version == candidate.version
            {
                existing.constraint = candidate.constraint;
                existing.explicit_constraint = true;
            }
            return false;
        }
        self.slots.insert(key, self.ordered.len());
        self.ordered.push(Some(candidate));
        true
    }

    /// Looks up a live candidate by id (case-insensitive).
    pub fn get(&self, id: &str) -> Option<&PackageCandidate> {
        let slot = *self.slots.get(&id.to_lowercase())?;
        self.ordered[slot].as_ref()
    }

    /// Removes `id` if still present; returns whether anything was
    /// removed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.slots.get(&id.to_lowercase()) {
            Some(&slot) => self.ordered[slot].take().is_some(),
            None => false,
        }
    }

    /// Whether `id` was present and has been removed.
    pub fn is_removed(&self, id: &str) -> bool {
        match self.slots.get(&id.to_lowercase()) {
            Some(&slot) => self.ordered[slot].is_none(),
            None => false,
        }
    }

    /// Live candidates in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PackageCandidate> {
        self.ordered.iter().filter_map(Option::as_ref)
    }

    /// Ids of live candidates in declaration order.
    pub fn ids(&self) -> Vec<String> {
        self.iter().map(|candidate| candidate.id.clone()).collect()
    }

    /// Number of live candidates.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no live candidates remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Case-insensitive name set that remembers first-seen casing and
/// iterates in case-folded order.
#[derive(Debug, Default, Clone)]
pub struct AssemblyNameSet {
    names: BTreeMap<String, String>,
}

impl AssemblyNameSet {
    /// Inserts a name; later casings of the same name are ignored.
    pub fn insert(&mut self, name: &str) {
        self.names.entry(name.to_lowercase()).or_insert_with(|| name.to_string());
    }

    /// Case-insensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_lowercase())
    }

    /// Names in folded order, first-seen casing.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One framework bucket of aggregated dependencies.
#[derive(Debug, Default, Clone)]
pub struct FrameworkDependencies {
    /// Deduplicated framework assembly references.
    pub framework_assemblies: AssemblyNameSet,
    /// Package candidates awaiting reduction.
    pub packages: CandidateSet,
}

/// Aggregation output: one bucket per target framework encountered.
#[derive(Debug, Default)]
pub struct CollectedDependencies {
    /// Buckets keyed by framework.
    pub by_framework: BTreeMap<TargetFramework, FrameworkDependencies>,
}

impl CollectedDependencies {
    /// Frameworks encountered during collection.
    pub fn frameworks(&self) -> impl Iterator<Item = &TargetFramework> {
        self.by_framework.keys()
    }
}

/// Aggregates dependencies over a walk of the project graph.
pub struct DependencyCollector<'a> {
    provider: &'a dyn ProjectGraphProvider,
    repository: Option<&'a dyn PackageRepository>,
    assembly_index: &'a dyn SystemAssemblyIndex,
}

impl<'a> DependencyCollector<'a> {
    /// Creates a collector over the collaborator handles. `repository` may
    /// be absent; candidates then carry no transitive metadata.
    pub fn new(
        provider: &'a dyn ProjectGraphProvider,
        repository: Option<&'a dyn PackageRepository>,
        assembly_index: &'a dyn SystemAssemblyIndex,
    ) -> Self {
        Self {
            provider,
            repository,
            assembly_index,
        }
    }

    /// Collects dependencies starting at `root`.
    ///
    /// When `recursive` is set the whole packable reference tree is
    /// visited (supported projects without a package spec of their own);
    /// otherwise only the root project contributes.
    pub fn collect(
        &self,
        root: &Path,
        framework_hint: &TargetFramework,
        recursive: bool,
    ) -> Result<CollectedDependencies> {
        let plan = if recursive {
            walk(self.provider, root, framework_hint, &crate::project::is_packable_reference)?
        } else {
            walk(self.provider, root, framework_hint, &|_| false)?
        };

        let mut collected = CollectedDependencies::default();
        for visit in &plan {
            self.add_project(visit, &mut collected)?;
        }
        tracing::debug!(
            root = %root.display(),
            projects = plan.len(),
            frameworks = collected.by_framework.len(),
            "dependency collection finished"
        );
        Ok(collected)
    }

    fn add_project(&self, visit: &ProjectVisit, collected: &mut CollectedDependencies) -> Result<()> {
        let node = &visit.node;
        let bucket = collected.by_framework.entry(visit.framework.clone()).or_default();

        for reference in &node.assembly_references {
            if node.language.is_baseline_reference(&reference.name) {
                continue;
            }
            let is_framework_assembly = match reference.copy_local {
                // Embedded as a build output, not a dependency.
                Some(true) => false,
                Some(false) => true,
                // Unmarked: only platform-provided assemblies qualify.
                None => self.assembly_index.contains(&reference.name),
            };
            if is_framework_assembly {
                bucket.framework_assemblies.insert(&reference.name);
            }
        }

        let Some(manifest_path) = node.package_manifest.as_deref() else {
            return Ok(());
        };
        let manifest = ReferenceManifest::load(manifest_path)?;
        for reference in manifest.runtime_references() {
            let resolved = self
                .repository
                .and_then(|repository| repository.find(&reference.id, &reference.version));
            let (id, version) = match &resolved {
                Some(package) => (package.id.clone(), package.version),
                None => (reference.id.clone(), reference.version),
            };
            let (constraint, explicit_constraint) = match &reference.constraint {
                Some(explicit) => (explicit.clone(), true),
                None => (VersionConstraint::at_least(version), false),
            };
            bucket.packages.insert(PackageCandidate {
                id,
                version,
                constraint,
                explicit_constraint,
                package: resolved,
            });
        }
        Ok(())
    }
}
