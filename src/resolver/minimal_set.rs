//! Minimal-set reduction over aggregated package candidates.
//!
//! When project A depends on package P and P itself depends on Q,
//! declaring both P and Q on the produced package is redundant -
//! installing P already brings Q, and the duplicate declaration widens the
//! version-conflict surface. Reduction removes every candidate reachable
//! as a transitive dependency of another candidate, leaving the minimal
//! explicit set.
//!
//! The algorithm processes candidates in declaration order. Each live
//! candidate's dependency graph is walked depth-first through the
//! repository collaborator, honoring the package's framework scoping;
//! every package reached (excluding the walk's own root) is removed from
//! the shared candidate set if still present. All walks consult the same
//! set: a branch reaching an already-removed package stops descending,
//! because that package's dependencies were pruned when it was first
//! pulled in - re-walking it is redundant, and skipping it is what
//! guarantees termination alongside the per-walk visited set guarding
//! repository cycles.
//!
//! Conservative defaults throughout: an unresolvable dependency is a dead
//! end, never an error, and a candidate the repository cannot resolve is
//! never removed - nothing can prove it redundant. When a dependency
//! cycle makes membership ambiguous, the first-seen-in-declaration-order
//! candidate survives; this is a deliberate deterministic rule, not an
//! accident of traversal.

use crate::project::TargetFramework;
use crate::repository::{PackageRepository, ResolvedPackage};
use crate::resolver::collector::CandidateSet;
use std::collections::HashSet;

/// Reduces `candidates` to the minimal explicit set for `framework`.
///
/// Without a repository the set is returned unchanged: no transitive
/// metadata means nothing can be proven redundant. Reduction is
/// idempotent - reducing an already-minimal set changes nothing.
pub fn reduce(
    mut candidates: CandidateSet,
    framework: &TargetFramework,
    repository: Option<&dyn PackageRepository>,
) -> CandidateSet {
    let Some(repository) = repository else {
        tracing::debug!("no package repository; keeping every candidate explicit");
        return candidates;
    };

    let before = candidates.len();
    for root_id in candidates.ids() {
        // Removed by an earlier candidate's walk; its subtree is already
        // pruned.
        if candidates.is_removed(&root_id) {
            continue;
        }
        let Some(root_package) = candidates.get(&root_id).and_then(|c| c.package.clone()) else {
            continue;
        };

        let root_key = root_id.to_lowercase();
        let mut visiting: HashSet<String> = HashSet::new();
        visiting.insert(root_key.clone());
        prune_reachable(
            &root_package,
            &root_key,
            framework,
            repository,
            &mut candidates,
            &mut visiting,
        );
    }

    let removed = before - candidates.len();
    if removed > 0 {
        tracing::debug!(
            framework = %framework,
            kept = candidates.len(),
            removed,
            "reduced candidate set"
        );
    }
    candidates
}

fn prune_reachable(
    package: &ResolvedPackage,
    root_key: &str,
    framework: &TargetFramework,
    repository: &dyn PackageRepository,
    candidates: &mut CandidateSet,
    visiting: &mut HashSet<String>,
) {
    for dependency in package.dependencies_for(framework) {
        // Unresolvable dependency: dead end, not an error.
        let Some(resolved) = repository.resolve_dependency(dependency) else {
            continue;
        };
        let key = resolved.id.to_lowercase();
        // The walk's own root is excluded from removal; a cycle back to it
        // must not let the walk prune its own starting point.
        if key == root_key {
            continue;
        }
        // Repository cycle within this walk.
        if !visiting.insert(key.clone()) {
            continue;
        }
        // Already pruned by an earlier walk (or an earlier branch of this
        // one); its subtree was handled when it was removed.
        if candidates.is_removed(&key) {
            continue;
        }
        candidates.remove(&key);
        prune_reachable(&resolved, root_key, framework, repository, candidates, visiting);
    }
}
