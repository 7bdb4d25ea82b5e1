//! Deterministic traversal of a project's reference graph.
//!
//! The walker produces an ordered visit plan rather than invoking
//! callbacks mid-traversal: depth-first over reference edges in
//! declaration order, each project visited at most once. Ordering is
//! load-bearing - downstream merging is first-occurrence-wins, so the
//! same graph must always yield the same visit sequence.
//!
//! Cycle handling: a node is marked visited *before* its references are
//! walked, so a project referencing itself transitively is skipped on
//! revisit, never recursed into twice. Revisits are traced, not errors.
//!
//! Framework context: a visit carries the node's own declared framework
//! when it has one, else the walk root's effective framework. There is no
//! per-edge framework negotiation; that simplification is recorded in the
//! design notes.

use crate::core::Result;
use crate::project::{normalize_path, ProjectGraphProvider, ProjectNode, TargetFramework};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One entry of the visit plan: a project and its effective framework.
#[derive(Debug, Clone)]
pub struct ProjectVisit {
    /// The visited project.
    pub node: Arc<ProjectNode>,
    /// Framework bucket this project contributes to.
    pub framework: TargetFramework,
}

/// Walks the reference graph from `root`, returning the visit plan.
///
/// `predicate` filters which reference edges are followed (the root is
/// always visited); `framework_hint` supplies the effective framework
/// when the root declares none.
pub fn walk(
    provider: &dyn ProjectGraphProvider,
    root: &Path,
    framework_hint: &TargetFramework,
    predicate: &dyn Fn(&Path) -> bool,
) -> Result<Vec<ProjectVisit>> {
    let root_path = normalize_path(Path::new("."), root);
    let root_node = provider.load(&root_path)?;
    let root_framework = root_node
        .target_framework
        .clone()
        .unwrap_or_else(|| framework_hint.clone());

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut plan = Vec::new();
    visit(
        provider,
        root_node,
        root_path,
        &root_framework,
        predicate,
        &mut visited,
        &mut plan,
    )?;
    Ok(plan)
}

fn visit(
    provider: &dyn ProjectGraphProvider,
    node: Arc<ProjectNode>,
    node_path: PathBuf,
    root_framework: &TargetFramework,
    predicate: &dyn Fn(&Path) -> bool,
    visited: &mut HashSet<PathBuf>,
    plan: &mut Vec<ProjectVisit>,
) -> Result<()> {
    // Mark before recursing; reference cycles then short-circuit below.
    visited.insert(node_path.clone());

    let framework = node
        .target_framework
        .clone()
        .unwrap_or_else(|| root_framework.clone());
    plan.push(ProjectVisit {
        node: node.clone(),
        framework,
    });

    let node_dir = node_path.parent().map(Path::to_path_buf).unwrap_or_default();
    for reference in &node.references {
        let reference_path = normalize_path(&node_dir, reference);
        if !predicate(&reference_path) {
            continue;
        }
        if visited.contains(&reference_path) {
            tracing::debug!(
                project = %reference_path.display(),
                "skipping already-visited project reference"
            );
            continue;
        }
        let referenced = provider.load(&reference_path)?;
        visit(
            provider,
            referenced,
            reference_path,
            root_framework,
            predicate,
            visited,
            plan,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectLanguage;
    use std::collections::HashMap;

    /// Provider over a fixed in-memory graph.
    struct StubProvider {
        nodes: HashMap<PathBuf, Arc<ProjectNode>>,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                nodes: HashMap::new(),
            }
        }

        fn add(&mut self, path: &str, framework: Option<&str>, references: &[&str]) {
            let path = PathBuf::from(path);
            let file = path.file_name().unwrap().to_string_lossy().into_owned();
            let name = file
                .to_lowercase()
                .strip_suffix(crate::project::PROJECT_EXTENSION)
                .map(|stem| file[..stem.len()].to_string())
                .unwrap_or_else(|| file.clone());
            let node = ProjectNode {
                path: path.clone(),
                name,
                language: ProjectLanguage::CSharp,
                target_framework: framework.map(TargetFramework::new),
                references: references.iter().map(PathBuf::from).collect(),
                assembly_references: Vec::new(),
                package_manifest: None,
                output: None,
            };
            self.nodes.insert(path, Arc::new(node));
        }
    }

    impl ProjectGraphProvider for StubProvider {
        fn load(&self, path: &Path) -> Result<Arc<ProjectNode>> {
            self.nodes.get(path).cloned().ok_or_else(|| {
                crate::core::BinderyError::ProjectNotFound {
                    path: path.display().to_string(),
                }
            })
        }
    }

    fn hint() -> TargetFramework {
        TargetFramework::new(".NETFramework,Version=v4.5")
    }

    fn names(plan: &[ProjectVisit]) -> Vec<&str> {
        plan.iter().map(|v| v.node.name.as_str()).collect()
    }

    /// A diamond (A->B, A->C, B->D, C->D) visits D exactly once.
    #[test]
    fn test_diamond_visits_shared_node_once() {
        let mut provider = StubProvider::new();
        provider.add("/w/a/a.bproj.toml", None, &["/w/b/b.bproj.toml", "/w/c/c.bproj.toml"]);
        provider.add("/w/b/b.bproj.toml", None, &["/w/d/d.bproj.toml"]);
        provider.add("/w/c/c.bproj.toml", None, &["/w/d/d.bproj.toml"]);
        provider.add("/w/d/d.bproj.toml", None, &[]);

        let plan = walk(&provider, Path::new("/w/a/a.bproj.toml"), &hint(), &|_| true).unwrap();
        assert_eq!(names(&plan), vec!["a", "b", "d", "c"]);
    }

    /// Mutual references terminate instead of recursing forever.
    #[test]
    fn test_reference_cycle_terminates() {
        let mut provider = StubProvider::new();
        provider.add("/w/a/a.bproj.toml", None, &["/w/b/b.bproj.toml"]);
        provider.add("/w/b/b.bproj.toml", None, &["/w/a/a.bproj.toml"]);

        let plan = walk(&provider, Path::new("/w/a/a.bproj.toml"), &hint(), &|_| true).unwrap();
        assert_eq!(names(&plan), vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference_visited_once() {
        let mut provider = StubProvider::new();
        provider.add("/w/a/a.bproj.toml", None, &["/w/a/a.bproj.toml"]);

        let plan = walk(&provider, Path::new("/w/a/a.bproj.toml"), &hint(), &|_| true).unwrap();
        assert_eq!(names(&plan), vec!["a"]);
    }

    /// Traversal is depth-first in reference declaration order.
    #[test]
    fn test_declaration_order_is_preserved() {
        let mut provider = StubProvider::new();
        provider.add(
            "/w/a/a.bproj.toml",
            None,
            &["/w/c/c.bproj.toml", "/w/b/b.bproj.toml"],
        );
        provider.add("/w/b/b.bproj.toml", None, &[]);
        provider.add("/w/c/c.bproj.toml", None, &[]);

        let plan = walk(&provider, Path::new("/w/a/a.bproj.toml"), &hint(), &|_| true).unwrap();
        assert_eq!(names(&plan), vec!["a", "c", "b"]);
    }

    /// Nodes keep their own framework; the rest inherit the root's.
    #[test]
    fn test_framework_inheritance() {
        let mut provider = StubProvider::new();
        provider.add("/w/a/a.bproj.toml", None, &["/w/b/b.bproj.toml", "/w/c/c.bproj.toml"]);
        provider.add("/w/b/b.bproj.toml", Some(".NETFramework,Version=v4.0"), &[]);
        provider.add("/w/c/c.bproj.toml", None, &[]);

        let plan = walk(&provider, Path::new("/w/a/a.bproj.toml"), &hint(), &|_| true).unwrap();
        assert_eq!(plan[0].framework, hint());
        assert_eq!(plan[1].framework, TargetFramework::new(".netframework,version=v4.0"));
        assert_eq!(plan[2].framework, hint());
    }

    /// Edges failing the predicate are not followed.
    #[test]
    fn test_predicate_filters_edges() {
        let mut provider = StubProvider::new();
        provider.add("/w/a/a.bproj.toml", None, &["/w/b/b.bproj.toml", "/w/c/c.bproj.toml"]);
        provider.add("/w/b/b.bproj.toml", None, &[]);
        provider.add("/w/c/c.bproj.toml", None, &[]);

        let plan = walk(&provider, Path::new("/w/a/a.bproj.toml"), &hint(), &|path| {
            !path.to_string_lossy().contains("/b/")
        })
        .unwrap();
        assert_eq!(names(&plan), vec!["a", "c"]);
    }
}
