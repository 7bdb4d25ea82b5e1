//! Project descriptors and the reference-graph provider seam.
//!
//! The engine never inspects a build system directly; it asks a
//! [`ProjectGraphProvider`] for immutable [`ProjectNode`] snapshots and
//! walks the reference edges those expose. This keeps the collaborator
//! explicit - any host can implement the trait - while
//! [`fs_provider::FsProjectProvider`] ships the conventional
//! TOML-descriptor implementation.
//!
//! Also here: the [`TargetFramework`] partition key, per-language baseline
//! reference sets (platform assemblies that are implicit and never become
//! package dependencies), the packability predicate used when deciding
//! which reference edges to follow, and workspace-root discovery.

pub mod assembly_index;
pub mod fs_provider;

pub use assembly_index::{FsAssemblyIndex, StaticAssemblyIndex, SystemAssemblyIndex};
pub use fs_provider::FsProjectProvider;

use crate::core::Result;
use crate::manifest::SPEC_EXTENSION;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Extension identifying project descriptors.
pub const PROJECT_EXTENSION: &str = ".bproj.toml";

/// Conventional workspace marker/config file name.
pub const WORKSPACE_FILE_NAME: &str = "workspace.toml";

/// How many directory levels above a project to search for the workspace
/// marker.
const WORKSPACE_SEARCH_DEPTH: usize = 5;

/// An opaque target-framework moniker, e.g.
/// `".NETFramework,Version=v4.5"`.
///
/// Acts purely as a partition key: equality, ordering and hashing are
/// case-insensitive, and two projects with different frameworks contribute
/// to disjoint aggregation buckets.
#[derive(Debug, Clone)]
pub struct TargetFramework {
    moniker: String,
}

impl TargetFramework {
    /// Wraps a moniker string.
    pub fn new(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
        }
    }

    /// The moniker as written.
    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    fn folded(&self) -> String {
        self.moniker.to_lowercase()
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.moniker)
    }
}

impl PartialEq for TargetFramework {
    fn eq(&self, other: &Self) -> bool {
        self.moniker.eq_ignore_ascii_case(&other.moniker)
    }
}

impl Eq for TargetFramework {}

impl PartialOrd for TargetFramework {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TargetFramework {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(&other.folded())
    }
}

impl std::hash::Hash for TargetFramework {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl<'de> Deserialize<'de> for TargetFramework {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Self::new(String::deserialize(deserializer)?))
    }
}

/// Source language of a project; selects its baseline reference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectLanguage {
    /// C# project.
    CSharp,
    /// Visual Basic project.
    VisualBasic,
    /// F# project.
    FSharp,
}

impl ProjectLanguage {
    /// Platform-supplied assemblies implicit to every project of this
    /// language; these never count as package dependencies.
    pub fn baseline_references(self) -> &'static [&'static str] {
        match self {
            Self::CSharp => &[
                "Microsoft.CSharp",
                "System",
                "System.Core",
                "System.Data",
                "System.Data.DataSetExtensions",
                "System.Xml",
                "System.Xml.Linq",
            ],
            Self::VisualBasic => &["System"],
            Self::FSharp => &[
                "FSharp.Core",
                "mscorlib",
                "System",
                "System.Core",
                "System.Numerics",
            ],
        }
    }

    /// Case-insensitive membership in the baseline set.
    pub fn is_baseline_reference(self, name: &str) -> bool {
        self.baseline_references().iter().any(|r| r.eq_ignore_ascii_case(name))
    }
}

/// A declared assembly reference.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AssemblyReference {
    /// Assembly identity (simple name).
    pub name: String,
    /// Copy-local marker: `Some(true)` means the assembly is embedded as a
    /// build output, `Some(false)` means it is consumed in place, `None`
    /// leaves the decision to the platform assembly index.
    #[serde(default)]
    pub copy_local: Option<bool>,
}

/// Build-output description for a project (kind, name, per-profile
/// output directories).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    /// Whether the project compiles to a library or an executable.
    pub kind: OutputKind,
    /// Artifact base name (no extension).
    pub name: String,
    /// Output directory per `Configuration|Platform` profile, relative to
    /// the project directory.
    pub profiles: std::collections::HashMap<String, PathBuf>,
}

/// Kind of compiled output a project produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Produces a `.dll`.
    Library,
    /// Produces an `.exe`.
    Executable,
}

impl OutputKind {
    /// File extension of the compiled artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Library => "dll",
            Self::Executable => "exe",
        }
    }
}

/// One project in the reference graph.
///
/// Constructed lazily by a provider on first visit, immutable for the
/// duration of a walk, never persisted across runs.
#[derive(Debug, Clone)]
pub struct ProjectNode {
    /// Absolute descriptor path; the node's identity.
    pub path: PathBuf,
    /// Project name (defaults to the descriptor's stem).
    pub name: String,
    /// Source language; selects the baseline reference set.
    pub language: ProjectLanguage,
    /// Declared target framework, when the project declares one.
    pub target_framework: Option<TargetFramework>,
    /// Outgoing project-reference edges in declaration order (absolute
    /// paths).
    pub references: Vec<PathBuf>,
    /// Declared assembly references in declaration order.
    pub assembly_references: Vec<AssemblyReference>,
    /// Path of the project's package-reference manifest, when it has one.
    pub package_manifest: Option<PathBuf>,
    /// Build-output description, when declared.
    pub output: Option<OutputSpec>,
}

impl ProjectNode {
    /// Path of the compiled artifact for a `Configuration|Platform`
    /// profile, when the descriptor declares both an output and a matching
    /// profile.
    pub fn compiled_artifact(&self, configuration: &str, platform: &str) -> Option<PathBuf> {
        let output = self.output.as_ref()?;
        let profile_key = format!("{configuration}|{platform}");
        let dir = output
            .profiles
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(&profile_key))
            .map(|(_, dir)| dir)?;
        let project_dir = self.path.parent()?;
        Some(
            project_dir
                .join(dir)
                .join(format!("{}.{}", output.name, output.kind.extension())),
        )
    }
}

/// Collaborator that resolves a path to a project's reference graph.
///
/// Replaces any privileged lookup into build-engine state: the engine only
/// ever sees what the provider hands it.
pub trait ProjectGraphProvider: Send + Sync {
    /// Loads (or returns the memoized) project at `path`.
    fn load(&self, path: &Path) -> Result<Arc<ProjectNode>>;
}

/// Whether `path` names a supported project descriptor.
pub fn is_supported_project(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(PROJECT_EXTENSION)
}

/// Whether the project's directory tree carries a package spec of its own.
///
/// Projects with their own spec are packaged separately; reference edges
/// into them are not followed when collecting dependencies.
pub fn has_own_package_spec(project_path: &Path) -> bool {
    let Some(dir) = project_path.parent() else {
        return false;
    };
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .any(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy().to_lowercase().ends_with(SPEC_EXTENSION)
        })
}

/// The walker predicate for recursive dependency collection: a supported
/// project that does not package itself.
pub fn is_packable_reference(path: &Path) -> bool {
    is_supported_project(path) && !has_own_package_spec(path)
}

/// Lexically normalizes `path` against `base_dir`, resolving `.` and
/// `..` segments without touching the filesystem.
///
/// Visited-set identity and provider memoization both key on the result,
/// so aliases of the same project collapse to one entry.
pub fn normalize_path(base_dir: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Walks up from `project_dir` looking for the workspace marker file,
/// giving up after a few levels.
pub fn workspace_root(project_dir: &Path) -> Option<PathBuf> {
    let mut current = Some(project_dir);
    for _ in 0..WORKSPACE_SEARCH_DEPTH {
        let dir = current?;
        if dir.join(WORKSPACE_FILE_NAME).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}
