//! Filesystem project provider over TOML project descriptors.
//!
//! A descriptor (`<name>.bproj.toml`) declares everything the engine needs
//! to know about a project:
//!
//! ```toml
//! [project]
//! language = "csharp"
//! framework = ".NETFramework,Version=v4.5"
//! references = ["../acme-util/acme-util.bproj.toml"]
//!
//! [[assemblies]]
//! name = "System.Web"
//!
//! [[assemblies]]
//! name = "ThirdParty.Native"
//! copy_local = true
//!
//! [output]
//! kind = "library"
//! name = "acme_core"
//!
//! [output.profiles]
//! "Release|x64" = "bin/release"
//! ```
//!
//! Reference paths are declaration-ordered and resolved relative to the
//! descriptor's directory; a `packages.toml` sitting next to the
//! descriptor is picked up as the project's package-reference manifest.
//! Loaded nodes are memoized per normalized path for the provider's
//! lifetime, so one run sees one immutable snapshot per project.

use crate::core::{BinderyError, Result};
use crate::manifest::REFERENCE_MANIFEST_NAME;
use crate::project::{
    normalize_path, AssemblyReference, OutputKind, OutputSpec, ProjectGraphProvider,
    ProjectLanguage, ProjectNode, TargetFramework, PROJECT_EXTENSION,
};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    project: RawHeader,
    #[serde(default)]
    assemblies: Vec<AssemblyReference>,
    #[serde(default)]
    output: Option<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    #[serde(default)]
    name: Option<String>,
    language: ProjectLanguage,
    #[serde(default)]
    framework: Option<TargetFramework>,
    #[serde(default)]
    references: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    kind: OutputKind,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    profiles: HashMap<String, PathBuf>,
}

/// [`ProjectGraphProvider`] reading TOML descriptors off disk.
pub struct FsProjectProvider {
    loaded: DashMap<PathBuf, Arc<ProjectNode>>,
}

impl FsProjectProvider {
    /// Creates an empty provider; projects load lazily on first request.
    pub fn new() -> Self {
        Self {
            loaded: DashMap::new(),
        }
    }

    fn parse(path: &Path) -> Result<ProjectNode> {
        let file = path.display().to_string();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BinderyError::ProjectNotFound { path: file });
            }
            Err(e) => {
                return Err(BinderyError::ProjectParseError {
                    file,
                    reason: e.to_string(),
                });
            }
        };
        let raw: RawDescriptor =
            toml::from_str(&contents).map_err(|e| BinderyError::ProjectParseError {
                file,
                reason: e.to_string(),
            })?;

        let project_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = raw.project.name.unwrap_or_else(|| default_name(path));
        let references = raw
            .project
            .references
            .iter()
            .map(|reference| normalize_path(project_dir, reference))
            .collect();
        let package_manifest = {
            let candidate = project_dir.join(REFERENCE_MANIFEST_NAME);
            candidate.is_file().then_some(candidate)
        };
        let output = raw.output.map(|o| OutputSpec {
            kind: o.kind,
            name: o.name.unwrap_or_else(|| name.clone()),
            profiles: o.profiles,
        });

        Ok(ProjectNode {
            path: path.to_path_buf(),
            name,
            language: raw.project.language,
            target_framework: raw.project.framework,
            references,
            assembly_references: raw.assemblies,
            package_manifest,
            output,
        })
    }
}

impl Default for FsProjectProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectGraphProvider for FsProjectProvider {
    fn load(&self, path: &Path) -> Result<Arc<ProjectNode>> {
        let key = normalize_path(Path::new("."), path);
        if let Some(node) = self.loaded.get(&key) {
            return Ok(node.clone());
        }
        let node = Arc::new(Self::parse(&key)?);
        self.loaded.insert(key, node.clone());
        Ok(node)
    }
}

fn default_name(path: &Path) -> String {
    let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    file.to_lowercase()
        .strip_suffix(PROJECT_EXTENSION)
        .map(|stem| file[..stem.len()].to_string())
        .unwrap_or(file)
}
