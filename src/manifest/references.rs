//! Package-reference manifests - the packages a project consumes.
//!
//! Each project may carry a `packages.toml` listing its package
//! references:
//!
//! ```toml
//! [[packages]]
//! id = "Serde.Compat"
//! version = "1.0.3"
//! constraint = "[1.0,2.0)"
//!
//! [[packages]]
//! id = "Mock.Kit"
//! version = "0.9.1"
//! development = true
//! ```
//!
//! `constraint` narrows the version range declared to consumers of the
//! produced package; without it the engine derives a floor constraint from
//! the resolved version. `development = true` marks build-time-only
//! references that never become package dependencies.
//!
//! A malformed reference manifest fails collection outright: dependency
//! data is foundational to package correctness, so there is no recovery
//! path here.

use crate::core::{BinderyError, Result};
use crate::version::{Version, VersionConstraint};
use serde::Deserialize;
use std::path::Path;

/// Conventional file name of the package-reference manifest.
pub const REFERENCE_MANIFEST_NAME: &str = "packages.toml";

/// One declared package reference.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PackageReference {
    /// Package id; compared case-insensitively everywhere.
    pub id: String,
    /// Referenced version.
    pub version: Version,
    /// Optional explicit version constraint for consumers.
    #[serde(default)]
    pub constraint: Option<VersionConstraint>,
    /// Build-time-only reference; excluded from package dependencies.
    #[serde(default)]
    pub development: bool,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    packages: Vec<PackageReference>,
}

/// A parsed package-reference manifest.
#[derive(Debug, Clone)]
pub struct ReferenceManifest {
    references: Vec<PackageReference>,
}

impl ReferenceManifest {
    /// Loads and parses the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| BinderyError::ManifestParseError {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        let raw: RawManifest =
            toml::from_str(&contents).map_err(|e| BinderyError::ManifestParseError {
                file,
                reason: e.to_string(),
            })?;
        Ok(Self {
            references: raw.packages,
        })
    }

    /// All declared references, in declaration order.
    pub fn references(&self) -> &[PackageReference] {
        &self.references
    }

    /// References that become package dependencies (development ones
    /// filtered out), in declaration order.
    pub fn runtime_references(&self) -> impl Iterator<Item = &PackageReference> {
        self.references.iter().filter(|r| !r.development)
    }
}
