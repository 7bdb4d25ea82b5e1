//! Package spec manifests - the declarative description of a package.
//!
//! A package spec (`*.pkgspec.toml`) names the package, declares its
//! version and metadata, and lists the files the archive will carry:
//!
//! ```toml
//! [package]
//! id = "Acme.Core"
//! version = "1.2"
//! authors = "Acme Corp"
//! description = "Core runtime for Acme services"
//!
//! [[files]]
//! src = "native/*.so"
//! target = "lib"
//! ```
//!
//! Two placeholder values defer resolution to packaging time: `id =
//! "$id$"` takes the name of the first referenced artifact whose identity
//! can be read, and `version = "$version$"` parses as the all-zero
//! version, i.e. "unset" (the version policies in [`crate::version`]
//! decide what that becomes).
//!
//! Submodule [`references`] handles the package-reference manifest, the
//! per-project list of consumed packages.

pub mod references;

pub use references::{PackageReference, ReferenceManifest, REFERENCE_MANIFEST_NAME};

use crate::core::{BinderyError, Result};
use crate::version::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Extension identifying package spec manifests.
pub const SPEC_EXTENSION: &str = ".pkgspec.toml";

/// Extension of the produced package archives.
pub const PACKAGE_EXTENSION: &str = "bpkg";

const ID_PLACEHOLDER: &str = "$id$";
const VERSION_PLACEHOLDER: &str = "$version$";

#[derive(Debug, Deserialize)]
struct RawSpec {
    package: RawPackage,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    id: String,
    version: String,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// One `[[files]]` entry: a source pattern and its archive folder.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Source path or glob, relative to the spec's directory.
    pub src: String,
    /// Target folder inside the archive (e.g. `lib`, `content`).
    pub target: String,
}

/// A parsed package spec manifest.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    path: PathBuf,
    id: String,
    version: Version,
    authors: Option<String>,
    description: Option<String>,
    files: Vec<FileEntry>,
}

impl PackageSpec {
    /// Loads and validates the spec at `path`.
    ///
    /// Syntax failures surface as
    /// [`ManifestParseError`](BinderyError::ManifestParseError) and content
    /// failures as
    /// [`ManifestValidationError`](BinderyError::ManifestValidationError);
    /// neither is recovered, since everything downstream depends on the
    /// spec.
    pub fn load(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| BinderyError::ManifestParseError {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        let raw: RawSpec = toml::from_str(&contents).map_err(|e| BinderyError::ManifestParseError {
            file: file.clone(),
            reason: e.to_string(),
        })?;

        if raw.package.id.trim().is_empty() {
            return Err(BinderyError::ManifestValidationError {
                file,
                reason: "package id must not be empty".to_string(),
            });
        }
        // The placeholder parses as the zero version: "unset".
        let version = if raw.package.version == VERSION_PLACEHOLDER {
            Version::zero()
        } else {
            Version::parse(&raw.package.version).map_err(|_| {
                BinderyError::ManifestValidationError {
                    file: file.clone(),
                    reason: format!("invalid package version '{}'", raw.package.version),
                }
            })?
        };

        Ok(Self {
            path: path.to_path_buf(),
            id: raw.package.id,
            version,
            authors: raw.package.authors,
            description: raw.package.description,
            files: raw.files,
        })
    }

    /// Absolute location of the spec file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared package id, possibly the `$id$` placeholder.
    pub fn raw_id(&self) -> &str {
        &self.id
    }

    /// Whether the id defers to a referenced artifact's name.
    pub fn id_is_placeholder(&self) -> bool {
        self.id == ID_PLACEHOLDER
    }

    /// Declared version; all-zero when the manifest used the placeholder.
    pub fn declared_version(&self) -> Version {
        self.version
    }

    /// Authors attribute, when declared.
    pub fn authors(&self) -> Option<&str> {
        self.authors.as_deref()
    }

    /// Description attribute, when declared.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The declared `[[files]]` entries.
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Expands the file list into absolute source paths.
    ///
    /// Glob patterns expand to every existing match (lexicographic order);
    /// literal entries are returned whether or not the file exists yet,
    /// since they may be build outputs that have not been produced.
    pub fn file_sources(&self) -> Result<Vec<PathBuf>> {
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut sources = Vec::new();
        for entry in &self.files {
            let anchored = base.join(&entry.src);
            if entry.src.contains(['*', '?', '[']) {
                let pattern = anchored.to_string_lossy().into_owned();
                let matches = glob::glob(&pattern).map_err(|e| {
                    BinderyError::ManifestValidationError {
                        file: self.path.display().to_string(),
                        reason: format!("invalid file pattern '{}': {e}", entry.src),
                    }
                })?;
                for matched in matches.flatten() {
                    sources.push(matched);
                }
            } else {
                sources.push(anchored);
            }
        }
        Ok(sources)
    }

    /// File name of the package this spec produces.
    ///
    /// `versioned` controls whether the version participates in the name
    /// (`acme.core.1.2.3.4.bpkg` vs `acme.core.bpkg`).
    pub fn package_file_name(id: &str, version: &Version, versioned: bool) -> String {
        if versioned {
            format!("{id}.{version}.{PACKAGE_EXTENSION}")
        } else {
            format!("{id}.{PACKAGE_EXTENSION}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_spec(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_spec() {
        let dir = TempDir::new().unwrap();
        let path = write_spec(
            &dir,
            "acme.pkgspec.toml",
            r#"
[package]
id = "Acme.Core"
version = "1.2"
authors = "Acme Corp"
description = "Core runtime"

[[files]]
src = "out/acme_core.so"
target = "lib"
"#,
        );
        let spec = PackageSpec::load(&path).unwrap();
        assert_eq!(spec.raw_id(), "Acme.Core");
        assert_eq!(spec.declared_version(), Version::new(1, 2, 0, 0));
        assert_eq!(spec.authors(), Some("Acme Corp"));
        assert_eq!(spec.files().len(), 1);
    }

    #[test]
    fn test_version_placeholder_is_unset() {
        let dir = TempDir::new().unwrap();
        let path = write_spec(
            &dir,
            "p.pkgspec.toml",
            "[package]\nid = \"P\"\nversion = \"$version$\"\n",
        );
        let spec = PackageSpec::load(&path).unwrap();
        assert!(spec.declared_version().nonzero().is_none());
    }

    #[test]
    fn test_id_placeholder_detected() {
        let dir = TempDir::new().unwrap();
        let path = write_spec(
            &dir,
            "p.pkgspec.toml",
            "[package]\nid = \"$id$\"\nversion = \"1.0\"\n",
        );
        assert!(PackageSpec::load(&path).unwrap().id_is_placeholder());
    }

    #[test]
    fn test_malformed_spec_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_spec(&dir, "bad.pkgspec.toml", "[package\nid = oops");
        let err = PackageSpec::load(&path).unwrap_err();
        assert!(matches!(err, BinderyError::ManifestParseError { .. }));
    }

    #[test]
    fn test_invalid_version_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let path = write_spec(
            &dir,
            "bad.pkgspec.toml",
            "[package]\nid = \"P\"\nversion = \"one.two\"\n",
        );
        let err = PackageSpec::load(&path).unwrap_err();
        assert!(matches!(err, BinderyError::ManifestValidationError { .. }));
    }

    #[test]
    fn test_file_sources_expand_globs_and_keep_literals() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/a.so"), b"x").unwrap();
        std::fs::write(dir.path().join("out/b.so"), b"x").unwrap();
        let path = write_spec(
            &dir,
            "p.pkgspec.toml",
            r#"
[package]
id = "P"
version = "1.0"

[[files]]
src = "out/*.so"
target = "lib"

[[files]]
src = "out/future.so"
target = "lib"
"#,
        );
        let sources = PackageSpec::load(&path).unwrap().file_sources().unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0], dir.path().join("out/a.so"));
        assert_eq!(sources[1], dir.path().join("out/b.so"));
        // Literal entries survive even when the file does not exist yet.
        assert_eq!(sources[2], dir.path().join("out/future.so"));
    }

    #[test]
    fn test_package_file_name() {
        let version = Version::parse("1.2.3.4").unwrap();
        assert_eq!(
            PackageSpec::package_file_name("acme.core", &version, true),
            "acme.core.1.2.3.4.bpkg"
        );
        assert_eq!(
            PackageSpec::package_file_name("acme.core", &version, false),
            "acme.core.bpkg"
        );
    }
}
