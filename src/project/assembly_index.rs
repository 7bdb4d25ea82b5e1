//! Platform assembly index - the "is this assembly system-provided?"
//! oracle.
//!
//! An assembly reference with no copy-local marker becomes a framework
//! dependency only if the platform's shared assembly store knows it;
//! otherwise it is assumed to be a loose build input and ignored. The
//! engine only needs a membership test, so the store is a one-method
//! trait with a directory-backed implementation for real machines and a
//! static set for tests.

use std::collections::HashSet;
use std::path::PathBuf;

/// Membership test against the platform's shared assembly store.
pub trait SystemAssemblyIndex: Send + Sync {
    /// Whether an assembly named `name` is platform-provided.
    fn contains(&self, name: &str) -> bool;
}

/// Index backed by a directory of platform assemblies
/// (`<dir>/<name>.dll`, matched case-insensitively).
pub struct FsAssemblyIndex {
    dir: PathBuf,
}

impl FsAssemblyIndex {
    /// Creates an index over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SystemAssemblyIndex for FsAssemblyIndex {
    fn contains(&self, name: &str) -> bool {
        let wanted = format!("{}.dll", name.to_lowercase());
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .any(|entry| entry.file_name().to_string_lossy().to_lowercase() == wanted)
            })
            .unwrap_or(false)
    }
}

/// Fixed-membership index, mainly for tests and hermetic builds.
pub struct StaticAssemblyIndex {
    names: HashSet<String>,
}

impl StaticAssemblyIndex {
    /// Builds the index from an iterator of assembly names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(|n| n.into().to_lowercase()).collect(),
        }
    }

    /// An index that knows nothing.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl SystemAssemblyIndex for StaticAssemblyIndex {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }
}
