//! Version handling for bindery packages and build outputs.
//!
//! Versions here are 4-component (`major.minor.build.revision`), matching
//! what build toolchains stamp into artifacts, not 3-component semver. Two
//! rules shape everything in this module:
//!
//! - At least `major.minor` must be present; missing trailing components
//!   are zero. Parsing preserves how many components were written so that
//!   a manually declared `"2.3.0.0"` round-trips exactly.
//! - An all-zero version means "no information". Build tools commonly
//!   leave an unset version as `0.0.0.0` rather than omitting it, so the
//!   engine never treats a present-but-zero version as meaningful; see
//!   [`Version::nonzero`].
//!
//! Submodules:
//! - [`constraints`] - interval-style version constraints (`"1.2"`,
//!   `"[1.2,2.0)"`) used for declared package dependencies
//! - [`source`] - the three output-version policies (manual, library, auto)
//! - [`build_counter`] - the persisted per-project build number store
//!   backing the auto policy

pub mod build_counter;
pub mod constraints;
pub mod source;

pub use build_counter::{CounterStore, FsCounterStore};
pub use constraints::VersionConstraint;
pub use source::{VersionContext, VersionResolver, VersionSource};

use crate::core::{BinderyError, Result};
use serde::de::Error as _;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A 4-component package/artifact version.
///
/// Equality, ordering and hashing consider only the numeric components, so
/// `1.2` and `1.2.0.0` compare equal; display preserves the precision the
/// version was written with.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    parts: [u64; 4],
    /// Number of components originally specified (2..=4).
    precision: u8,
}

impl Version {
    /// Creates a full 4-component version.
    pub const fn new(major: u64, minor: u64, build: u64, revision: u64) -> Self {
        Self {
            parts: [major, minor, build, revision],
            precision: 4,
        }
    }

    /// The all-zero "no information" version.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parses a version string with 2 to 4 dot-separated numeric components.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || BinderyError::InvalidVersion {
            value: value.to_string(),
        };
        let components: Vec<&str> = value.trim().split('.').collect();
        if components.len() < 2 || components.len() > 4 {
            return Err(invalid());
        }
        let mut parts = [0u64; 4];
        for (i, component) in components.iter().enumerate() {
            parts[i] = component.parse().map_err(|_| invalid())?;
        }
        Ok(Self {
            parts,
            precision: components.len() as u8,
        })
    }

    /// Major component.
    pub const fn major(&self) -> u64 {
        self.parts[0]
    }

    /// Minor component.
    pub const fn minor(&self) -> u64 {
        self.parts[1]
    }

    /// Build component.
    pub const fn build(&self) -> u64 {
        self.parts[2]
    }

    /// Revision component.
    pub const fn revision(&self) -> u64 {
        self.parts[3]
    }

    /// Whether every component is zero.
    pub fn is_zero(&self) -> bool {
        self.parts == [0, 0, 0, 0]
    }

    /// Normalizes the "unset" sentinel: returns `None` for an all-zero
    /// version, `Some(self)` otherwise.
    pub fn nonzero(self) -> Option<Self> {
        if self.is_zero() { None } else { Some(self) }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.precision.max(2) as usize;
        let rendered: Vec<String> = self.parts[..shown].iter().map(u64::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

impl FromStr for Version {
    type Err = BinderyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl serde::Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|e| D::Error::custom(e.to_string()))
    }
}
