//! Version constraint parsing and matching for declared dependencies.
//!
//! Constraints use interval notation over 4-component versions:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `1.2` | floor: any version >= 1.2 |
//! | `[1.2]` | exactly 1.2 |
//! | `[1.2,2.0)` | >= 1.2 and < 2.0 |
//! | `(1.2,)` | > 1.2 |
//! | `(,2.0]` | <= 2.0 |
//!
//! A bare version is the most common form and is what the engine
//! synthesizes as the default constraint for a package resolved without an
//! explicit `constraint` entry in the reference manifest.

use crate::core::{BinderyError, Result};
use crate::version::Version;
use serde::de::Error as _;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// An interval constraint over package versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    min: Option<Version>,
    min_inclusive: bool,
    max: Option<Version>,
    max_inclusive: bool,
}

impl VersionConstraint {
    /// Floor constraint: any version greater than or equal to `version`.
    ///
    /// This is the default constraint derived from a resolved package
    /// version when the reference manifest declares none.
    pub fn at_least(version: Version) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// Exact-version constraint.
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// Parses interval notation; see the module docs for the syntax table.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || BinderyError::InvalidVersionConstraint {
            constraint: input.to_string(),
        };
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let open = trimmed.starts_with('[') || trimmed.starts_with('(');
        let close = trimmed.ends_with(']') || trimmed.ends_with(')');
        if !open && !close {
            // Bare version: floor semantics.
            return Ok(Self::at_least(Version::parse(trimmed)?));
        }
        if !(open && close) {
            return Err(invalid());
        }

        let min_inclusive = trimmed.starts_with('[');
        let max_inclusive = trimmed.ends_with(']');
        let inner = &trimmed[1..trimmed.len() - 1];

        let (min_raw, max_raw) = match inner.split_once(',') {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            // "[1.2]" - a single pinned version requires inclusive brackets.
            None => {
                if !(min_inclusive && max_inclusive) {
                    return Err(invalid());
                }
                let version = Version::parse(inner.trim())?;
                return Ok(Self::exact(version));
            }
        };

        let min = if min_raw.is_empty() { None } else { Some(Version::parse(min_raw)?) };
        let max = if max_raw.is_empty() { None } else { Some(Version::parse(max_raw)?) };
        if min.is_none() && max.is_none() {
            return Err(invalid());
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            let empty = lo > hi || (lo == hi && !(min_inclusive && max_inclusive));
            if empty {
                return Err(invalid());
            }
        }

        Ok(Self {
            min,
            min_inclusive,
            max,
            max_inclusive,
        })
    }

    /// Whether `version` falls inside this interval.
    pub fn satisfied_by(&self, version: &Version) -> bool {
        if let Some(ref min) = self.min {
            let ok = if self.min_inclusive { version >= min } else { version > min };
            if !ok {
                return false;
            }
        }
        if let Some(ref max) = self.max {
            let ok = if self.max_inclusive { version <= max } else { version < max };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Whether this constraint pins a single version.
    pub fn is_exact(&self) -> bool {
        self.min_inclusive
            && self.max_inclusive
            && matches!((self.min, self.max), (Some(lo), Some(hi)) if lo == hi)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            return write!(f, "[{}]", self.min.as_ref().unwrap());
        }
        // Bare floor renders without brackets, matching the common input form.
        if self.min_inclusive && self.max.is_none() {
            if let Some(ref min) = self.min {
                return write!(f, "{min}");
            }
        }
        let lo = if self.min_inclusive { '[' } else { '(' };
        let hi = if self.max_inclusive { ']' } else { ')' };
        let min = self.min.map(|v| v.to_string()).unwrap_or_default();
        let max = self.max.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{lo}{min},{max}{hi}")
    }
}

impl FromStr for VersionConstraint {
    type Err = BinderyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl serde::Serialize for VersionConstraint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for VersionConstraint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|e| D::Error::custom(e.to_string()))
    }
}
