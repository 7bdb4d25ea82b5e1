//! Artifact identity extraction for build outputs.
//!
//! Packaging needs to know what a compiled artifact calls itself - name,
//! version, company, description - without interfering with the build that
//! produced it. An artifact may be mid-rebuild or held open by another
//! process, so identity reads go through a scoped, disposable load
//! ([`probe::LoadScope`]) that never retains a handle or lock on the file,
//! and results are memoized per path for the duration of one run
//! ([`cache::MetadataCache`]).
//!
//! The engine depends only on the [`probe::IdentityProbe`] capability
//! interface; [`probe::EmbeddedIdentityProbe`] is the shipped format reader.

pub mod cache;
pub mod probe;

pub use cache::MetadataCache;
pub use probe::{EmbeddedIdentityProbe, IdentityProbe, LoadScope, ProbeFailure};

use crate::version::Version;

/// Identity attributes read out of a single build artifact.
///
/// Produced once per artifact path per run and shared behind an `Arc` by
/// the metadata cache. A version of `0.0.0.0` is normalized to `None` at
/// extraction time: build tools leave unset versions as all-zero, so a
/// present-but-zero version carries no information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIdentity {
    /// Simple name of the artifact (no path, no extension).
    pub name: String,
    /// Product version, absent when unset or all-zero.
    pub version: Option<Version>,
    /// Company/author attribute, when present.
    pub company: Option<String>,
    /// Description attribute, when present.
    pub description: Option<String>,
}
