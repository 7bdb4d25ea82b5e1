//! Scoped artifact loading and the embedded-identity format reader.
//!
//! Artifact files may be rebuilt at any moment, so the reader must not map
//! the file or keep a handle open past the read. [`LoadScope`] copies the
//! whole file into an owned buffer inside an isolated scope, answers
//! identity queries from that buffer, and releases everything on drop -
//! including every failure path, since teardown is tied to the value's
//! lifetime rather than to explicit cleanup calls. Concurrent scopes share
//! no mutable state; a monotonic scope index exists only for tracing.
//!
//! The shipped format ([`EmbeddedIdentityProbe`]) looks for a
//! marker-delimited JSON payload the build tooling embeds in the binary:
//!
//! ```text
//! \0BINDERY:IDENT\0{"name":"acme-core","version":"1.4.0.0",...}\0
//! ```
//!
//! Other formats implement [`IdentityProbe`] and plug into the same cache.

use crate::core::BinderyError;
use crate::metadata::ArtifactIdentity;
use crate::version::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Marker preceding the embedded identity payload.
const IDENTITY_MARKER: &[u8] = b"\0BINDERY:IDENT\0";

static SCOPE_INDEX: AtomicU64 = AtomicU64::new(0);

/// Why an identity read failed.
///
/// Cloneable so the metadata cache can memoize failures alongside
/// successes; callers convert to [`BinderyError`] with the path attached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The file loaded but is not a recognized artifact (corrupt, wrong
    /// format, or an in-progress write).
    #[error("not a recognized build artifact")]
    NotAnArtifact,
    /// The file could not be read at all.
    #[error("read failure: {0}")]
    ReadFailure(String),
}

impl ProbeFailure {
    /// Attaches the artifact path, producing the engine-level error.
    pub fn into_error(self, path: &Path) -> BinderyError {
        match self {
            Self::NotAnArtifact => BinderyError::NotAnArtifact {
                path: path.display().to_string(),
            },
            Self::ReadFailure(reason) => BinderyError::ArtifactUnreadable {
                path: path.display().to_string(),
                reason,
            },
        }
    }
}

/// Capability interface for reading identity out of one artifact format.
///
/// Implementations must be safe to call concurrently for different paths;
/// each call is expected to block on I/O, so the cache dispatches them on
/// the blocking thread pool.
pub trait IdentityProbe: Send + Sync {
    /// Reads the identity attributes of the artifact at `path`.
    fn read_identity(&self, path: &Path) -> Result<ArtifactIdentity, ProbeFailure>;
}

/// An isolated, disposable load of one artifact's bytes.
///
/// The entire file is copied into the scope's buffer; no handle or mapping
/// survives [`LoadScope::load`] returning. Dropping the scope releases the
/// loaded state, so repeated reads against a changing file are safe.
pub struct LoadScope {
    path: PathBuf,
    bytes: Vec<u8>,
    index: u64,
}

impl LoadScope {
    /// Loads the file at `path` into a fresh scope.
    pub fn load(path: &Path) -> Result<Self, ProbeFailure> {
        let index = SCOPE_INDEX.fetch_add(1, Ordering::Relaxed);
        let bytes =
            std::fs::read(path).map_err(|e| ProbeFailure::ReadFailure(e.to_string()))?;
        tracing::trace!(
            scope = index,
            path = %path.display(),
            size = bytes.len(),
            "artifact load scope created"
        );
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            index,
        })
    }

    /// Extracts the embedded identity payload from the loaded bytes.
    pub fn identity(&self) -> Result<ArtifactIdentity, ProbeFailure> {
        let start = find(&self.bytes, IDENTITY_MARKER).ok_or(ProbeFailure::NotAnArtifact)?;
        let payload_start = start + IDENTITY_MARKER.len();
        let payload_end = self.bytes[payload_start..]
            .iter()
            .position(|&b| b == 0)
            .map(|offset| payload_start + offset)
            .ok_or(ProbeFailure::NotAnArtifact)?;

        let payload: IdentityPayload =
            serde_json::from_slice(&self.bytes[payload_start..payload_end])
                .map_err(|_| ProbeFailure::NotAnArtifact)?;

        let version = match payload.version.as_deref() {
            Some(raw) => match Version::parse(raw) {
                // All-zero means the build left the version unset.
                Ok(version) => version.nonzero(),
                Err(_) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        version = raw,
                        "ignoring unparseable artifact version"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(ArtifactIdentity {
            name: payload.name,
            version,
            company: payload.company,
            description: payload.description,
        })
    }
}

impl Drop for LoadScope {
    fn drop(&mut self) {
        tracing::trace!(
            scope = self.index,
            path = %self.path.display(),
            "artifact load scope released"
        );
    }
}

/// Identity payload as embedded by the build tooling.
#[derive(Debug, Deserialize)]
struct IdentityPayload {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// The production probe for artifacts carrying an embedded identity
/// payload.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedIdentityProbe;

impl IdentityProbe for EmbeddedIdentityProbe {
    fn read_identity(&self, path: &Path) -> Result<ArtifactIdentity, ProbeFailure> {
        // Scope drops on every exit path, releasing the loaded bytes even
        // when the identity query fails.
        let scope = LoadScope::load(path)?;
        scope.identity()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Serializes an identity payload in the embedded wire form.
///
/// The build tooling that stamps artifacts owns this in production; it
/// lives here so fixtures and tests produce byte-exact artifacts.
pub fn encode_identity(
    name: &str,
    version: Option<&str>,
    company: Option<&str>,
    description: Option<&str>,
) -> Vec<u8> {
    let payload = serde_json::json!({
        "name": name,
        "version": version,
        "company": company,
        "description": description,
    });
    let mut encoded = IDENTITY_MARKER.to_vec();
    encoded.extend_from_slice(payload.to_string().as_bytes());
    encoded.push(0);
    encoded
}
