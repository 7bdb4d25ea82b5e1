//! Error handling for bindery.
//!
//! The engine signals strongly-typed errors and performs no user-facing I/O;
//! presenting failures (console output, exit codes) belongs to the build
//! front end driving the engine. Two classes of condition exist:
//!
//! - **Surfaced errors** ([`BinderyError`]) indicate a configuration or input
//!   defect the caller must deal with: a malformed manifest, an unreadable
//!   project descriptor, a broken counter store during auto-versioning.
//! - **Degradations** are recovered locally and never become errors: an
//!   artifact whose identity cannot be read, a missing package repository, a
//!   reference cycle. The engine falls back to conservative defaults (keep
//!   more dependencies, not fewer) and records the event via [`tracing`].
//!
//! Standard conversions are provided for [`std::io::Error`],
//! [`toml::de::Error`] and [`serde_json::Error`] so callers can use `?`
//! freely at the file-handling seams.

use thiserror::Error;

/// The main error type for bindery operations.
///
/// Each variant represents a specific failure mode with enough context
/// (paths, offending values, reasons) for the front end to render an
/// actionable message.
#[derive(Error, Debug)]
pub enum BinderyError {
    /// An artifact file exists but could not be loaded into a scope.
    ///
    /// Callers treat this as "no identity available" and fall through to
    /// other strategies; it aborts nothing on its own.
    #[error("Failed to read artifact '{path}': {reason}")]
    ArtifactUnreadable {
        /// Path of the artifact that could not be read
        path: String,
        /// Underlying reason (I/O failure, truncated file)
        reason: String,
    },

    /// A file was loaded but is not a recognized build artifact.
    ///
    /// Covers corrupt files, wrong formats, and in-progress writes. Like
    /// [`ArtifactUnreadable`](Self::ArtifactUnreadable), this is recovered
    /// locally by treating the identity as absent.
    #[error("'{path}' is not a recognized build artifact")]
    NotAnArtifact {
        /// Path of the rejected file
        path: String,
    },

    /// A package-reference manifest or package spec failed to parse.
    ///
    /// Not recovered: dependency data is foundational to package
    /// correctness, so a malformed manifest fails the whole collection.
    #[error("Invalid manifest syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A manifest parsed but its content is invalid.
    #[error("Manifest validation failed for {file}: {reason}")]
    ManifestValidationError {
        /// Path to the offending manifest
        file: String,
        /// Reason validation failed
        reason: String,
    },

    /// A project descriptor failed to parse.
    #[error("Invalid project descriptor in {file}")]
    ProjectParseError {
        /// Path to the project file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A referenced project file does not exist or could not be loaded.
    #[error("Project not found: {path}")]
    ProjectNotFound {
        /// Path that failed to resolve to a project
        path: String,
    },

    /// A version string could not be parsed.
    ///
    /// Versions are 4-component (`major.minor.build.revision`); at least
    /// major and minor must be present.
    #[error("Invalid version: {value}")]
    InvalidVersion {
        /// The offending version string
        value: String,
    },

    /// A version constraint string could not be parsed.
    #[error("Invalid version constraint: {constraint}")]
    InvalidVersionConstraint {
        /// The offending constraint string
        constraint: String,
    },

    /// An unrecognized version-source policy token.
    ///
    /// Valid tokens are `manual`, `library` and `auto` (case-insensitive).
    #[error("Invalid version source: {value}")]
    InvalidVersionSource {
        /// The offending policy token
        value: String,
    },

    /// The persisted build-number store could not be read or written.
    ///
    /// Fatal for auto-versioning only; other version policies never touch
    /// the store.
    #[error("Build counter store failure for '{key}': {reason}")]
    CounterStoreError {
        /// Project name whose counter was being accessed
        key: String,
        /// Underlying reason
        reason: String,
    },

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error wrapper.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error wrapper.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Convenience alias used throughout the engine's public API.
pub type Result<T> = std::result::Result<T, BinderyError>;
