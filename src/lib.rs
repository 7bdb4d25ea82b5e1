//! Bindery - build-output packaging engine
//!
//! Bindery decides what a distributable package built from a tree of
//! interdependent projects must declare: which package dependencies are
//! explicit, which framework assemblies are referenced, and what version
//! the output carries. It is the resolution core behind a packaging front
//! end - the front end enumerates specs and invokes the engine, an
//! external archive writer serializes the result.
//!
//! # Architecture Overview
//!
//! One run flows through a fixed pipeline:
//! 1. The [`resolver::project_graph`] walker traverses the root project's
//!    reference edges depth-first, visiting each project once in
//!    declaration order.
//! 2. The [`resolver::collector`] fills per-framework buckets with
//!    framework assembly references and package candidates, consulting
//!    the [`repository`] collaborator for each candidate's own dependency
//!    metadata.
//! 3. The [`resolver::minimal_set`] reducer removes every candidate that
//!    is transitively implied by another candidate.
//! 4. The [`version`] resolver computes the output version under the
//!    configured policy (manual, library-derived, or auto-counter).
//! 5. [`resolver::PackagePlanner`] assembles the result into a
//!    [`resolver::PackagePlan`].
//!
//! ## Key Properties
//!
//! - **Deterministic**: traversal and merging are declaration-ordered;
//!   the same inputs always produce the same plan.
//! - **Lock-free artifact reads**: identity queries load artifact bytes
//!   into disposable scopes ([`metadata`]), never holding a handle on a
//!   file another build step may be rewriting.
//! - **Conservative degradation**: a missing repository, an unreadable
//!   artifact or a dependency cycle keeps more dependencies explicit
//!   rather than failing the run; only malformed input manifests and a
//!   broken auto-version counter surface as errors ([`core::error`]).
//! - **Explicit collaborators**: the project graph, package store,
//!   platform assembly index and counter store are all injected traits -
//!   no global registries, no privileged lookups.
//!
//! # Core Modules
//!
//! - [`core`] - typed error surface
//! - [`manifest`] - package specs and package-reference manifests
//! - [`metadata`] - sandboxed artifact identity reads and the per-run
//!   coalescing cache
//! - [`project`] - project descriptors, provider seam, framework keys
//! - [`repository`] - package store collaborator and local
//!   implementations
//! - [`resolver`] - graph walker, dependency aggregation, minimal-set
//!   reduction, planning façade
//! - [`version`] - 4-component versions, constraints, version-source
//!   policies, build counter
//!
//! # Example
//!
//! ```rust,no_run
//! use bindery::metadata::MetadataCache;
//! use bindery::project::{FsProjectProvider, StaticAssemblyIndex, TargetFramework};
//! use bindery::resolver::{PackagePlanner, PlanOptions};
//! use bindery::version::{FsCounterStore, VersionSource};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn example() -> bindery::core::Result<()> {
//! let output_dir = PathBuf::from("build/out");
//! let planner = PackagePlanner::new(
//!     Arc::new(FsProjectProvider::new()),
//!     None, // no local package repository configured
//!     Arc::new(StaticAssemblyIndex::empty()),
//!     Arc::new(MetadataCache::with_embedded_probe()),
//!     Arc::new(FsCounterStore::new(&output_dir)),
//! );
//!
//! let plan = planner
//!     .plan(&PlanOptions {
//!         spec_path: PathBuf::from("acme/acme.pkgspec.toml"),
//!         project_path: PathBuf::from("acme/acme.bproj.toml"),
//!         framework_hint: TargetFramework::new(".NETFramework,Version=v4.5"),
//!         version_source: VersionSource::Manual,
//!         build_number: 0,
//!         versioned_file_name: true,
//!         output_dir,
//!         reference_artifacts: Vec::new(),
//!         recursive: true,
//!     })
//!     .await?;
//! println!("{} -> {}", plan.package_id, plan.package_path.display());
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod core;
pub mod manifest;
pub mod metadata;
pub mod project;
pub mod repository;
pub mod resolver;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
