//! Integration test suite.
//!
//! End-to-end planner scenarios over real temp-dir workspaces: project
//! descriptors, reference manifests, a local package repository and
//! stamped artifacts, all flowing through `PackagePlanner`.

mod planner_tests;
mod versioning_tests;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs an env-filtered subscriber once so `RUST_LOG`-driven
/// debugging works inside the suite.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
