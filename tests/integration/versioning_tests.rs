//! Version policy behavior through the planner, including the persisted
//! auto counter.

use bindery::metadata::MetadataCache;
use bindery::project::{FsProjectProvider, StaticAssemblyIndex, TargetFramework};
use bindery::resolver::{PackagePlanner, PlanOptions};
use bindery::test_utils::{write_artifact, write_file};
use bindery::version::{FsCounterStore, VersionSource};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn scaffold_project(root: &Path) {
    write_file(root, "tool/tool.bproj.toml", "[project]\nlanguage = \"csharp\"\n");
    write_file(
        root,
        "tool/tool.pkgspec.toml",
        "[package]\nid = \"Acme.Tool\"\nversion = \"2.5.0.7\"\n",
    );
    write_artifact(&root.join("tool/out/acme_tool.dll"), "AcmeTool", Some("4.0.1.0"));
}

fn planner(output_dir: &Path) -> PackagePlanner {
    PackagePlanner::new(
        Arc::new(FsProjectProvider::new()),
        None,
        Arc::new(StaticAssemblyIndex::empty()),
        Arc::new(MetadataCache::with_embedded_probe()),
        Arc::new(FsCounterStore::new(output_dir)),
    )
}

fn options(root: &Path, output_dir: &Path, source: VersionSource, build: u32) -> PlanOptions {
    PlanOptions {
        spec_path: root.join("tool/tool.pkgspec.toml"),
        project_path: root.join("tool/tool.bproj.toml"),
        framework_hint: TargetFramework::new(".NETFramework,Version=v4.5"),
        version_source: source,
        build_number: build,
        versioned_file_name: false,
        output_dir: output_dir.to_path_buf(),
        reference_artifacts: vec![root.join("tool/out/acme_tool.dll")],
        recursive: true,
    }
}

/// Manual wins over every artifact version in sight.
#[tokio::test]
async fn test_manual_version_precedence() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_project(root);
    let out = root.join("out");

    let plan = planner(&out)
        .plan(&options(root, &out, VersionSource::Manual, 0))
        .await
        .unwrap();
    assert_eq!(plan.version.to_string(), "2.5.0.7");
    // Unversioned file name requested.
    assert_eq!(plan.package_path, out.join("Acme.Tool.bpkg"));
}

#[tokio::test]
async fn test_library_version_from_artifact() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_project(root);
    let out = root.join("out");

    let plan = planner(&out)
        .plan(&options(root, &out, VersionSource::Library, 0))
        .await
        .unwrap();
    assert_eq!(plan.version.to_string(), "4.0.1.0");
}

/// Two planner runs (separate engine instances, same output directory)
/// issue strictly increasing build numbers and keep manifest
/// major/minor/revision.
#[tokio::test]
async fn test_auto_counter_monotonic_across_planner_runs() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_project(root);
    let out = root.join("out");

    let first = planner(&out)
        .plan(&options(root, &out, VersionSource::Auto, 0))
        .await
        .unwrap();
    let second = planner(&out)
        .plan(&options(root, &out, VersionSource::Auto, 0))
        .await
        .unwrap();

    assert_eq!(first.version.to_string(), "2.5.1.7");
    assert_eq!(second.version.to_string(), "2.5.2.7");

    // The persisted counter is keyed by project name in the output dir.
    let counter = std::fs::read_to_string(out.join("tool.build.number")).unwrap();
    assert_eq!(counter, "2");
}

/// Re-planning the same project within one run reuses the issued build
/// number instead of incrementing again.
#[tokio::test]
async fn test_auto_counter_single_increment_per_run() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_project(root);
    let out = root.join("out");

    let engine = planner(&out);
    let first = engine.plan(&options(root, &out, VersionSource::Auto, 0)).await.unwrap();
    let second = engine.plan(&options(root, &out, VersionSource::Auto, 0)).await.unwrap();

    assert_eq!(first.version, second.version);
    let counter = std::fs::read_to_string(out.join("tool.build.number")).unwrap();
    assert_eq!(counter, "1");
}

/// An externally supplied build number bypasses the counter entirely.
#[tokio::test]
async fn test_auto_with_external_build_number() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_project(root);
    let out = root.join("out");

    let plan = planner(&out)
        .plan(&options(root, &out, VersionSource::Auto, 77))
        .await
        .unwrap();
    assert_eq!(plan.version.to_string(), "2.5.77.7");
    assert!(!out.join("tool.build.number").exists());
}
