//! End-to-end packaging plans over a realistic workspace.

use bindery::core::BinderyError;
use bindery::metadata::MetadataCache;
use bindery::project::{FsProjectProvider, StaticAssemblyIndex, TargetFramework};
use bindery::repository::{locate_repository, LocalPackageRepository};
use bindery::resolver::{PackagePlanner, PlanOptions};
use bindery::test_utils::{write_artifact, write_file};
use bindery::version::{FsCounterStore, VersionSource};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn hint() -> TargetFramework {
    TargetFramework::new(".NETFramework,Version=v4.5")
}

/// Lays out a workspace with an app project referencing a library
/// project, a local package repository, and a stamped build artifact.
fn scaffold_workspace(root: &Path) {
    write_file(root, "workspace.toml", "");

    // Local package repository: Acme.Util pulls in Acme.Base.
    write_file(
        root,
        "packages/acme.util.1.2.bpkg.toml",
        r#"
[package]
id = "Acme.Util"
version = "1.2"

[[dependencies]]
id = "Acme.Base"
constraint = "1.0"
"#,
    );
    write_file(
        root,
        "packages/acme.base.1.0.bpkg.toml",
        "[package]\nid = \"Acme.Base\"\nversion = \"1.0\"\n",
    );

    // App project, its packaged spec and its references.
    write_file(
        root,
        "app/app.bproj.toml",
        r#"
[project]
language = "csharp"
references = ["../lib/lib.bproj.toml"]

[[assemblies]]
name = "System.Web"
copy_local = false

[[assemblies]]
name = "System"
"#,
    );
    write_file(
        root,
        "app/packages.toml",
        "[[packages]]\nid = \"Acme.Util\"\nversion = \"1.2\"\n",
    );
    write_file(
        root,
        "app/app.pkgspec.toml",
        r#"
[package]
id = "$id$"
version = "$version$"

[[files]]
src = "out/*.dll"
target = "lib"
"#,
    );
    write_artifact(&root.join("app/out/app_core.dll"), "AppCore", Some("3.1.0.0"));

    // Referenced library project bringing the transitively-implied
    // package.
    write_file(root, "lib/lib.bproj.toml", "[project]\nlanguage = \"csharp\"\n");
    write_file(
        root,
        "lib/packages.toml",
        "[[packages]]\nid = \"Acme.Base\"\nversion = \"1.0\"\n",
    );
}

fn planner_for(root: &Path, output_dir: &Path) -> PackagePlanner {
    let repository = locate_repository(&root.join("app"))
        .map(|dir| LocalPackageRepository::open(&dir).unwrap())
        .map(|repo| Arc::new(repo) as Arc<dyn bindery::repository::PackageRepository>);
    PackagePlanner::new(
        Arc::new(FsProjectProvider::new()),
        repository,
        Arc::new(StaticAssemblyIndex::empty()),
        Arc::new(MetadataCache::with_embedded_probe()),
        Arc::new(FsCounterStore::new(output_dir)),
    )
}

fn options(root: &Path, output_dir: &Path) -> PlanOptions {
    PlanOptions {
        spec_path: root.join("app/app.pkgspec.toml"),
        project_path: root.join("app/app.bproj.toml"),
        framework_hint: hint(),
        version_source: VersionSource::Library,
        build_number: 0,
        versioned_file_name: true,
        output_dir: output_dir.to_path_buf(),
        reference_artifacts: vec![root.join("app/out/app_core.dll")],
        recursive: true,
    }
}

/// The full pipeline: placeholder id from the artifact, library version,
/// minimal dependency set, assembly filtering, source/target lists.
#[tokio::test]
async fn test_plan_full_pipeline() -> anyhow::Result<()> {
    crate::init_tracing();
    let workspace = TempDir::new()?;
    let root = workspace.path();
    scaffold_workspace(root);
    let output_dir = root.join("app/out");

    let planner = planner_for(root, &output_dir);
    let plan = planner.plan(&options(root, &output_dir)).await?;

    // $id$ resolved from the referenced artifact's identity.
    assert_eq!(plan.package_id, "AppCore");
    // Library policy took the artifact's product version.
    assert_eq!(plan.version.to_string(), "3.1.0.0");
    assert_eq!(plan.package_path, output_dir.join("AppCore.3.1.0.0.bpkg"));
    assert_eq!(plan.targets, vec![plan.package_path.clone()]);

    // One framework bucket (everything inherited the hint).
    assert_eq!(plan.dependencies.len(), 1);
    let bucket = plan.dependencies.get(&hint()).unwrap();

    // Acme.Base came in through the library project but is implied by
    // Acme.Util, so the minimal set declares only Acme.Util.
    let ids: Vec<_> = bucket.packages.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["Acme.Util"]);

    // "System" is baseline; the pinned platform assembly survives.
    assert_eq!(bucket.framework_assemblies, vec!["System.Web".to_string()]);

    // Sources: spec, referenced artifact, then the expanded file list
    // (which re-lists the artifact, matched by the glob).
    assert_eq!(plan.sources[0], root.join("app/app.pkgspec.toml"));
    assert_eq!(plan.sources[1], root.join("app/out/app_core.dll"));
    assert!(plan.sources[2..].contains(&root.join("app/out/app_core.dll")));
    Ok(())
}

/// Without the local repository the engine keeps every candidate - the
/// conservative degradation - and still produces a plan.
#[tokio::test]
async fn test_plan_without_repository_keeps_all_candidates() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_workspace(root);
    // Wipe the package store so discovery fails.
    std::fs::remove_dir_all(root.join("packages")).unwrap();
    let output_dir = root.join("app/out");

    let planner = planner_for(root, &output_dir);
    let plan = planner.plan(&options(root, &output_dir)).await.unwrap();

    let bucket = plan.dependencies.get(&hint()).unwrap();
    let ids: Vec<_> = bucket.packages.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["Acme.Util", "Acme.Base"]);
}

/// A malformed reference manifest fails that spec's plan; the same
/// planner still serves other specs.
#[tokio::test]
async fn test_failure_isolated_per_spec() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_workspace(root);
    let output_dir = root.join("app/out");

    // A second, broken project/spec pair.
    write_file(
        root,
        "broken/broken.bproj.toml",
        "[project]\nlanguage = \"csharp\"\n",
    );
    write_file(root, "broken/packages.toml", "[[packages]]\nid = 42\n");
    write_file(
        root,
        "broken/broken.pkgspec.toml",
        "[package]\nid = \"Broken\"\nversion = \"1.0\"\n",
    );

    let planner = planner_for(root, &output_dir);

    let broken = planner
        .plan(&PlanOptions {
            spec_path: root.join("broken/broken.pkgspec.toml"),
            project_path: root.join("broken/broken.bproj.toml"),
            reference_artifacts: Vec::new(),
            ..options(root, &output_dir)
        })
        .await;
    assert!(matches!(broken, Err(BinderyError::ManifestParseError { .. })));

    // The healthy spec still plans with the same planner instance.
    assert!(planner.plan(&options(root, &output_dir)).await.is_ok());
}

/// Unreadable artifacts degrade placeholder resolution to the raw id and
/// the library policy to the manifest version.
#[tokio::test]
async fn test_unreadable_artifact_degrades_gracefully() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_workspace(root);
    let output_dir = root.join("app/out");

    // Replace the artifact with bytes carrying no identity payload.
    std::fs::write(root.join("app/out/app_core.dll"), b"garbage").unwrap();

    let planner = planner_for(root, &output_dir);
    let plan = planner.plan(&options(root, &output_dir)).await.unwrap();

    assert_eq!(plan.package_id, "$id$");
    // $version$ parsed as the zero version; library scan found nothing.
    assert!(plan.version.nonzero().is_none());
}

/// Projects declaring their own framework contribute to their own
/// dependency bucket end to end.
#[tokio::test]
async fn test_multi_framework_buckets() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();
    scaffold_workspace(root);
    let output_dir = root.join("app/out");

    write_file(
        root,
        "legacy/legacy.bproj.toml",
        "[project]\nlanguage = \"csharp\"\nframework = \".NETFramework,Version=v4.0\"\n",
    );
    write_file(
        root,
        "legacy/packages.toml",
        "[[packages]]\nid = \"Legacy.Compat\"\nversion = \"0.9\"\n",
    );
    // Wire the legacy project into the app's reference list.
    write_file(
        root,
        "app/app.bproj.toml",
        r#"
[project]
language = "csharp"
references = ["../lib/lib.bproj.toml", "../legacy/legacy.bproj.toml"]
"#,
    );

    let planner = planner_for(root, &output_dir);
    let plan = planner.plan(&options(root, &output_dir)).await.unwrap();

    assert_eq!(plan.dependencies.len(), 2);
    let legacy = plan
        .dependencies
        .get(&TargetFramework::new(".netframework,version=v4.0"))
        .unwrap();
    let ids: Vec<_> = legacy.packages.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["Legacy.Compat"]);
}
