//! Integration tests for the job orchestrator with a scripted invoker.

use burstline_core::{BuildTarget, BuildTargetSpec, EnvOverrides};
use burstline_pipeline::{
    BurstJob, EntryStatus, JobConfig, JobManifest, PipelineError, ScriptedInvoker,
};
use std::path::Path;
use std::sync::Arc;

fn job_config(dir: &Path, target: BuildTarget) -> JobConfig {
    JobConfig {
        target: BuildTargetSpec {
            target,
            development: false,
            output_path: dir.join("Builds/Game.exe"),
        },
        staging_area: dir.join("scratch"),
        compiler_home: dir.join("bcl"),
        env: EnvOverrides::none(),
    }
}

fn manifest_json(dir: &Path, names: &[&str]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "definition": { "name": name },
                "staging_paths": [dir.join("plugins").join(name)],
            })
        })
        .collect();
    serde_json::json!({
        "entries": entries,
        "library_dir": dir.join("library"),
        "product_name": "Game",
    })
}

fn load_manifest(value: serde_json::Value) -> JobManifest {
    JobManifest::from_json(&value.to_string()).expect("manifest parse failed")
}

/// Test: a supported entry compiles, collects, and stages its artifacts.
#[tokio::test]
async fn test_job_stages_compiled_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let manifest = load_manifest(manifest_json(dir.path(), &["Foo.Runtime"]));

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker.clone(),
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    let report = job.run(&manifest).await.expect("job failed");

    assert_eq!(report.entries.len(), 1, "One entry should be processed");
    assert_eq!(report.entries[0].status, EntryStatus::Staged);
    assert_eq!(report.entries[0].combinations, 1, "Windows is one combination");
    assert_eq!(invoker.request_count(), 1, "One invocation per combination");

    let destination = dir.path().join("plugins/Foo.Runtime");
    assert!(destination.join("Foo.Runtime_Burst.dll").is_file());
    assert!(destination.join("Foo.Runtime_Burst.pdb").is_file());
    assert!(destination.join("Foo.Runtime_Burst.txt").is_file());
    assert_eq!(
        report.staged_artifacts.len(),
        3,
        "Report should list every staged path"
    );

    let request = &invoker.recorded()[0];
    assert_eq!(request.combination.subdirectory, "x86_64");
    assert!(request.incremental, "Incremental switch is on by default");
    assert!(request
        .option_set
        .tokens
        .iter()
        .any(|t| t == "--platform=Windows"));
}

/// Test: one failing entry is reported but does not block the others.
#[tokio::test]
async fn test_failed_entry_does_not_block_others() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let manifest = load_manifest(manifest_json(dir.path(), &["Alpha.Runtime", "Zeta.Broken"]));

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    invoker.fail_for("Zeta.Broken");
    let job = BurstJob::new(
        invoker.clone(),
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    let report = job.run(&manifest).await.expect("job should still succeed");

    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].assembly, "Alpha.Runtime");
    assert_eq!(report.entries[0].status, EntryStatus::Staged);
    assert_eq!(report.entries[1].assembly, "Zeta.Broken");
    assert_eq!(report.entries[1].status, EntryStatus::Failed);
    assert!(
        report.entries[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("compilation failed")),
        "Failure should carry the compiler error"
    );

    // The surviving entry's artifacts were staged.
    assert!(dir
        .path()
        .join("plugins/Alpha.Runtime/Alpha.Runtime_Burst.dll")
        .is_file());
    assert!(!dir.path().join("plugins/Zeta.Broken").exists());
    assert!(report
        .staged_artifacts
        .iter()
        .all(|p| p.to_string_lossy().contains("Alpha.Runtime")));
}

/// Test: an unsupported target aborts the whole job before any invocation.
#[tokio::test]
async fn test_unsupported_target_aborts_before_any_invocation() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let mut json = manifest_json(dir.path(), &["Foo.Runtime"]);
    json["platforms"] = serde_json::json!({ "Windows": { "enabled": false } });
    let manifest = load_manifest(json);

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker.clone(),
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    let err = job.run(&manifest).await.unwrap_err();
    assert!(
        matches!(err, PipelineError::Core(_)),
        "Disabled platform should be a whole-job error"
    );
    assert_eq!(invoker.request_count(), 0, "No entry should compile");
}

/// Test: the kill switch behaves like an unsupported target.
#[tokio::test]
async fn test_global_kill_switch_aborts_job() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let mut json = manifest_json(dir.path(), &["Foo.Runtime"]);
    json["global"] = serde_json::json!({ "force_disable_compilation": true });
    let manifest = load_manifest(json);

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker.clone(),
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    assert!(job.run(&manifest).await.is_err());
    assert_eq!(invoker.request_count(), 0);
}

/// Test: when every entry fails the job itself is an error.
#[tokio::test]
async fn test_all_failed_entries_is_job_error() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let manifest = load_manifest(manifest_json(dir.path(), &["Only.Entry"]));

    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.fail_for("Only.Entry");
    let job = BurstJob::new(
        invoker,
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    let err = job.run(&manifest).await.unwrap_err();
    assert!(matches!(err, PipelineError::AllEntriesFailed { count: 1 }));
}

/// Test: an entry gated out by its platform list is skipped, not failed.
#[tokio::test]
async fn test_gated_entry_is_skipped_without_invocation() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let json = serde_json::json!({
        "entries": [{
            "definition": {
                "name": "Mobile.Only",
                "includePlatforms": ["Android"],
            },
            "staging_paths": [dir.path().join("plugins/Mobile.Only")],
        }],
        "library_dir": dir.path().join("library"),
    });
    let manifest = load_manifest(json);

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker.clone(),
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    let report = job.run(&manifest).await.expect("job failed");

    assert_eq!(report.entries[0].status, EntryStatus::Skipped);
    assert_eq!(invoker.request_count(), 0, "Gated entry never compiles");
    assert!(report.staged_artifacts.is_empty());
}

/// Test: re-running the same job converges to identical destinations.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let manifest = load_manifest(manifest_json(dir.path(), &["Foo.Runtime"]));
    let destination = dir.path().join("plugins/Foo.Runtime");

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker,
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    let first = job.run(&manifest).await.expect("first run failed");
    let listing = |dir: &Path| -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read_dir failed")
            .map(|e| e.expect("entry failed").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    };
    let first_listing = listing(&destination);
    let first_binary =
        std::fs::read(destination.join("Foo.Runtime_Burst.dll")).expect("read failed");

    let second = job.run(&manifest).await.expect("second run failed");
    assert_eq!(listing(&destination), first_listing);
    let second_binary =
        std::fs::read(destination.join("Foo.Runtime_Burst.dll")).expect("read failed");
    assert_eq!(second_binary, first_binary);
    assert_eq!(first.staged_artifacts.len(), second.staged_artifacts.len());
}

/// Test: split-architecture targets get one invocation per combination.
#[tokio::test]
async fn test_android_invokes_once_per_abi() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let mut json = manifest_json(dir.path(), &["Foo.Runtime"]);
    json["platforms"] = serde_json::json!({
        "Android": { "target_cpus": ["ARMV7A_NEON32", "ARMV8A_AARCH64"] },
    });
    let manifest = load_manifest(json);

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(invoker.clone(), job_config(dir.path(), BuildTarget::Android));

    let report = job.run(&manifest).await.expect("job failed");

    assert_eq!(report.entries[0].combinations, 2);
    let recorded = invoker.recorded();
    assert_eq!(recorded.len(), 2, "One invocation per ABI");
    let subdirs: Vec<&str> = recorded
        .iter()
        .map(|r| r.combination.subdirectory.as_str())
        .collect();
    assert_eq!(subdirs, vec!["arm64-v8a", "armeabi-v7a"]);
}

/// Test: per-platform environment overrides reach the invoker.
#[tokio::test]
async fn test_platform_environment_reaches_invoker() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let mut json = manifest_json(dir.path(), &["Foo.Runtime"]);
    json["platforms"] = serde_json::json!({
        "Windows": { "environment": { "VS_TOOLS": "C:/tools" } },
    });
    let manifest = load_manifest(json);

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker.clone(),
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    job.run(&manifest).await.expect("job failed");

    let request = &invoker.recorded()[0];
    assert_eq!(
        request.combination.environment.get("VS_TOOLS").map(String::as_str),
        Some("C:/tools")
    );
}

/// Test: the incremental-disable override strips the incremental switch.
#[tokio::test]
async fn test_incremental_disable_override() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let manifest = load_manifest(manifest_json(dir.path(), &["Foo.Runtime"]));

    let mut config = job_config(dir.path(), BuildTarget::StandaloneWindows64);
    config.env = EnvOverrides {
        force_safety_checks: false,
        disable_incremental: true,
    };

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(invoker.clone(), config);

    job.run(&manifest).await.expect("job failed");
    assert!(
        !invoker.recorded()[0].incremental,
        "Override should drop the incremental switch"
    );
}

/// Test: debug symbols are swept out of a release build's library dir.
#[tokio::test]
async fn test_release_build_relocates_debug_symbols() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let manifest = load_manifest(manifest_json(dir.path(), &["Foo.Runtime"]));

    let invoker = Arc::new(ScriptedInvoker::producing_outputs());
    let job = BurstJob::new(
        invoker,
        job_config(dir.path(), BuildTarget::StandaloneWindows64),
    );

    job.run(&manifest).await.expect("job failed");

    let symbol_dir = dir
        .path()
        .join("Builds/Game_BurstDebugInformation_DoNotShip");
    assert!(
        symbol_dir.join("Foo.Runtime_Burst.pdb").is_file(),
        "Release builds move symbols to the do-not-ship folder"
    );
    assert!(
        !dir.path().join("library/Foo.Runtime_Burst.pdb").exists(),
        "Symbols should leave the library dir"
    );
    // The staged copy shipped before the sweep.
    assert!(dir
        .path()
        .join("plugins/Foo.Runtime/Foo.Runtime_Burst.pdb")
        .is_file());
}
