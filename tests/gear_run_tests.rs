//! End-to-end gear runs against a temporary gear directory.

use mriqc_gear::bids::{Hierarchy, LocalDatasetSource, RunLevel};
use mriqc_gear::config::GearConfig;
use mriqc_gear::orchestrator::{self, GearContext};
use mriqc_gear::utils::SystemResources;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "{}").unwrap();
}

fn sample_dataset(root: &Path) {
    touch(&root.join("dataset_description.json"));
    touch(&root.join("sub-01/anat/sub-01_T1w.nii.gz"));
    touch(&root.join("sub-01/dwi/sub-01_dwi.nii.gz"));
}

/// Stand-in for the application: writes IQMs at participant level and a
/// summary table at group level
#[cfg(unix)]
const FAKE_MRIQC: &str = r#"#!/bin/sh
out="$2"
if [ "$3" = "group" ]; then
    printf 'bids_name\tcjv\nsub-01_T1w\t0.5\n' > "$out/group_T1w.tsv"
else
    mkdir -p "$out/sub-01/anat"
    printf '{"cjv": 0.5}' > "$out/sub-01/anat/sub-01_T1w.json"
    printf '<html/>' > "$out/sub-01_T1w.html"
fi
"#;

/// Install the fake application and point the saved environment at it
#[cfg(unix)]
fn install_fake_mriqc(gear_dir: &Path, environment_file: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let bin = gear_dir.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let script = bin.join("mriqc");
    fs::write(&script, FAKE_MRIQC).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let environ = json!({"PATH": format!("{}:/usr/bin:/bin", bin.display())});
    fs::write(environment_file, environ.to_string()).unwrap();
}

fn context(gear_dir: &Path, config: Value, run_level: RunLevel) -> GearContext {
    let config: GearConfig = serde_json::from_value(json!({
        "config": config,
        "destination": {"id": "abc123", "type": "analysis"}
    }))
    .unwrap();

    let environment_file = gear_dir.join("gear_environ.json");
    fs::write(&environment_file, r#"{"PATH": "/nonexistent-bin"}"#).unwrap();

    GearContext {
        config,
        gear_name: "bids-mriqc".to_string(),
        output_dir: gear_dir.join("output"),
        work_dir: gear_dir.join("work"),
        environment_file,
        hierarchy: Hierarchy {
            run_level,
            run_label: "sub 01".to_string(),
        },
    }
}

fn resources() -> SystemResources {
    SystemResources { cpus: 2, mem_gb: Some(4) }
}

#[test]
fn test_dry_run_checks_without_staging() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    sample_dataset(&source_dir);

    let ctx = context(
        gear.path(),
        json!({
            "gear-dry-run": true,
            "gear-keep-output": true,
            "verbose": "vv",
            "n_cpus": 0
        }),
        RunLevel::Session,
    );

    orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert!(!ctx.bids_dir().exists());
    let tree = fs::read_to_string(ctx.output_dir.join("mriqc_bids_tree.html")).unwrap();
    assert!(tree.contains("sub-01_T1w.nii.gz"));
    assert!(ctx.analysis_dir().join("mriqc_dry_run.html").is_file());

    let metadata = fs::read_to_string(ctx.output_dir.join(".metadata.json")).unwrap();
    let metadata: Value = serde_json::from_str(&metadata).unwrap();
    assert!(metadata.pointer("/analysis/info/dry_run").is_some());
}

#[test]
#[ignore = "requires the zip executable"]
fn test_dry_run_packages_outputs() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    sample_dataset(&source_dir);

    let ctx = context(gear.path(), json!({"gear-dry-run": true}), RunLevel::Session);
    let code =
        orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert_eq!(code, 0);
    assert!(ctx.output_dir.join("bids-mriqc_sub01_abc123.zip").is_file());
    assert!(ctx.output_dir.join("mriqc_dry_run.html.zip").is_file());
    assert!(!ctx.analysis_dir().exists());
}

#[cfg(unix)]
#[test]
fn test_project_run_collects_iqms_and_group_tables() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    sample_dataset(&source_dir);

    let ctx = context(gear.path(), json!({"gear-keep-output": true}), RunLevel::Project);
    install_fake_mriqc(gear.path(), &ctx.environment_file);

    orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert!(ctx.bids_dir().join("sub-01/anat/sub-01_T1w.nii.gz").is_file());
    assert!(!ctx.bids_dir().join("sub-01/dwi").exists());

    let table = fs::read_to_string(ctx.output_dir.join("group_T1w_abc123.tsv")).unwrap();
    assert!(table.starts_with("bids_name"));

    let metadata = fs::read_to_string(ctx.output_dir.join(".metadata.json")).unwrap();
    let metadata: Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(metadata.pointer("/analysis/info/sub-01_T1w/cjv"), Some(&json!(0.5)));
}

#[cfg(unix)]
#[test]
#[ignore = "requires the zip executable"]
fn test_successful_run_exits_zero() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    sample_dataset(&source_dir);

    let ctx = context(gear.path(), json!({}), RunLevel::Session);
    install_fake_mriqc(gear.path(), &ctx.environment_file);

    let code =
        orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert_eq!(code, 0);
    assert!(ctx.output_dir.join("bids-mriqc_sub01_abc123.zip").is_file());
    assert!(ctx.output_dir.join("sub-01_T1w.html.zip").is_file());
}

#[test]
fn test_bids_errors_prevent_run() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    touch(&source_dir.join("README"));

    let ctx = context(gear.path(), json!({"gear-dry-run": true}), RunLevel::Session);
    let code =
        orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert_eq!(code, 1);
    assert!(!ctx.analysis_dir().join("mriqc_dry_run.html").exists());
}

#[test]
fn test_ignored_bids_errors_allow_run() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    touch(&source_dir.join("README"));

    let ctx = context(
        gear.path(),
        json!({
            "gear-dry-run": true,
            "gear-ignore-bids-errors": true,
            "gear-keep-output": true
        }),
        RunLevel::Session,
    );
    orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert!(ctx.analysis_dir().join("mriqc_dry_run.html").is_file());
}

#[test]
fn test_failed_application_fails_run() {
    let gear = tempfile::tempdir().unwrap();
    let source_dir = gear.path().join("input/bids");
    sample_dataset(&source_dir);

    // The saved environment's PATH has no mriqc, so launching fails
    let ctx = context(gear.path(), json!({"float": true}), RunLevel::Project);
    let code =
        orchestrator::run(&ctx, &LocalDatasetSource::new(&source_dir), &resources()).unwrap();

    assert_eq!(code, 1);
    // Output directory is removed after packaging
    assert!(!ctx.analysis_dir().exists());
    assert!(!ctx.output_dir.join(".metadata.json").exists());
}

#[test]
fn test_missing_dataset_fails_run() {
    let gear = tempfile::tempdir().unwrap();
    let ctx = context(gear.path(), json!({"gear-dry-run": true}), RunLevel::Subject);

    let code = orchestrator::run(
        &ctx,
        &LocalDatasetSource::new(gear.path().join("input/missing")),
        &resources(),
    )
    .unwrap();
    assert_eq!(code, 1);
}
