//! Behavioural tests for the command builder, through the public API.

use mriqc_gear::command::{build, split_passthrough, CommandError, ParameterMap, ParameterValue};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn bids_app_positional() -> Vec<String> {
    strings(&["/bids", "/out", "participant"])
}

fn sample_parameters() -> ParameterMap {
    let mut params = ParameterMap::new();
    params.insert("verbose", ParameterValue::from("vvv"));
    params.insert("n_cpus", ParameterValue::from(4u64));
    params.insert("float", ParameterValue::Bool(true));
    params.insert("modality", ParameterValue::from("T1w T2w"));
    params.insert("fd_thres", ParameterValue::from(""));
    params
}

/// Index of `needle` as a consecutive run inside `tokens`
fn find_run(tokens: &[String], needle: &[&str]) -> Option<usize> {
    tokens
        .windows(needle.len())
        .position(|w| w.iter().zip(needle).all(|(a, b)| a == b))
}

#[test]
fn test_end_to_end_mriqc_command() {
    let cmd = build("mriqc", &bids_app_positional(), &sample_parameters(), &[]).unwrap();

    assert_eq!(
        cmd.tokens(),
        [
            "mriqc",
            "/bids",
            "/out",
            "participant",
            "-vvv",
            "--n_cpus=4",
            "--float",
            "--modality",
            "T1w",
            "T2w",
            "--fd_thres",
        ]
    );
}

#[test]
fn test_build_is_deterministic() {
    let params = sample_parameters();
    let passthrough = split_passthrough("--no-sub --ica");
    let first = build("mriqc", &bids_app_positional(), &params, &passthrough).unwrap();
    let second = build("mriqc", &bids_app_positional(), &params, &passthrough).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_flags_follow_map_order() {
    let mut params = ParameterMap::new();
    for key in ["zeta", "alpha", "mid", "beta"] {
        params.insert(key, ParameterValue::from("1"));
    }
    let cmd = build("app", &[], &params, &[]).unwrap();
    assert_eq!(cmd.args(), ["--zeta=1", "--alpha=1", "--mid=1", "--beta=1"]);
}

#[test]
fn test_false_booleans_leave_no_trace() {
    let mut params = ParameterMap::new();
    params.insert("no-sub", ParameterValue::Bool(false));
    params.insert("float", ParameterValue::Bool(false));
    params.insert("ica", ParameterValue::Bool(true));

    let cmd = build("mriqc", &bids_app_positional(), &params, &[]).unwrap();
    assert!(cmd.tokens().iter().all(|t| !t.contains("no-sub") && !t.contains("float")));
    assert!(cmd.tokens().iter().any(|t| t == "--ica"));
}

#[test]
fn test_short_flag_pairs_with_value() {
    let mut params = ParameterMap::new();
    params.insert("w", ParameterValue::from("/work"));
    params.insert("n_procs", ParameterValue::from(2u64));

    let cmd = build("mriqc", &bids_app_positional(), &params, &[]).unwrap();
    assert!(find_run(cmd.tokens(), &["-w", "/work"]).is_some());
}

#[test]
fn test_multi_value_expansion() {
    let mut params = ParameterMap::new();
    params.insert("participant_label", ParameterValue::from("a b c"));

    let cmd = build("mriqc", &bids_app_positional(), &params, &[]).unwrap();
    assert!(find_run(cmd.tokens(), &["--participant_label", "a", "b", "c"]).is_some());
}

#[test]
fn test_verbose_override() {
    let mut params = ParameterMap::new();
    params.insert("verbose", ParameterValue::from("vv"));

    let cmd = build("mriqc", &bids_app_positional(), &params, &[]).unwrap();
    assert!(cmd.tokens().iter().any(|t| t == "-vv"));
    assert!(cmd.tokens().iter().all(|t| !t.starts_with("--verbose")));
}

#[test]
fn test_presence_only_flag() {
    let mut params = ParameterMap::new();
    params.insert("fd_thres", ParameterValue::from(""));

    let cmd = build("mriqc", &bids_app_positional(), &params, &[]).unwrap();
    assert_eq!(cmd.tokens().iter().filter(|t| t.contains("fd_thres")).count(), 1);
    assert!(cmd.tokens().iter().any(|t| t == "--fd_thres"));
}

#[test]
fn test_scalar_key_value() {
    let mut params = ParameterMap::new();
    params.insert("n_cpus", ParameterValue::from(4u64));

    let cmd = build("mriqc", &bids_app_positional(), &params, &[]).unwrap();
    assert!(cmd.tokens().iter().any(|t| t == "--n_cpus=4"));
}

#[test]
fn test_empty_program_name_rejected() {
    let result = build("", &bids_app_positional(), &sample_parameters(), &[]);
    assert!(matches!(result, Err(CommandError::ContractViolation(_))));
}

#[test]
fn test_passthrough_sits_between_positionals_and_flags() {
    let cmd = build(
        "mriqc",
        &bids_app_positional(),
        &sample_parameters(),
        &split_passthrough("--no-sub  --ica"),
    )
    .unwrap();
    assert_eq!(&cmd.tokens()[4..7], ["--no-sub", "--ica", "-vvv"]);
}
