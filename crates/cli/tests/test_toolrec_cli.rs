use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TOOLS: [(&str, u32); 5] = [
    ("umi_tools_extract", 0),
    ("rna_star", 1),
    ("bamFilter", 2),
    ("bam_filter", 3),
    ("featurecounts", 4),
];

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, value.to_string()).unwrap();
}

/// `<tmp>/out` with toolbox.json and model/info.json
fn artifacts() -> TempDir {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");

    let toolbox: serde_json::Map<String, Value> = TOOLS
        .iter()
        .map(|&(name, id)| (name.to_string(), json!({ "embedding": [id as f32, 0.5] })))
        .collect();
    write_json(&out.join("toolbox.json"), &Value::Object(toolbox));

    let ids: serde_json::Map<String, Value> =
        TOOLS.iter().map(|&(name, id)| (name.to_string(), json!(id))).collect();
    write_json(
        &out.join("model").join("info.json"),
        &json!({ "tool_name_to_id": ids }),
    );
    dir
}

fn with_best_params(dir: &TempDir) {
    write_json(
        &dir.path().join("out").join("model_optimize").join("best_hyperparameters.json"),
        &json!({ "hidden_channels": 64.0, "epochs": "12" }),
    );
}

/// Isolated from the caller's env, `.env` and user config
fn toolrec(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("toolrec").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env_remove("RUST_LOG");
    for var in [
        "TOOLREC_ARTIFACTS",
        "TOOLREC_MODEL",
        "TOOLREC_CONFIG",
        "TOOLREC_DEVICE",
        "TOOLREC_TOOLS_TO_RECOMMEND",
        "TOOLREC_CANDIDATES",
        "TOOLREC_INTERACTIVE",
        "TOOLREC_LOG_JSON",
        "TOOLREC_LOG_LEVEL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_catalog_lists_tools_in_id_order() {
    let dir = artifacts();

    toolrec(&dir)
        .arg("catalog")
        .assert()
        .success()
        .stdout("0\tumi_tools_extract\n1\trna_star\n2\tbamFilter\n3\tbam_filter\n4\tfeaturecounts\n")
        .stderr(predicate::str::contains("5 of 5 tools, embedding dimension 2"));
}

#[test]
fn test_catalog_filter_is_case_insensitive() {
    let dir = artifacts();

    toolrec(&dir)
        .args(["catalog", "--filter", "BAM"])
        .assert()
        .success()
        .stdout("2\tbamFilter\n3\tbam_filter\n");
}

#[test]
fn test_candidates_ranked_best_first() {
    let dir = artifacts();

    toolrec(&dir)
        .args(["candidates", "rnastar", "--candidates", "2"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1. rna_star (93)"));
}

#[test]
fn test_candidates_json() {
    let dir = artifacts();

    let output = toolrec(&dir)
        .args(["candidates", "bamfilter", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let ranked: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ranked = ranked.as_array().unwrap();
    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked[0], json!({ "name": "bam_filter", "score": 95 }));
    assert_eq!(ranked[1], json!({ "name": "bamFilter", "score": 89 }));
}

#[test]
fn test_recommend_without_tools_prints_nothing() {
    let dir = artifacts();

    toolrec(&dir).arg("recommend").assert().success().stdout("");
    toolrec(&dir)
        .args(["recommend", "--json"])
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn test_recommend_non_interactive_unknown_tool() {
    let dir = artifacts();

    toolrec(&dir)
        .args(["recommend", "--non-interactive", "rna_star", "no_such_tool"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_recommend_abort_selection() {
    let dir = artifacts();

    toolrec(&dir)
        .args(["recommend", "umi_tools_extract", "rnastar"])
        .write_stdin("0\n")
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("1. rna_star"))
        .stderr(predicate::str::contains("0 to exit"));
}

#[test]
fn test_recommend_reprompts_on_invalid_input() {
    let dir = artifacts();

    toolrec(&dir)
        .args(["recommend", "rnastar"])
        .write_stdin("abc\n42\n")
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("Invalid input, please try again").count(2));
}

#[test]
fn test_recommend_reads_sequence_file() {
    let dir = artifacts();
    fs::write(dir.path().join("sequence.txt"), "rna_star\nno_such_tool\n").unwrap();

    toolrec(&dir)
        .args(["recommend", "--non-interactive", "--json", "--file", "sequence.txt"])
        .assert()
        .success()
        .stdout("[]\n");
}

#[cfg(feature = "onnx")]
#[test]
fn test_recommend_missing_model_fails() {
    let dir = artifacts();
    with_best_params(&dir);

    toolrec(&dir)
        .args(["recommend", "rnastar", "bamFilter"])
        .write_stdin("1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Model file not found"));
}

#[test]
fn test_missing_artifacts_fail() {
    let dir = TempDir::new().unwrap();

    toolrec(&dir)
        .arg("catalog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load tool catalog"));
}

#[test]
fn test_config_reports_resolved_scorer() {
    let dir = artifacts();
    with_best_params(&dir);

    let output = toolrec(&dir)
        .args(["config", "--device", "cpu"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["app"]["device"], "cpu");
    assert_eq!(report["scorer"]["model"]["hidden_channels"], 64);
    assert_eq!(report["scorer"]["model"]["epochs"], 12);
    assert_eq!(report["scorer"]["model"]["device"], "cpu");
    assert_eq!(report["scorer"]["data"]["num_node_features"], 3);
    assert_eq!(report["scorer"]["data"]["num_tools"], 5);
}

#[test]
fn test_config_file_and_flag_precedence() {
    let dir = artifacts();
    fs::write(
        dir.path().join("toolrec.toml"),
        "artifacts_dir = \"elsewhere\"\nmodel_name = \"model\"\ncandidates_to_show = 3\n",
    )
    .unwrap();

    // Flag beats file
    let output = toolrec(&dir)
        .args(["--config", "toolrec.toml", "--artifacts", "out", "config", "--app-only"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["artifacts_dir"], "out");
    assert_eq!(report["candidates_to_show"], 3);

    // Env beats file
    toolrec(&dir)
        .env("TOOLREC_CANDIDATES", "1")
        .args(["--config", "toolrec.toml", "--artifacts", "out", "candidates", "rnastar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. rna_star").and(predicate::str::contains("2.").not()));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = artifacts();

    toolrec(&dir)
        .args(["--config", "absent.toml", "catalog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
