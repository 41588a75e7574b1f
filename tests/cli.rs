use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;

fn testpilot() -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("testpilot");
    let mut cmd = Command::new(bin);
    for key in [
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "OPENAI_MAX_TOKENS",
        "OPENAI_TEMPERATURE",
        "OPENAI_MAX_RETRIES",
        "OPENAI_RETRY_DELAY",
        "TESTPILOT_MAX_CONCURRENT_RUNS",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(stdout.trim()).expect("valid json")
}

#[test]
fn offline_plan_uses_heuristic() {
    let assert = testpilot()
        .args(["plan", "Instagram'ı test et", "--offline"])
        .assert()
        .success();
    let value = stdout_json(assert.get_output());

    assert_eq!(value["intent"]["platform"], "instagram");
    assert_eq!(value["intent"]["source"], "heuristic");
    assert!(value["intent"]["confidence"].as_f64().unwrap() <= 0.5);
    assert!(!value["strategy"]["steps"].as_array().unwrap().is_empty());
}

#[test]
fn overrides_win_in_offline_plan() {
    let assert = testpilot()
        .args([
            "plan",
            "check the site",
            "--offline",
            "--platform",
            "youtube",
            "--test-type",
            "ui",
            "--priority",
            "low",
            "--fast",
        ])
        .assert()
        .success();
    let value = stdout_json(assert.get_output());

    assert_eq!(value["intent"]["source"], "overrides");
    assert_eq!(value["intent"]["confidence"], 1.0);
    assert_eq!(value["strategy"]["platform"], "youtube");
    assert_eq!(value["strategy"]["fast_mode"], true);
    let kinds: Vec<&str> = value["strategy"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["kind"].as_str().unwrap())
        .collect();
    assert!(!kinds.contains(&"capture_screenshot"));
}

#[test]
fn blank_request_fails() {
    testpilot()
        .args(["plan", "   ", "--offline"])
        .assert()
        .failure();
}

#[test]
fn config_show_masks_api_key() {
    let assert = testpilot()
        .env("OPENAI_API_KEY", "sk-very-secret")
        .args(["config", "show"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(!stdout.contains("sk-very-secret"));
    assert!(stdout.contains("***"));
    assert!(stdout.contains("gpt-3.5-turbo"));
}

#[test]
fn config_validate_rejects_zero_concurrency() {
    testpilot()
        .env("TESTPILOT_MAX_CONCURRENT_RUNS", "0")
        .args(["config", "validate"])
        .assert()
        .failure();
}
