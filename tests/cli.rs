//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn psylab() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("psylab").unwrap()
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn list_shows_every_experiment() {
    psylab()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("digit_span"))
        .stdout(predicate::str::contains("sart"))
        .stdout(predicate::str::contains("stroop"));
}

#[test]
fn defaults_prints_json() {
    let output = psylab().args(["defaults", "sart"]).output().unwrap();
    assert!(output.status.success());
    let defaults: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(defaults["target_digit"], 3);
    assert_eq!(defaults["total_trials"], 225);
}

#[test]
fn schema_has_basic_and_advanced_fields() {
    psylab()
        .args(["schema", "stroop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"basic\""))
        .stdout(predicate::str::contains("\"keymap\""));
}

#[test]
fn unknown_experiment_fails() {
    psylab()
        .args(["defaults", "n_back"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown experiment type: n_back"));
}

#[test]
fn simulate_emits_a_full_session() {
    let output = psylab()
        .args([
            "simulate",
            "stroop",
            "--options",
            r#"{"total_trials": 10}"#,
            "--seed",
            "42",
            "--subject",
            "P01",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    let count = |event: &str| lines.iter().filter(|l| l["event"] == event).count();
    assert_eq!(count("session"), 1);
    assert_eq!(count("trial"), 10);
    assert_eq!(count("response"), 10);
    assert_eq!(count("results"), 1);

    let results = &lines.last().unwrap()["results"];
    assert_eq!(results["experiment_type"], "stroop");
    assert_eq!(results["trials_attempted"], 10);
    assert_eq!(lines[0]["session"]["subject_id"], "P01");
}

#[test]
fn seeded_simulation_is_reproducible() {
    let run = || {
        let output = psylab()
            .args(["simulate", "digit_span", "--seed", "7", "--practice"])
            .output()
            .unwrap();
        assert!(output.status.success());
        // session ids are random, so compare everything else
        json_lines(&output.stdout)
            .into_iter()
            .map(|mut line| {
                line.as_object_mut().unwrap().remove("session_id");
                if let Some(session) = line.get_mut("session") {
                    session.as_object_mut().unwrap().remove("session_id");
                }
                line
            })
            .collect::<Vec<_>>()
    };
    let first = run();
    assert_eq!(first, run());
    assert!(first.iter().any(|l| l["event"] == "practice"));
}

#[test]
fn invalid_configuration_fails() {
    psylab()
        .args(["simulate", "sart", "--options", r#"{"target_digit": 12}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("target_digit"));
}
