//! Integration tests for the `flowmodel` binary

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn instance(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("flowmodel_core")
        .join("test_data")
        .join("instances")
        .join(name)
}

#[test]
fn help_lists_commands() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transport"))
        .stdout(predicate::str::contains("cable-layout"))
        .stdout(predicate::str::contains("workforce"));
}

#[test]
fn transport_default_instance() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.arg("transport")
        .assert()
        .success()
        .stdout(predicate::str::contains("status: optimal"))
        .stdout(predicate::str::contains("total cost: 153675.00"));
}

#[test]
fn transport_json_output() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    let output = cmd
        .args(["--json", "transport", "--instance"])
        .arg(instance("transportation.json"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["status"], "Optimal");
    assert_eq!(plan["shipments"].as_array().unwrap().len(), 6);
    assert!((plan["total_cost"].as_f64().unwrap() - 153_675.).abs() < 1e-4);
}

#[test]
fn infeasible_instance_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transportation.json");
    let data = std::fs::read_to_string(instance("transportation.json")).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&data).unwrap();
    value["demands"]["new-york"] = serde_json::json!(5000.0);
    std::fs::write(&path, value.to_string()).unwrap();

    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["transport", "--instance"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("status: infeasible"))
        .stderr(predicate::str::contains("infeasible"));
}

#[test]
fn cable_layout_from_sites() {
    let dir = tempfile::tempdir().unwrap();
    let routes = dir.path().join("routes.csv");
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["cable-layout", "--sites"])
        .arg(instance("offshore_sites.csv"))
        .arg("--routes-csv")
        .arg(&routes)
        .assert()
        .success()
        .stdout(predicate::str::contains("T3 -> T2"))
        .stdout(predicate::str::contains("total length: 12.070 km"));
    let written = std::fs::read_to_string(&routes).unwrap();
    // Header plus one cable per turbine
    assert_eq!(written.lines().count(), 9);
}

#[test]
fn platform_override_applies_to_instances() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["cable-layout", "--instance"])
        .arg(instance("cable_layout.json"))
        .args(["--platform", "Shore"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown node Shore"));
}

#[test]
fn platform_override_applies_to_site_tables() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["cable-layout", "--sites"])
        .arg(instance("offshore_sites.csv"))
        .args(["--platform", "Shore"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown node Shore"));
}

#[test]
fn cable_layout_needs_input() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.arg("cable-layout")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--instance or --sites"));
}

#[test]
fn workforce_small_instance() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["--log-level", "warn", "workforce", "--instance"])
        .arg(instance("workforce_small.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("total temps: 1.00"))
        .stdout(predicate::str::contains("fairness gap: 1.00"))
        .stdout(predicate::str::contains("workload[Cathy] = 2"));
}

#[test]
fn unknown_solver_is_rejected() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["--solver", "cplex", "transport"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown solver"));
}

#[test]
fn clarabel_rejects_binary_models() {
    let mut cmd = cargo_bin_cmd!("flowmodel");
    cmd.args(["--solver", "clarabel", "workforce"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("clarabel"));
}
