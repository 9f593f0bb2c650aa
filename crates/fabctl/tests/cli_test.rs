#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A scratch state directory plus an empty settings file, so tests never
/// pick up settings from the machine running them
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("settings.yaml"), "").unwrap();
        Self { root }
    }

    fn fabctl(&self) -> Command {
        let mut cmd = Command::cargo_bin("fabctl").unwrap();
        cmd.env_clear()
            .arg("--config")
            .arg(self.root.path().join("settings.yaml"))
            .arg("--state-dir")
            .arg(self.root.path().join("state"));
        cmd
    }
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("fabctl").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reserve"))
        .stdout(predicate::str::contains("free"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("fabctl").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fabctl"));
}

#[test]
fn test_reserve_get_free() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .args(["reserve", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reserved tenant"))
        .stdout(predicate::str::contains("2120"))
        .stdout(predicate::str::contains("10.5.0.0/24"))
        .stdout(predicate::str::contains("225.32.1.1 - 225.32.255.255"));

    sandbox
        .fabctl()
        .args(["get", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2121"));

    sandbox.fabctl().args(["free", "foo"]).assert().success();

    sandbox
        .fabctl()
        .args(["get", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not exist"));
}

#[test]
fn test_reserve_json() {
    let sandbox = Sandbox::new();
    sandbox.fabctl().args(["reserve", "foo"]).assert().success();

    let output = sandbox
        .fabctl()
        .args(["--json", "reserve", "bar"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["aci_config.system_id"], "bar");
    assert_eq!(record["net_config.kubeapi_vlan"], 2122);
    assert_eq!(record["net_config.service_vlan"], 2123);
    assert_eq!(record["net_config.node_svc_subnet"], "10.6.0.0/24");
}

#[test]
fn test_list() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tenants"));

    sandbox.fabctl().args(["reserve", "alpha"]).assert().success();
    sandbox.fabctl().args(["reserve", "beta"]).assert().success();

    sandbox
        .fabctl()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains("beta"))
        .stdout(predicate::str::contains("2 tenant(s)"));
}

#[test]
fn test_duplicate_reservation_fails() {
    let sandbox = Sandbox::new();
    sandbox.fabctl().args(["reserve", "foo"]).assert().success();

    sandbox
        .fabctl()
        .args(["reserve", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_name_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .args(["reserve", "has space"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid tenant name"));
}

#[test]
fn test_free_missing_tenant_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .args(["free", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_vlan_override_exhaustion() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .args(["--vlan-min", "1000", "--vlan-max", "1001", "reserve", "foo0"])
        .assert()
        .success();

    sandbox
        .fabctl()
        .args(["--vlan-min", "1000", "--vlan-max", "1001", "reserve", "foo1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only 0 ids available"));
}

#[test]
fn test_invalid_vlan_bounds_rejected() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .args(["--vlan-max", "4095", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vlan_max must be <= 4094"));
}

#[test]
fn test_multicast_range_must_be_slash16() {
    let sandbox = Sandbox::new();

    sandbox
        .fabctl()
        .args(["--multicast-range", "225.32.0.0/24", "reserve", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("multicast_range must be a /16"));

    sandbox
        .fabctl()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tenants"));
}

#[test]
fn test_settings_file() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.root.path().join("settings.yaml"),
        "allocator:\n  vlan_min: 300\n  vlan_max: 310\n  service_subnet: 172.16.0.0/24\n",
    )
    .unwrap();

    sandbox
        .fabctl()
        .args(["reserve", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("300"))
        .stdout(predicate::str::contains("172.16.0.0/24"));

    sandbox
        .fabctl()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("vlan_min: 300"))
        .stdout(predicate::str::contains("settings.yaml"));
}
