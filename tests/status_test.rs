use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[test]
fn status_json_reports_resolved_paths_and_overrides() {
    let tmp = tempdir().expect("tempdir");
    let models = tmp.path().join("models");
    let scripts = tmp.path().join("scripts");
    fs::create_dir_all(&models).expect("mkdir models");
    fs::create_dir_all(&scripts).expect("mkdir scripts");

    let output = assert_cmd::cargo::cargo_bin_cmd!("dt-keeper")
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("DT_KEEPER_HOME", tmp.path().join("keeper"))
        .env("DT_KEEPER_CONFIG_PATH", tmp.path().join("keeper/missing.toml"))
        .env("DT_KEEPER_CONTAINER_DIR", tmp.path().join("container"))
        .env("DT_KEEPER_HISTORY", "off")
        .args(["status", "--json", "--models-dir"])
        .arg(&models)
        .arg("--scripts-dir")
        .arg(&scripts)
        .output()
        .expect("run status");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["command"], "status");
    assert_eq!(report["ok"], true);
    let details = report["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>();
    assert!(details.contains(&"history=disabled"));
    assert!(details.contains(&"env DT_KEEPER_HISTORY=off"));
    assert!(
        details
            .iter()
            .any(|d| *d == format!("scripts_dir={}", scripts.display()))
    );
}

#[test]
fn status_flags_missing_data_dirs() {
    let tmp = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("dt-keeper")
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("DT_KEEPER_HOME", tmp.path().join("keeper"))
        .env("DT_KEEPER_CONFIG_PATH", tmp.path().join("keeper/missing.toml"))
        .env("DT_KEEPER_CONTAINER_DIR", tmp.path().join("container"))
        .arg("status")
        .assert()
        .failure()
        .stdout(predicates::str::contains("missing models dir"))
        .stdout(predicates::str::contains("missing scripts dir"));
}
