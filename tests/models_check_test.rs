use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn keeper(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("dt-keeper");
    cmd.current_dir(root)
        .env("HOME", root)
        .env("DT_KEEPER_HOME", root.join("keeper"))
        .env("DT_KEEPER_CONFIG_PATH", root.join("keeper/missing.toml"))
        .env("DT_KEEPER_CONTAINER_DIR", root.join("container"))
        .env("DT_KEEPER_MODELS_DIR", root.join("models"))
        .env("DT_KEEPER_LOGS_DIR", root.join("logs"));
    cmd
}

fn seed_models(models: &Path) {
    fs::create_dir_all(models).expect("mkdir models");
    fs::write(models.join("sd_v1.5.ckpt"), vec![0u8; 2048]).expect("write model");
    fs::write(models.join("detail_lora_f16.ckpt"), vec![0u8; 512]).expect("write lora");
    fs::write(models.join("forgotten.ckpt"), vec![0u8; 64]).expect("write orphan");
    fs::write(
        models.join("custom.json"),
        r#"[
  {"name": "SD 1.5", "file": "SD_V1.5.ckpt", "version": "v1"},
  {"name": "Deleted", "file": "deleted.ckpt"}
]
"#,
    )
    .expect("write custom.json");
    fs::write(
        models.join("custom_lora.json"),
        r#"[{"name": "Detail", "file": "detail_lora_f16.ckpt"}]"#,
    )
    .expect("write custom_lora.json");
}

#[test]
fn check_reports_missing_entries_and_fix_prunes_them() {
    let tmp = tempdir().expect("tempdir");
    let models = tmp.path().join("models");
    seed_models(&models);
    let custom = models.join("custom.json");
    let before = fs::read_to_string(&custom).expect("read custom.json");

    keeper(tmp.path())
        .arg("models-check")
        .assert()
        .failure()
        .stdout(predicates::str::contains(
            "missing: deleted.ckpt (file) referenced by 'Deleted'",
        ))
        .stdout(predicates::str::contains("forgotten.ckpt"))
        .stdout(predicates::str::contains("run with --fix"));
    assert_eq!(fs::read_to_string(&custom).expect("read"), before);

    keeper(tmp.path())
        .args(["models-check", "--fix"])
        .assert()
        .success()
        .stdout(predicates::str::contains("custom.json: removed 1 invalid entries"));

    let entries: Value =
        serde_json::from_str(&fs::read_to_string(&custom).expect("read")).expect("json");
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["file"], "SD_V1.5.ckpt");
    assert_eq!(entries[0]["version"], "v1");

    keeper(tmp.path())
        .arg("models-check")
        .assert()
        .success()
        .stdout(predicates::str::contains("custom.json: 1 entries OK"));

    let audit = fs::read_to_string(tmp.path().join("logs/audit.log")).expect("audit log");
    assert!(audit.contains("\"command\":\"models-check\""));
}

#[test]
fn orphans_and_usage_list_model_files() {
    let tmp = tempdir().expect("tempdir");
    seed_models(&tmp.path().join("models"));

    keeper(tmp.path())
        .arg("models-orphans")
        .assert()
        .success()
        .stdout(predicates::str::contains("orphaned models: 1"))
        .stdout(predicates::str::contains("  - forgotten.ckpt"));

    keeper(tmp.path())
        .args(["models-usage", "--json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"command\": \"models-usage\""));
}

#[test]
fn unreadable_model_manifest_is_left_alone() {
    let tmp = tempdir().expect("tempdir");
    let models = tmp.path().join("models");
    seed_models(&models);
    fs::write(models.join("custom_controlnet.json"), "{\"oops\": true}").expect("write");

    keeper(tmp.path())
        .args(["models-check", "--fix"])
        .assert()
        .failure()
        .stdout(predicates::str::contains("custom_controlnet.json: unreadable"))
        .stdout(predicates::str::contains("custom.json: removed 1 invalid entries"));
    assert_eq!(
        fs::read_to_string(models.join("custom_controlnet.json")).expect("read"),
        "{\"oops\": true}"
    );
}
