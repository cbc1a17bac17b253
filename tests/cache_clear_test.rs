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
        .env("DT_KEEPER_LOGS_DIR", root.join("logs"));
    cmd
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
}

#[test]
fn cache_clear_is_selective_and_dry_run_by_default() {
    let tmp = tempdir().expect("tempdir");
    let caches = tmp.path().join("container/Library/Caches");
    let net = caches.join("net");
    let qwen = caches.join("qwen_image");
    fs::create_dir_all(net.join("catalog")).expect("mkdir net");
    fs::create_dir_all(&qwen).expect("mkdir qwen");
    fs::write(net.join("catalog/models.json"), vec![b'x'; 4096]).expect("write net");
    fs::write(qwen.join("weights.bin"), vec![b'y'; 1024]).expect("write qwen");

    keeper(tmp.path())
        .arg("cache-clear")
        .assert()
        .success()
        .stdout(predicates::str::contains("would clear: Network cache"))
        .stdout(predicates::str::contains("pass --all"));
    assert_eq!(file_count(&net), 1);

    keeper(tmp.path())
        .args(["cache-clear", "--apply"])
        .assert()
        .success()
        .stdout(predicates::str::contains("freed"));
    assert!(net.is_dir());
    assert_eq!(file_count(&net), 0);
    assert_eq!(file_count(&qwen), 1);

    keeper(tmp.path())
        .args(["cache-clear", "--all", "--apply"])
        .assert()
        .success()
        .stdout(predicates::str::contains("cleared: Qwen model cache"));
    assert!(qwen.is_dir());
    assert_eq!(file_count(&qwen), 0);

    keeper(tmp.path())
        .args(["cache-clear", "--all", "--apply"])
        .assert()
        .success()
        .stdout(predicates::str::contains("cache is already empty"));
}

#[test]
fn missing_cache_dir_is_not_an_error() {
    let tmp = tempdir().expect("tempdir");

    keeper(tmp.path())
        .arg("cache-clear")
        .assert()
        .success()
        .stdout(predicates::str::contains("nothing to clear"));
}
