use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PASSPHRASE: &str = "correct-horse-battery";

fn finvault(base: &Path) -> Command {
    let mut cmd = Command::cargo_bin("finvault").unwrap();
    cmd.env("FINVAULT_DATA_DIR", base)
        .env_remove("FINVAULT_PASSPHRASE")
        .env("RUST_LOG", "warn");
    cmd
}

fn init(base: &Path) {
    finvault(base)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));
}

fn backup_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".aabk"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_init_creates_layout() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    assert!(temp.path().join("config.json").exists());
    assert!(temp.path().join("secure.json").exists());
    assert!(temp.path().join("data/transactions.json").exists());
    assert!(temp.path().join("backups").is_dir());
}

#[test]
fn test_config_shows_paths() {
    let temp = TempDir::new().unwrap();

    finvault(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup directory"))
        .stdout(predicate::str::contains("Backup retention:  30 days"))
        .stdout(predicate::str::contains("KDF").not());
}

#[test]
fn test_zero_retention_setting_is_rejected() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    fs::write(
        temp.path().join("config.json"),
        r#"{"backup": {"retention_days": 0}}"#,
    )
    .unwrap();

    finvault(temp.path())
        .args(["backup", "create", "--passphrase", PASSPHRASE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retention_days must be at least 1"));

    assert!(backup_files(&temp.path().join("backups")).is_empty());
}

#[test]
fn test_backup_without_passphrase_fails() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    finvault(temp.path())
        .args(["backup", "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup passphrase not set"));

    assert!(backup_files(&temp.path().join("backups")).is_empty());
}

#[test]
fn test_backup_create_list_verify() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    finvault(temp.path())
        .args(["backup", "create"])
        .env("FINVAULT_PASSPHRASE", PASSPHRASE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: backup_"));

    let files = backup_files(&temp.path().join("backups"));
    assert_eq!(files.len(), 1);

    finvault(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(files[0].as_str()))
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    finvault(temp.path())
        .args(["backup", "verify", "latest", "--passphrase", PASSPHRASE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup OK"));

    finvault(temp.path())
        .args(["backup", "verify", "latest", "--passphrase", "wrong-horse-battery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wrong passphrase or corrupted backup"));
}

#[test]
fn test_restore_requires_force_and_restores_data() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    let transactions = temp.path().join("data/transactions.json");
    fs::write(&transactions, r#"[{"id": "t1", "amount": -1250}]"#).unwrap();

    finvault(temp.path())
        .args(["backup", "create", "--passphrase", PASSPHRASE])
        .assert()
        .success();

    fs::write(&transactions, "[]").unwrap();

    finvault(temp.path())
        .args(["backup", "restore", "latest", "--passphrase", PASSPHRASE])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));

    let untouched: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&transactions).unwrap()).unwrap();
    assert_eq!(untouched, serde_json::json!([]));

    finvault(temp.path())
        .args(["backup", "restore", "latest", "--force", "--passphrase", PASSPHRASE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restore complete!"));

    let restored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&transactions).unwrap()).unwrap();
    assert_eq!(restored, serde_json::json!([{"id": "t1", "amount": -1250}]));
}

#[test]
fn test_restore_rejects_corrupt_file() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    let bogus = temp.path().join("backups/backup_1000.aabk");
    fs::write(&bogus, b"NOPE and some more bytes to read").unwrap();

    finvault(temp.path())
        .args(["backup", "restore", "backup_1000.aabk", "--force", "--passphrase", PASSPHRASE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
fn test_stored_passphrase_is_used() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    finvault(temp.path())
        .args(["passphrase", "set", "--passphrase", "short"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));

    finvault(temp.path())
        .args(["passphrase", "set", "--passphrase", PASSPHRASE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Passphrase saved."));

    finvault(temp.path())
        .args(["passphrase", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Passphrase: set"));

    finvault(temp.path())
        .args(["backup", "create"])
        .assert()
        .success();

    finvault(temp.path())
        .args(["passphrase", "clear", "--force"])
        .assert()
        .success();

    finvault(temp.path())
        .args(["passphrase", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Passphrase: not set"));
}

#[test]
fn test_key_status_and_rotate() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    finvault(temp.path())
        .args(["key", "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"last_rotated_at\""))
        .stdout(predicate::str::contains("\"is_due\": false"));

    let before = fs::read_to_string(temp.path().join("secure.json")).unwrap();

    finvault(temp.path())
        .args(["key", "rotate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    assert_eq!(fs::read_to_string(temp.path().join("secure.json")).unwrap(), before);

    finvault(temp.path())
        .args(["key", "rotate", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database key rotated."));
    assert_ne!(fs::read_to_string(temp.path().join("secure.json")).unwrap(), before);
}

#[test]
fn test_cloud_upload_and_restore_latest() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    finvault(temp.path())
        .args(["cloud", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cloud backups found."));

    finvault(temp.path())
        .args(["cloud", "upload", "--passphrase", PASSPHRASE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uploaded: backup_"));

    assert_eq!(backup_files(&temp.path().join("cloud")).len(), 1);

    finvault(temp.path())
        .args(["cloud", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Latest: backup_"));

    finvault(temp.path())
        .args(["cloud", "restore-latest", "--force", "--passphrase", PASSPHRASE])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restore complete!"));
}

#[test]
fn test_cloud_upload_to_missing_remote_fails() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    let missing = temp.path().join("not-mounted");

    finvault(temp.path())
        .args(["cloud", "upload", "--passphrase", PASSPHRASE, "--remote"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"));

    // The local copy survives a failed upload
    assert_eq!(backup_files(&temp.path().join("backups")).len(), 1);
}

#[test]
fn test_schedule_next() {
    let temp = TempDir::new().unwrap();

    finvault(temp.path())
        .args(["schedule", "next"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next backup at 02:00"));
}
