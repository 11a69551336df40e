use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;

const CONTRACT: &str =
    "We shall indemnify the vendor. Disputes go to arbitration. Payment is due monthly.";

fn clause_guard() -> Command {
    let mut cmd = Command::cargo_bin("clause-guard-cli").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("RUST_LOG", "warn")
        .env_remove("CLAUSE_GUARD_PHRASES_FILE")
        .env_remove("CLAUSE_GUARD_DATABASE_URL");
    cmd
}

#[test]
fn list_phrases_defaults_to_builtin_list() {
    clause_guard()
        .arg("list-phrases")
        .assert()
        .success()
        .stdout(predicate::str::contains("14 phrase(s) loaded from built-in list"))
        .stdout(predicate::str::contains("- hold harmless"));
}

#[test]
fn list_phrases_from_custom_file_as_json() {
    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write(file.path(), "# custom\nEscrow\nsole discretion\n").unwrap();

    let output = clause_guard()
        .args(["--phrases", file.path().to_str().unwrap(), "list-phrases", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let phrases: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(phrases, vec!["escrow", "sole discretion"]);
}

#[test]
fn scan_reads_stdin() {
    clause_guard()
        .arg("scan")
        .write_stdin(CONTRACT)
        .assert()
        .success()
        .stdout(predicate::str::contains("Risk Score: 16.7 (Low)"))
        .stdout(predicate::str::contains("[indemnify] #1"))
        .stdout(predicate::str::contains("[arbitration] #2"));
}

#[test]
fn scan_text_file_as_json() {
    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write(file.path(), CONTRACT).unwrap();

    let output = clause_guard()
        .args(["scan", file.path().to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["risk_score"], 16.7);
    assert_eq!(report["risk_band"], "low");
    assert_eq!(report["sentence_count"], 3);
    assert_eq!(report["highlights"].as_array().unwrap().len(), 2);
}

#[test]
fn scan_clean_text_reports_nothing() {
    clause_guard()
        .arg("scan")
        .write_stdin("The meeting is on Tuesday. Bring snacks.")
        .assert()
        .success()
        .stdout(predicate::str::contains("Risk Score: 0.0 (Low)"))
        .stdout(predicate::str::contains("No risky phrases detected."));
}

#[test]
fn scan_rejects_unsupported_extension() {
    let file = tempfile::Builder::new().suffix(".exe").tempfile().unwrap();
    write(file.path(), CONTRACT).unwrap();

    clause_guard()
        .args(["scan", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file extension"));
}

#[test]
fn init_db_then_promote_unknown_user_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clause-guard.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.display());

    clause_guard()
        .env("CLAUSE_GUARD_DATABASE_URL", &url)
        .arg("init-db")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database ready"));
    assert!(db_path.exists());

    clause_guard()
        .env("CLAUSE_GUARD_DATABASE_URL", &url)
        .args(["promote-admin", "nobody@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user registered with email nobody@example.com"));
}
