use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("lqfb-digest").unwrap()
}

#[test]
fn help_lists_digest_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--dry-run"))
        .stdout(contains("--legacy-section-guard"))
        .stdout(contains("--database-url"));
}

#[test]
fn verbose_and_quiet_conflict() {
    cmd()
        .args(["--verbose", "--quiet"])
        .assert()
        .code(1)
        .stderr(contains("Cannot use both --verbose and --quiet"));
}

#[test]
fn zero_days_rejected() {
    cmd()
        .args(["--days", "0"])
        .assert()
        .code(1)
        .stderr(contains("Days must be at least 1"));
}

#[test]
fn base_url_scheme_rejected() {
    cmd()
        .args(["--base-url", "lqfb.example.org/lsa/"])
        .assert()
        .code(1)
        .stderr(contains("Base URL must start with"));
}

#[test]
fn malformed_since_rejected() {
    cmd().args(["--since", "05.03.2024"]).assert().failure();
}

#[test]
fn init_config_writes_file_once() {
    let dir = TempDir::new().expect("temp dir");

    cmd()
        .current_dir(dir.path())
        .arg("--init-config")
        .assert()
        .success()
        .stdout(contains(".lqfb-digest.toml"));

    let written = std::fs::read_to_string(dir.path().join(".lqfb-digest.toml")).expect("config written");
    assert!(written.contains("[database]"));
    assert!(written.contains("[mail]"));

    cmd()
        .current_dir(dir.path())
        .arg("--init-config")
        .assert()
        .code(1)
        .stderr(contains("already exists"));
}

#[test]
fn sending_without_recipient_fails_before_connecting() {
    let dir = TempDir::new().expect("temp dir");

    cmd()
        .current_dir(dir.path())
        .env_remove("DATABASE_URL")
        .assert()
        .code(1)
        .stderr(contains("No recipient configured"));
}
