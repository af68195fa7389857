mod support;

use predicates::str::contains;
use support::TestHome;

#[test]
fn list_without_backend_config_is_a_user_error() {
    let home = TestHome::new();
    home.cmd()
        .arg("list")
        .assert()
        .code(2)
        .stderr(contains("backend.url is not set"));
}

#[test]
fn list_without_session_reports_not_signed_in() {
    let home = TestHome::new();
    home.write_offline_config();
    home.cmd()
        .arg("list")
        .assert()
        .code(2)
        .stderr(contains("Not signed in"));
}

#[test]
fn add_without_fields_saves_nothing() {
    let home = TestHome::new();
    home.write_offline_config();
    home.cmd()
        .arg("add")
        .assert()
        .code(2)
        .stderr(contains("nothing to save"));
}

#[test]
fn add_rejects_unknown_field() {
    let home = TestHome::new();
    home.write_offline_config();
    home.cmd()
        .args(["add", "--set", "colour=blue"])
        .assert()
        .code(2)
        .stderr(contains("unknown field 'colour'"));
}

#[test]
fn add_rejects_partial_date() {
    let home = TestHome::new();
    home.write_offline_config();
    home.cmd()
        .args(["add", "--set", "project=Atlas", "--set", "deployment_date=2024-01-"])
        .assert()
        .code(2)
        .stderr(contains("Deployment Date must be empty or a date as YYYY-MM-DD."));
}

#[test]
fn edit_rejects_garbage_date_before_any_request() {
    let home = TestHome::new();
    home.write_offline_config();
    home.cmd()
        .args(["edit", "5", "--set", "deployment_date=garbage"])
        .assert()
        .code(2)
        .stderr(contains("Deployment Date must be empty or a date as YYYY-MM-DD."));
}

#[test]
fn reset_password_mismatch_is_checked_locally() {
    let home = TestHome::new();
    home.cmd()
        .args([
            "reset-password",
            "--link",
            "https://console.example.com/reset-password#access_token=tok&type=recovery",
            "--password",
            "abcdef",
            "--confirm",
            "abcdeg",
        ])
        .assert()
        .code(2)
        .stderr(contains("Passwords do not match."));
}

#[test]
fn reset_password_rejects_expired_link() {
    let home = TestHome::new();
    home.cmd()
        .args([
            "--json",
            "reset-password",
            "--link",
            "https://console.example.com/reset-password#error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid+or+has+expired",
            "--password",
            "abcdef",
            "--confirm",
            "abcdef",
        ])
        .assert()
        .code(3)
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("Email link is invalid or has expired"));
}

#[test]
fn logout_without_session_succeeds() {
    let home = TestHome::new();
    home.write_offline_config();
    home.cmd().arg("logout").assert().success();
}

#[test]
fn invalid_backend_url_is_rejected() {
    let home = TestHome::new();
    home.cmd()
        .args(["--url", "ftp://example.com", "list"])
        .assert()
        .code(2)
        .stderr(contains("unsupported scheme 'ftp'"));
}
