mod support;

use predicates::str::contains;
use serde_json::Value;
use support::TestHome;

fn gate_json(home: &TestHome, path: &str) -> Value {
    let output = home
        .cmd()
        .args(["--json", "gate", path])
        .output()
        .expect("run gate");
    assert!(output.status.success(), "gate {path} failed");
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn dashboard_redirects_to_login_without_a_session() {
    let home = TestHome::new();
    home.write_offline_config();
    let json = gate_json(&home, "/dashboard");
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["decision"], "redirect");
    assert_eq!(json["data"]["location"], "/login");
}

#[test]
fn unknown_routes_are_protected() {
    let home = TestHome::new();
    home.write_offline_config();
    let json = gate_json(&home, "/settings");
    assert_eq!(json["data"]["decision"], "redirect");
    assert_eq!(json["data"]["location"], "/login");
}

#[test]
fn public_routes_admit_without_a_session() {
    let home = TestHome::new();
    home.write_offline_config();
    for path in ["/login", "/reset-password"] {
        let json = gate_json(&home, path);
        assert_eq!(json["data"]["decision"], "admit", "{path}");
        assert!(json["data"]["location"].is_null());
    }
}

#[test]
fn lookup_failure_is_fail_closed_by_default() {
    // No backend configured: the lookup itself fails.
    let home = TestHome::new();
    home.cmd()
        .args(["gate", "/dashboard?view=all"])
        .assert()
        .success()
        .stdout(contains("redirect /dashboard?view=all -> /login"))
        .stdout(contains("session lookup failed"));
}

#[test]
fn lookup_failure_admits_when_configured() {
    let home = TestHome::new();
    home.write_config(
        r#"
[gate]
on_lookup_error = "admit"
"#,
    );
    let json = gate_json(&home, "/dashboard");
    assert_eq!(json["data"]["decision"], "admit");
    assert!(json["warnings"][0]
        .as_str()
        .unwrap_or_default()
        .contains("session lookup failed"));
}
