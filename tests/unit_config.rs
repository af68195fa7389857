use std::fs;

use taskdesk::config::{Config, CONFIG_FILE};
use taskdesk::gate::GatePolicy;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_dir(dir.path()).expect("load");

    assert!(config.backend.url.is_none());
    assert_eq!(config.backend.table, "tasks");
    assert_eq!(config.dashboard.recent_days, 30);
    assert_eq!(config.gate_policy(), GatePolicy::FailClosed);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[backend]
url = "https://abc.supabase.co"
anon_key = "anon"
table = "deployments"

[dashboard]
recent_days = 7
flash_ms = 500

[gate]
on_lookup_error = "admit"
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_from_dir(dir.path())?;
    assert_eq!(config.backend.table, "deployments");
    assert_eq!(config.dashboard.recent_days, 7);
    assert_eq!(config.dashboard.flash_ms, 500);
    assert_eq!(config.gate_policy(), GatePolicy::FailOpen);
    let (url, key) = config.backend.endpoint()?;
    assert_eq!(url.host_str(), Some("abc.supabase.co"));
    assert_eq!(key, "anon");
    Ok(())
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    for toml in [
        "[dashboard]\nrecent_days = 0\n",
        "[gate]\non_lookup_error = \"maybe\"\n",
        "[backend]\ntable = \"tasks; drop\"\n",
    ] {
        fs::write(dir.path().join(CONFIG_FILE), toml).expect("write");
        assert!(Config::load_from_dir(dir.path()).is_err(), "{toml}");
    }
}

#[test]
fn flag_overrides_replace_file_values() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default().with_overrides(
        Some("http://localhost:54321".to_string()),
        Some("local-key".to_string()),
    )?;
    let (url, key) = config.backend.endpoint()?;
    assert_eq!(url.port(), Some(54321));
    assert_eq!(key, "local-key");
    Ok(())
}
