#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A throwaway config directory for one CLI invocation sequence.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("taskdesk.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    /// Config pointing at a backend that is never contacted by the test.
    pub fn write_offline_config(&self) -> PathBuf {
        self.write_config(
            r#"
[backend]
url = "http://127.0.0.1:9"
anon_key = "anon-test-key"
timeout_secs = 1
"#,
        )
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskdesk").expect("binary");
        cmd.arg("--config-dir")
            .arg(self.dir.path())
            .env_remove("TASKDESK_CONFIG_DIR")
            .env_remove("TASKDESK_URL")
            .env_remove("TASKDESK_ANON_KEY")
            .env_remove("TASKDESK_PASSWORD")
            .env_remove("TASKDESK_NEW_PASSWORD")
            .env_remove("RUST_LOG");
        cmd
    }
}
