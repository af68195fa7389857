//! The signed-in session, kept as `session.json` in the config directory.
//!
//! Readers never cache: every gating decision reads the file again. Writes
//! and removals happen under an exclusive `fs2` lock and replace the file
//! atomically.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::Session;

pub const SESSION_FILE: &str = "session.json";
const LOCK_FILE: &str = "session.lock";

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

struct LockGuard(fs::File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Io(err)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let _lock = self.lock()?;
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut temp, session)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(self.path())
            .map_err(|err| Error::Io(err.error))?;
        Ok(())
    }

    /// Remove the stored session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        let _lock = self.lock()?;
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn lock(&self) -> Result<LockGuard> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()
            .map_err(|_| Error::LockFailed(path.clone()))?;
        Ok(LockGuard(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;

    fn session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(1_700_000_000),
            user: Some(User {
                id: "u1".to_string(),
                email: Some("ops@example.com".to_string()),
            }),
        }
    }

    #[test]
    fn missing_file_means_no_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path());
        assert_eq!(store.load().expect("load"), None);
        assert!(!store.clear().expect("clear"));
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("cfg"));
        store.save(&session()).expect("save");
        assert_eq!(store.load().expect("load"), Some(session()));
        assert!(store.clear().expect("clear"));
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path());
        fs::write(store.path(), "{not json").expect("write");
        assert!(matches!(store.load(), Err(Error::Json(_))));
    }
}
