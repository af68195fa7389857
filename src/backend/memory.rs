//! In-process backend for tests and offline demos. Keeps rows in memory,
//! assigns uuid ids and counts every call so tests can assert on traffic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::auth::{IdentityProvider, Session, User};
use crate::error::{Error, Result};
use crate::format;
use crate::listing::TaskQuery;
use crate::record::{TaskId, TaskPayload, TaskRecord};
use crate::schema::TaskField;

use super::TaskGateway;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub user_lookups: usize,
    pub sign_outs: usize,
    pub password_updates: usize,
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    user_lookups: AtomicUsize,
    sign_outs: AtomicUsize,
    password_updates: AtomicUsize,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct State {
    rows: Vec<Map<String, Value>>,
    accounts: Vec<Account>,
    /// Currently valid access tokens and their user ids.
    tokens: Vec<(String, String)>,
    recovery_requests: Vec<String>,
    fail_writes: Option<String>,
    identity_down: bool,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    counters: Counters,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::OperationFailed("memory backend poisoned".to_string()))
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        if let Ok(mut state) = self.state() {
            let id = uuid::Uuid::new_v4().to_string();
            state.accounts.push(Account {
                user: User {
                    id,
                    email: Some(email.to_string()),
                },
                password: password.to_string(),
            });
        }
        self
    }

    /// Insert a raw row as if it came from the server.
    pub fn seed(&self, row: Value) -> Result<()> {
        let Value::Object(map) = row else {
            return Err(Error::InvalidArgument("seed rows must be objects".to_string()));
        };
        self.state()?.rows.push(map);
        Ok(())
    }

    /// Make every write fail with `message` until cleared with `None`.
    pub fn fail_writes(&self, message: Option<&str>) -> Result<()> {
        self.state()?.fail_writes = message.map(str::to_string);
        Ok(())
    }

    /// Simulate an unreachable identity provider.
    pub fn set_identity_down(&self, down: bool) -> Result<()> {
        self.state()?.identity_down = down;
        Ok(())
    }

    /// Hand out a valid session for an account without a password check.
    pub fn issue_session(&self, email: &str) -> Result<Session> {
        let mut state = self.state()?;
        let user = state
            .accounts
            .iter()
            .find(|account| account.user.email.as_deref() == Some(email))
            .map(|account| account.user.clone())
            .ok_or_else(|| Error::Auth(format!("no account for {email}")))?;
        Ok(issue(&mut state, user))
    }

    pub fn revoke_all(&self) -> Result<()> {
        self.state()?.tokens.clear();
        Ok(())
    }

    pub fn recovery_requests(&self) -> Vec<String> {
        self.state()
            .map(|state| state.recovery_requests.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.state().map(|state| state.rows.len()).unwrap_or(0)
    }

    pub fn counts(&self) -> CallCounts {
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        CallCounts {
            list: load(&self.counters.list),
            create: load(&self.counters.create),
            update: load(&self.counters.update),
            delete: load(&self.counters.delete),
            user_lookups: load(&self.counters.user_lookups),
            sign_outs: load(&self.counters.sign_outs),
            password_updates: load(&self.counters.password_updates),
        }
    }

    fn authorize(state: &State, session: &Session) -> Result<()> {
        if state
            .tokens
            .iter()
            .any(|(token, _)| token == &session.access_token)
        {
            Ok(())
        } else {
            Err(Error::NotSignedIn)
        }
    }

    fn check_writes(state: &State) -> Result<()> {
        match &state.fail_writes {
            Some(message) => Err(Error::Backend {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn issue(state: &mut State, user: User) -> Session {
    let token = uuid::Uuid::new_v4().to_string();
    state.tokens.push((token.clone(), user.id.clone()));
    Session {
        access_token: token,
        refresh_token: Some(uuid::Uuid::new_v4().to_string()),
        expires_at: Some(crate::auth::unix_now() + 3600),
        user: Some(user),
    }
}

fn row_id(row: &Map<String, Value>) -> Option<String> {
    match row.get("id")? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn merge_payload(row: &mut Map<String, Value>, payload: &TaskPayload) {
    for (key, value) in payload.as_map() {
        row.insert(key.clone(), value.clone());
    }
}

impl TaskGateway for MemoryBackend {
    fn list(&self, session: &Session, query: &TaskQuery) -> Result<Vec<TaskRecord>> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        let state = self.state()?;
        Self::authorize(&state, session)?;
        let mut records: Vec<TaskRecord> = state
            .rows
            .iter()
            .map(TaskRecord::from_row)
            .collect::<Result<_>>()?;
        if let Some(since) = query.since {
            records.retain(|record| {
                record
                    .value(TaskField::DeploymentDate)
                    .and_then(format::parse_date)
                    .is_some_and(|date| date >= since)
            });
        }
        // Server order: deployment_date desc, nulls first like PostgreSQL.
        records.sort_by_key(|record| {
            std::cmp::Reverse(
                record
                    .value(TaskField::DeploymentDate)
                    .map(|value| format::timestamp_key(Some(value)))
                    .unwrap_or(i64::MAX),
            )
        });
        Ok(records)
    }

    fn create(&self, session: &Session, payload: &TaskPayload) -> Result<TaskRecord> {
        self.counters.create.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state()?;
        Self::authorize(&state, session)?;
        Self::check_writes(&state)?;
        let now = Utc::now().to_rfc3339();
        let mut row = Map::new();
        row.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
        merge_payload(&mut row, payload);
        row.insert("created_at".to_string(), Value::String(now.clone()));
        row.insert("updated_at".to_string(), Value::String(now));
        let record = TaskRecord::from_row(&row)?;
        state.rows.push(row);
        Ok(record)
    }

    fn update(&self, session: &Session, id: &TaskId, payload: &TaskPayload) -> Result<TaskRecord> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state()?;
        Self::authorize(&state, session)?;
        Self::check_writes(&state)?;
        let row = state
            .rows
            .iter_mut()
            .find(|row| row_id(row).as_deref() == Some(id.as_str()))
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        merge_payload(row, payload);
        row.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        TaskRecord::from_row(row)
    }

    fn delete(&self, session: &Session, id: &TaskId) -> Result<()> {
        self.counters.delete.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state()?;
        Self::authorize(&state, session)?;
        Self::check_writes(&state)?;
        let before = state.rows.len();
        state
            .rows
            .retain(|row| row_id(row).as_deref() != Some(id.as_str()));
        if state.rows.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl IdentityProvider for MemoryBackend {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let mut state = self.state()?;
        if state.identity_down {
            return Err(Error::Transport("identity provider unreachable".to_string()));
        }
        let user = state
            .accounts
            .iter()
            .find(|account| {
                account.user.email.as_deref() == Some(email) && account.password == password
            })
            .map(|account| account.user.clone())
            .ok_or_else(|| Error::Auth("Invalid login credentials".to_string()))?;
        Ok(issue(&mut state, user))
    }

    fn sign_out(&self, session: &Session) -> Result<()> {
        self.counters.sign_outs.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state()?;
        if state.identity_down {
            return Err(Error::Transport("identity provider unreachable".to_string()));
        }
        state
            .tokens
            .retain(|(token, _)| token != &session.access_token);
        Ok(())
    }

    fn current_user(&self, session: &Session) -> Result<Option<User>> {
        self.counters.user_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state()?;
        if state.identity_down {
            return Err(Error::Transport("identity provider unreachable".to_string()));
        }
        let Some((_, user_id)) = state
            .tokens
            .iter()
            .find(|(token, _)| token == &session.access_token)
        else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .iter()
            .find(|account| &account.user.id == user_id)
            .map(|account| account.user.clone()))
    }

    fn refresh(&self, session: &Session) -> Result<Session> {
        let mut state = self.state()?;
        let user_id = state
            .tokens
            .iter()
            .find(|(token, _)| token == &session.access_token)
            .map(|(_, user_id)| user_id.clone())
            .ok_or_else(|| Error::Auth("Invalid Refresh Token".to_string()))?;
        let user = state
            .accounts
            .iter()
            .find(|account| account.user.id == user_id)
            .map(|account| account.user.clone())
            .ok_or_else(|| Error::Auth("user no longer exists".to_string()))?;
        state
            .tokens
            .retain(|(token, _)| token != &session.access_token);
        Ok(issue(&mut state, user))
    }

    fn request_recovery(&self, email: &str) -> Result<()> {
        self.state()?.recovery_requests.push(email.to_string());
        Ok(())
    }

    fn update_password(&self, session: &Session, password: &str) -> Result<()> {
        self.counters.password_updates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state()?;
        let user_id = state
            .tokens
            .iter()
            .find(|(token, _)| token == &session.access_token)
            .map(|(_, user_id)| user_id.clone())
            .ok_or_else(|| Error::Auth("Auth session missing!".to_string()))?;
        let account = state
            .accounts
            .iter_mut()
            .find(|account| account.user.id == user_id)
            .ok_or_else(|| Error::Auth("user no longer exists".to_string()))?;
        account.password = password.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_orders_newest_first_and_filters_window() {
        let backend = MemoryBackend::new().with_account("ops@example.com", "secret1");
        let session = backend.issue_session("ops@example.com").expect("session");
        backend.seed(json!({ "id": 1, "deployment_date": "2024-01-10" })).expect("seed");
        backend.seed(json!({ "id": 2, "deployment_date": "2024-03-01" })).expect("seed");
        backend.seed(json!({ "id": 3, "deployment_date": null })).expect("seed");

        let all = backend.list(&session, &TaskQuery { since: None }).expect("list");
        let ids: Vec<_> = all.iter().map(|row| row.id.to_string()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);

        let since = chrono::NaiveDate::from_ymd_opt(2024, 2, 1);
        let recent = backend.list(&session, &TaskQuery { since }).expect("list");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id.as_str(), "2");
    }

    #[test]
    fn writes_require_a_live_token() {
        let backend = MemoryBackend::new().with_account("ops@example.com", "secret1");
        let session = backend.issue_session("ops@example.com").expect("session");
        backend.revoke_all().expect("revoke");
        let payload = TaskPayload::from_values(&crate::record::FieldValues::empty());
        assert!(matches!(
            backend.create(&session, &payload),
            Err(Error::NotSignedIn)
        ));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let backend = MemoryBackend::new().with_account("ops@example.com", "secret1");
        assert!(matches!(
            backend.sign_in("ops@example.com", "nope"),
            Err(Error::Auth(_))
        ));
        assert!(backend.sign_in("ops@example.com", "secret1").is_ok());
    }
}
