//! PostgREST data API and GoTrue identity API over `ureq`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use ureq::http::Response;
use ureq::Body;

use crate::auth::{self, IdentityProvider, Session, User};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::listing::TaskQuery;
use crate::record::{TaskId, TaskPayload, TaskRecord};

use super::TaskGateway;

pub struct RestBackend {
    agent: ureq::Agent,
    base: url::Url,
    anon_key: String,
    table: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<User>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| auth::unix_now() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let (base, anon_key) = config.endpoint()?;
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();
        Ok(Self {
            agent,
            base,
            anon_key,
            table: config.table.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<String> {
        self.base
            .join(path)
            .map(|url| url.to_string())
            .map_err(|err| Error::InvalidConfig(format!("backend.url: {err}")))
    }

    fn table_url(&self) -> Result<String> {
        self.url(&format!("rest/v1/{}", self.table))
    }

    fn bearer(session: &Session) -> String {
        format!("Bearer {}", session.access_token)
    }
}

/// Status plus parsed JSON body (`Null` when empty).
fn read_response(mut response: Response<Body>) -> Result<(u16, Value)> {
    let status = response.status().as_u16();
    let text = response.body_mut().read_to_string()?;
    if text.trim().is_empty() {
        return Ok((status, Value::Null));
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok((status, value)),
        Err(_) if !(200..300).contains(&status) => Ok((status, Value::String(text))),
        Err(err) => Err(Error::Json(err)),
    }
}

/// Best human message from a PostgREST or GoTrue error body.
fn error_message(body: &Value) -> String {
    match body {
        Value::Object(map) => {
            let text = ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .unwrap_or("request failed")
                .to_string();
            match map.get("hint").and_then(Value::as_str) {
                Some(hint) if !hint.is_empty() => format!("{text} ({hint})"),
                _ => text,
            }
        }
        Value::String(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => "request failed".to_string(),
    }
}

/// Map a data API response: any 2xx is the body, 401 means the session is
/// gone, everything else is a backend error.
fn data_result(status: u16, body: Value) -> Result<Value> {
    if (200..300).contains(&status) {
        return Ok(body);
    }
    let message = error_message(&body);
    warn!(status, %message, "data request failed");
    if status == 401 {
        return Err(Error::NotSignedIn);
    }
    Err(Error::Backend { status, message })
}

/// Map an identity API response: client errors are authentication failures.
fn identity_result(status: u16, body: Value) -> Result<Value> {
    if (200..300).contains(&status) {
        return Ok(body);
    }
    let message = error_message(&body);
    if (400..500).contains(&status) {
        return Err(Error::Auth(message));
    }
    warn!(status, %message, "identity request failed");
    Err(Error::Backend { status, message })
}

fn rows(body: Value) -> Result<Vec<TaskRecord>> {
    match body {
        Value::Array(items) => TaskRecord::from_rows(&items),
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(vec![TaskRecord::from_row(&map)?]),
        other => Err(Error::OperationFailed(format!(
            "unexpected backend response: {other}"
        ))),
    }
}

fn single_row(body: Value, id: Option<&TaskId>) -> Result<TaskRecord> {
    rows(body)?.into_iter().next().ok_or_else(|| match id {
        Some(id) => Error::NotFound(id.to_string()),
        None => Error::OperationFailed("backend returned no row".to_string()),
    })
}

impl TaskGateway for RestBackend {
    fn list(&self, session: &Session, query: &TaskQuery) -> Result<Vec<TaskRecord>> {
        let url = self.table_url()?;
        debug!(%url, since = ?query.since, "list tasks");
        let mut request = self
            .agent
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .query("select", "*")
            .query("order", "deployment_date.desc");
        if let Some(since) = query.since {
            request = request.query("deployment_date", format!("gte.{}", since.format("%Y-%m-%d")));
        }
        let (status, body) = read_response(request.call()?)?;
        rows(data_result(status, body)?)
    }

    fn create(&self, session: &Session, payload: &TaskPayload) -> Result<TaskRecord> {
        let url = self.table_url()?;
        debug!(%url, "create task");
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .header("Prefer", "return=representation")
            .send_json(payload.as_map())?;
        let (status, body) = read_response(response)?;
        single_row(data_result(status, body)?, None)
    }

    fn update(&self, session: &Session, id: &TaskId, payload: &TaskPayload) -> Result<TaskRecord> {
        let url = self.table_url()?;
        debug!(%url, %id, "update task");
        let response = self
            .agent
            .patch(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .header("Prefer", "return=representation")
            .query("id", format!("eq.{id}"))
            .send_json(payload.as_map())?;
        let (status, body) = read_response(response)?;
        single_row(data_result(status, body)?, Some(id))
    }

    fn delete(&self, session: &Session, id: &TaskId) -> Result<()> {
        let url = self.table_url()?;
        debug!(%url, %id, "delete task");
        let response = self
            .agent
            .delete(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .header("Prefer", "return=representation")
            .query("id", format!("eq.{id}"))
            .call()?;
        let (status, body) = read_response(response)?;
        single_row(data_result(status, body)?, Some(id)).map(|_| ())
    }
}

impl IdentityProvider for RestBackend {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.url("auth/v1/token")?;
        debug!(%url, "password sign-in");
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.anon_key)
            .query("grant_type", "password")
            .send_json(json!({ "email": email, "password": password }))?;
        let (status, body) = read_response(response)?;
        let token: TokenResponse = serde_json::from_value(identity_result(status, body)?)?;
        Ok(token.into_session())
    }

    fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.url("auth/v1/logout")?;
        debug!(%url, "sign out");
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .send_empty()?;
        let (status, body) = read_response(response)?;
        // An already-revoked token is as good as signed out.
        if status == 401 || status == 403 {
            return Ok(());
        }
        identity_result(status, body).map(|_| ())
    }

    fn current_user(&self, session: &Session) -> Result<Option<User>> {
        let url = self.url("auth/v1/user")?;
        debug!(%url, "session lookup");
        let response = self
            .agent
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .call()?;
        let (status, body) = read_response(response)?;
        if status == 401 || status == 403 {
            return Ok(None);
        }
        let body = identity_result(status, body)?;
        Ok(Some(serde_json::from_value(body)?))
    }

    fn refresh(&self, session: &Session) -> Result<Session> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::Auth("session has no refresh token".to_string()))?;
        let url = self.url("auth/v1/token")?;
        debug!(%url, "refresh session");
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.anon_key)
            .query("grant_type", "refresh_token")
            .send_json(json!({ "refresh_token": refresh_token }))?;
        let (status, body) = read_response(response)?;
        let token: TokenResponse = serde_json::from_value(identity_result(status, body)?)?;
        Ok(token.into_session())
    }

    fn request_recovery(&self, email: &str) -> Result<()> {
        let url = self.url("auth/v1/recover")?;
        debug!(%url, "request recovery email");
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.anon_key)
            .send_json(json!({ "email": email }))?;
        let (status, body) = read_response(response)?;
        identity_result(status, body).map(|_| ())
    }

    fn update_password(&self, session: &Session, password: &str) -> Result<()> {
        let url = self.url("auth/v1/user")?;
        debug!(%url, "update password");
        let response = self
            .agent
            .put(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &Self::bearer(session))
            .send_json(json!({ "password": password }))?;
        let (status, body) = read_response(response)?;
        identity_result(status, body).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_descriptions() {
        assert_eq!(
            error_message(&json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(&json!({ "message": "permission denied", "hint": "check RLS" })),
            "permission denied (check RLS)"
        );
        assert_eq!(error_message(&Value::Null), "request failed");
        assert_eq!(error_message(&Value::String(" bad gateway ".to_string())), "bad gateway");
    }

    #[test]
    fn identity_client_errors_are_auth_failures() {
        let err = identity_result(400, json!({ "msg": "Invalid login credentials" }))
            .expect_err("auth");
        assert!(matches!(err, Error::Auth(ref msg) if msg == "Invalid login credentials"));
        let err = identity_result(503, Value::Null).expect_err("backend");
        assert!(matches!(err, Error::Backend { status: 503, .. }));
    }

    #[test]
    fn data_unauthorized_means_signed_out() {
        assert!(matches!(data_result(401, Value::Null), Err(Error::NotSignedIn)));
        assert!(matches!(
            data_result(409, json!({ "message": "duplicate" })),
            Err(Error::Backend { status: 409, .. })
        ));
        assert_eq!(data_result(204, Value::Null).expect("ok"), Value::Null);
    }

    #[test]
    fn empty_write_response_is_not_found() {
        let id = TaskId::new("9").expect("id");
        assert!(matches!(
            single_row(json!([]), Some(&id)),
            Err(Error::NotFound(_))
        ));
        let row = single_row(json!([{ "id": 9, "project": "x" }]), Some(&id)).expect("row");
        assert_eq!(row.id, id);
    }

    #[test]
    fn new_requires_endpoint() {
        assert!(RestBackend::new(&BackendConfig::default()).is_err());
        let config = BackendConfig {
            url: Some("https://x.supabase.co".to_string()),
            anon_key: Some("anon".to_string()),
            ..BackendConfig::default()
        };
        let backend = RestBackend::new(&config).expect("backend");
        assert_eq!(
            backend.table_url().expect("url"),
            "https://x.supabase.co/rest/v1/tasks"
        );
    }
}
