//! Staff sign-in, sign-out and password recovery.
//!
//! The identity protocol itself belongs to the hosted provider; this module
//! holds the session shape, the provider seam and the local checks done
//! before any network call.

mod session_store;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use session_store::SessionStore;

use crate::error::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const INVALID_LINK_MESSAGE: &str =
    "Invalid or expired link. Request a new reset from the sign in page.";
pub const PASSWORD_UPDATED_MESSAGE: &str = "Password updated. Redirecting to sign in…";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.email.as_deref())
    }
}

/// Hosted identity provider.
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Revoke the session remotely.
    fn sign_out(&self, session: &Session) -> Result<()>;

    /// The user behind a session, `None` when the token is no longer valid.
    fn current_user(&self, session: &Session) -> Result<Option<User>>;

    fn refresh(&self, session: &Session) -> Result<Session>;

    fn request_recovery(&self, email: &str) -> Result<()>;

    fn update_password(&self, session: &Session, password: &str) -> Result<()>;
}

/// Sign in and persist the session.
pub fn sign_in(
    provider: &dyn IdentityProvider,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Session> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(Error::Validation(
            "Email and password are required.".to_string(),
        ));
    }
    let session = provider.sign_in(email, password)?;
    store.save(&session)?;
    Ok(session)
}

pub fn request_recovery(provider: &dyn IdentityProvider, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Validation("Enter a valid email address.".to_string()));
    }
    provider.request_recovery(email)
}

/// Local checks for a new password; nothing goes over the wire on failure.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    if password != confirm {
        return Err(Error::Validation("Passwords do not match.".to_string()));
    }
    Ok(())
}

/// Set a new password with a recovery session, then end that session so
/// the user signs in again with the new password.
pub fn reset_password(
    provider: &dyn IdentityProvider,
    recovery: &Session,
    password: &str,
    confirm: &str,
) -> Result<()> {
    validate_new_password(password, confirm)?;
    provider.update_password(recovery, password)?;
    if let Err(err) = provider.sign_out(recovery) {
        warn!(error = %err, "recovery session sign-out failed");
    }
    Ok(())
}

/// Extract the recovery session carried by a password reset link.
///
/// The provider puts the tokens in the URL fragment
/// (`#access_token=..&refresh_token=..&expires_in=..&type=recovery`). An
/// expired or reused link carries `error`/`error_description` instead.
pub fn parse_recovery_link(link: &str, now: i64) -> Result<Session> {
    let parsed = url::Url::parse(link.trim())
        .map_err(|err| Error::InvalidArgument(format!("recovery link: {err}")))?;

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(fragment) = parsed.fragment() {
        params.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }
    let get = |key: &str| {
        params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    };

    if get("error").is_some() || get("error_code").is_some() {
        let reason = get("error_description")
            .or(get("error_code"))
            .or(get("error"))
            .unwrap_or("link rejected");
        return Err(Error::RecoveryExpired(reason.to_string()));
    }

    let access_token = match (get("access_token"), get("type")) {
        (Some(token), Some("recovery")) => token.to_string(),
        _ => {
            return Err(Error::RecoveryExpired(
                "link does not carry a recovery session".to_string(),
            ))
        }
    };
    let expires_at = get("expires_at")
        .and_then(|value| value.parse::<i64>().ok())
        .or_else(|| {
            get("expires_in")
                .and_then(|value| value.parse::<i64>().ok())
                .map(|secs| now + secs)
        });

    let session = Session {
        access_token,
        refresh_token: get("refresh_token").map(str::to_string),
        expires_at,
        user: None,
    };
    if session.is_expired(now) {
        return Err(Error::RecoveryExpired("link has expired".to_string()));
    }
    Ok(session)
}

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
