//! Route gate: admit or redirect a navigation based on session presence.

use std::fmt;

use tracing::{debug, warn};

use crate::auth::{self, IdentityProvider, Session, SessionStore};
use crate::error::{Error, Result};
use crate::listing::ViewSelection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    ResetPassword,
    /// The dashboard with its query parameters (`view`, `sort`, `saved`).
    Dashboard(Vec<(String, String)>),
    Other(String),
}

impl Route {
    /// Parse a path such as `/dashboard?view=all`. Any path starting with
    /// `/reset-password` is the reset route.
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.trim();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let base = url::Url::parse("http://console.local/")
            .map_err(|err| Error::OperationFailed(err.to_string()))?;
        let parsed = base
            .join(&path)
            .map_err(|err| Error::InvalidArgument(format!("route '{path}': {err}")))?;

        let route_path = parsed.path().trim_end_matches('/');
        if route_path.starts_with("/reset-password") {
            return Ok(Route::ResetPassword);
        }
        Ok(match route_path {
            "/login" => Route::Login,
            "" | "/dashboard" => Route::Dashboard(
                parsed
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            ),
            other => Route::Other(other.to_string()),
        })
    }

    pub fn dashboard() -> Self {
        Route::Dashboard(Vec::new())
    }

    pub fn dashboard_with(selection: ViewSelection, saved: bool) -> Self {
        let mut params: Vec<(String, String)> = selection
            .to_query()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if saved {
            params.push(("saved".to_string(), "1".to_string()));
        }
        Route::Dashboard(params)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::ResetPassword)
    }

    pub fn query(&self) -> &[(String, String)] {
        match self {
            Route::Dashboard(params) => params,
            _ => &[],
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/login"),
            Route::ResetPassword => f.write_str("/reset-password"),
            Route::Dashboard(params) => {
                f.write_str("/dashboard")?;
                if !params.is_empty() {
                    let query: String = url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(params.iter())
                        .finish();
                    write!(f, "?{query}")?;
                }
                Ok(())
            }
            Route::Other(path) => f.write_str(path),
        }
    }
}

/// What to do when the session lookup itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePolicy {
    /// Treat the session as absent.
    #[default]
    FailClosed,
    /// Admit without redirecting.
    FailOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    Redirect(Route),
}

/// Result of looking up the session: present, absent, or the lookup failed.
#[derive(Debug)]
pub enum Presence {
    Present(Session),
    Absent,
    Unknown(Error),
}

impl From<Result<Option<Session>>> for Presence {
    fn from(result: Result<Option<Session>>) -> Self {
        match result {
            Ok(Some(session)) => Presence::Present(session),
            Ok(None) => Presence::Absent,
            Err(err) => Presence::Unknown(err),
        }
    }
}

pub fn evaluate(route: &Route, presence: &Presence, policy: GatePolicy) -> GateDecision {
    let present = match presence {
        Presence::Present(_) => true,
        Presence::Absent => false,
        Presence::Unknown(err) => match policy {
            GatePolicy::FailOpen => {
                warn!(route = %route, error = %err, "session lookup failed; admitting");
                return GateDecision::Admit;
            }
            GatePolicy::FailClosed => {
                debug!(route = %route, error = %err, "session lookup failed; treating as signed out");
                false
            }
        },
    };

    let decision = match (route, present) {
        (Route::ResetPassword, _) => GateDecision::Admit,
        (Route::Login, true) => GateDecision::Redirect(Route::dashboard()),
        (Route::Login, false) => GateDecision::Admit,
        (_, false) => GateDecision::Redirect(Route::Login),
        (_, true) => GateDecision::Admit,
    };
    debug!(route = %route, present, ?decision, "gate decision");
    decision
}

/// The one accessor for "who is signed in". Every call reads the stored
/// session and checks it with the provider; nothing is cached.
pub struct CurrentSession<'a> {
    store: &'a SessionStore,
    provider: &'a dyn IdentityProvider,
}

impl<'a> CurrentSession<'a> {
    pub fn new(store: &'a SessionStore, provider: &'a dyn IdentityProvider) -> Self {
        Self { store, provider }
    }

    pub fn resolve(&self) -> Result<Option<Session>> {
        let Some(mut session) = self.store.load()? else {
            return Ok(None);
        };

        if session.is_expired(auth::unix_now()) && session.refresh_token.is_some() {
            match self.provider.refresh(&session) {
                Ok(fresh) => {
                    self.store.save(&fresh)?;
                    session = fresh;
                }
                Err(Error::Auth(reason)) => {
                    debug!(%reason, "refresh rejected; clearing session");
                    self.store.clear()?;
                    return Ok(None);
                }
                Err(err) => return Err(err),
            }
        }

        match self.provider.current_user(&session)? {
            Some(user) => {
                session.user = Some(user);
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Decide a navigation with a fresh lookup.
    pub fn gate(&self, route: &Route, policy: GatePolicy) -> GateDecision {
        evaluate(route, &self.resolve().into(), policy)
    }

    /// Sign out: revoke remotely when possible, always drop the local copy.
    pub fn invalidate(&self) -> Result<bool> {
        match self.store.load() {
            Ok(Some(session)) => {
                if let Err(err) = self.provider.sign_out(&session) {
                    warn!(error = %err, "remote sign-out failed; clearing local session");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "unreadable session file; clearing"),
        }
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
            user: None,
        }
    }

    fn unknown() -> Presence {
        Presence::Unknown(Error::Transport("unreachable".to_string()))
    }

    #[test]
    fn routes_parse() {
        assert_eq!(Route::parse("/login").expect("login"), Route::Login);
        assert_eq!(
            Route::parse("/reset-password/confirm").expect("reset"),
            Route::ResetPassword
        );
        let dash = Route::parse("/dashboard?view=all&sort=newest").expect("dash");
        assert_eq!(dash.param("view"), Some("all"));
        assert_eq!(dash.param("sort"), Some("newest"));
        assert_eq!(Route::parse("/").expect("root"), Route::dashboard());
        assert_eq!(
            Route::parse("settings").expect("other"),
            Route::Other("/settings".to_string())
        );
    }

    #[test]
    fn route_display_round_trips() {
        let route = Route::parse("/dashboard?view=all&saved=1").expect("dash");
        assert_eq!(route.to_string(), "/dashboard?view=all&saved=1");
        assert_eq!(Route::parse(&route.to_string()).expect("again"), route);
    }

    #[test]
    fn gate_table() {
        let policy = GatePolicy::FailClosed;
        let present = Presence::Present(session());
        let absent = Presence::Absent;

        assert_eq!(evaluate(&Route::ResetPassword, &absent, policy), GateDecision::Admit);
        assert_eq!(evaluate(&Route::ResetPassword, &present, policy), GateDecision::Admit);
        assert_eq!(
            evaluate(&Route::Login, &present, policy),
            GateDecision::Redirect(Route::dashboard())
        );
        assert_eq!(evaluate(&Route::Login, &absent, policy), GateDecision::Admit);
        assert_eq!(
            evaluate(&Route::dashboard(), &absent, policy),
            GateDecision::Redirect(Route::Login)
        );
        assert_eq!(
            evaluate(&Route::Other("/reports".to_string()), &absent, policy),
            GateDecision::Redirect(Route::Login)
        );
        assert_eq!(evaluate(&Route::dashboard(), &present, policy), GateDecision::Admit);
    }

    #[test]
    fn lookup_failure_follows_policy() {
        assert_eq!(
            evaluate(&Route::dashboard(), &unknown(), GatePolicy::FailClosed),
            GateDecision::Redirect(Route::Login)
        );
        assert_eq!(
            evaluate(&Route::Login, &unknown(), GatePolicy::FailClosed),
            GateDecision::Admit
        );
        assert_eq!(
            evaluate(&Route::ResetPassword, &unknown(), GatePolicy::FailClosed),
            GateDecision::Admit
        );
        assert_eq!(
            evaluate(&Route::dashboard(), &unknown(), GatePolicy::FailOpen),
            GateDecision::Admit
        );
        assert_eq!(
            evaluate(&Route::Login, &unknown(), GatePolicy::FailOpen),
            GateDecision::Admit
        );
    }
}
