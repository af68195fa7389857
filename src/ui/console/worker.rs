//! Background worker: every network call the console makes runs here.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use chrono::Local;

use crate::auth::{self, Session, SessionStore};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::gate::{evaluate, CurrentSession, GateDecision, GatePolicy, Presence, Route};
use crate::listing::ViewSelection;
use crate::menu::FormSubmit;
use crate::form::FormMode;
use crate::persist::{self, ActionOutcome};
use crate::record::TaskId;
use crate::record::TaskRecord;

pub(crate) enum LoadRequest {
    Navigate(Route),
    Reload(ViewSelection),
    SignIn { email: String, password: String },
    Recover(String),
    SignOut,
    ResetPassword {
        recovery: Session,
        password: String,
        confirm: String,
    },
    Save(FormSubmit),
    Delete(TaskId),
}

#[derive(Debug)]
pub(crate) enum UiMsg {
    Routed {
        requested: Route,
        decision: GateDecision,
        email: Option<String>,
    },
    Loaded {
        selection: ViewSelection,
        result: std::result::Result<Vec<TaskRecord>, String>,
    },
    SignedIn(std::result::Result<(), String>),
    RecoverySent(std::result::Result<(), String>),
    SignedOut,
    PasswordReset(std::result::Result<(), String>),
    Saved {
        ticket: u64,
        result: std::result::Result<ActionOutcome, String>,
    },
    Deleted(std::result::Result<ActionOutcome, String>),
    /// A data call was rejected because the session is gone.
    SessionLost,
}

pub(crate) fn spawn_worker(
    backend: Arc<dyn Backend>,
    store: SessionStore,
    policy: GatePolicy,
    req_rx: Receiver<LoadRequest>,
    ui_tx: Sender<UiMsg>,
) {
    thread::spawn(move || {
        while let Ok(req) = req_rx.recv() {
            let msg = handle_request(backend.as_ref(), &store, policy, req);
            if ui_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

/// Run one request to completion. Pure with respect to the UI, so the
/// console logic can be driven synchronously in tests.
pub(crate) fn handle_request(
    backend: &dyn Backend,
    store: &SessionStore,
    policy: GatePolicy,
    req: LoadRequest,
) -> UiMsg {
    match req {
        LoadRequest::Navigate(requested) => {
            let presence: Presence = CurrentSession::new(store, backend.identity())
                .resolve()
                .into();
            let email = match &presence {
                Presence::Present(session) => session.email().map(str::to_string),
                _ => None,
            };
            let decision = evaluate(&requested, &presence, policy);
            UiMsg::Routed {
                requested,
                decision,
                email,
            }
        }
        LoadRequest::Reload(selection) => {
            let result = stored_session(store).and_then(|session| {
                persist::list_tasks(
                    backend.gateway(),
                    &session,
                    selection,
                    Local::now().date_naive(),
                )
            });
            match result {
                Err(Error::NotSignedIn) => UiMsg::SessionLost,
                result => UiMsg::Loaded {
                    selection,
                    result: result.map_err(|err| err.to_string()),
                },
            }
        }
        LoadRequest::SignIn { email, password } => UiMsg::SignedIn(
            auth::sign_in(backend.identity(), store, &email, &password)
                .map(|_| ())
                .map_err(|err| err.to_string()),
        ),
        LoadRequest::Recover(email) => UiMsg::RecoverySent(
            auth::request_recovery(backend.identity(), &email).map_err(|err| err.to_string()),
        ),
        LoadRequest::SignOut => {
            if let Err(err) = CurrentSession::new(store, backend.identity()).invalidate() {
                tracing::warn!(error = %err, "sign-out failed");
            }
            UiMsg::SignedOut
        }
        LoadRequest::ResetPassword {
            recovery,
            password,
            confirm,
        } => {
            let result = auth::reset_password(backend.identity(), &recovery, &password, &confirm)
                .and_then(|()| store.clear().map(|_| ()));
            UiMsg::PasswordReset(result.map_err(|err| err.to_string()))
        }
        LoadRequest::Save(submit) => {
            let result = stored_session(store).and_then(|session| match &submit.mode {
                FormMode::Add => persist::create_task(backend.gateway(), &session, &submit.values),
                FormMode::Edit(id) => {
                    persist::update_task(backend.gateway(), &session, id, &submit.values, None)
                }
            });
            match result {
                Err(Error::NotSignedIn) => UiMsg::SessionLost,
                result => UiMsg::Saved {
                    ticket: submit.ticket,
                    result: result.map_err(|err| err.to_string()),
                },
            }
        }
        LoadRequest::Delete(id) => {
            let result = stored_session(store)
                .and_then(|session| persist::delete_task(backend.gateway(), &session, &id));
            match result {
                Err(Error::NotSignedIn) => UiMsg::SessionLost,
                result => UiMsg::Deleted(result.map_err(|err| err.to_string())),
            }
        }
    }
}

/// The stored token for data calls. Gating already checked it with the
/// identity provider; an expired token surfaces as `NotSignedIn`.
fn stored_session(store: &SessionStore) -> Result<Session> {
    store.load()?.ok_or(Error::NotSignedIn)
}
