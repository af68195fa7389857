use taskdesk::auth::{self, Session, SessionStore};
use taskdesk::backend::MemoryBackend;
use taskdesk::error::Error;
use taskdesk::gate::{CurrentSession, GateDecision, GatePolicy, Route};

const EMAIL: &str = "ops@example.com";
const PASSWORD: &str = "secret1";

fn setup() -> (tempfile::TempDir, SessionStore, MemoryBackend) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    let backend = MemoryBackend::new().with_account(EMAIL, PASSWORD);
    (dir, store, backend)
}

#[test]
fn sign_in_persists_and_gate_admits_dashboard() {
    let (_dir, store, backend) = setup();
    let session = auth::sign_in(&backend, &store, EMAIL, PASSWORD).expect("sign in");
    assert_eq!(session.email(), Some(EMAIL));
    assert_eq!(store.load().expect("load"), Some(session));

    let current = CurrentSession::new(&store, &backend);
    assert_eq!(current.gate(&Route::dashboard(), GatePolicy::FailClosed), GateDecision::Admit);
    assert_eq!(
        current.gate(&Route::Login, GatePolicy::FailClosed),
        GateDecision::Redirect(Route::dashboard())
    );
}

#[test]
fn wrong_password_stores_nothing() {
    let (_dir, store, backend) = setup();
    let err = auth::sign_in(&backend, &store, EMAIL, "nope").expect_err("rejected");
    assert!(matches!(err, Error::Auth(_)));
    assert!(store.load().expect("load").is_none());
}

#[test]
fn every_resolve_checks_with_provider() {
    let (_dir, store, backend) = setup();
    auth::sign_in(&backend, &store, EMAIL, PASSWORD).expect("sign in");
    let current = CurrentSession::new(&store, &backend);
    current.resolve().expect("first");
    current.resolve().expect("second");
    assert_eq!(backend.counts().user_lookups, 2);

    backend.revoke_all().expect("revoke");
    assert!(current.resolve().expect("third").is_none());
    assert_eq!(
        current.gate(&Route::dashboard(), GatePolicy::FailClosed),
        GateDecision::Redirect(Route::Login)
    );
}

#[test]
fn expired_session_is_refreshed_and_saved() {
    let (_dir, store, backend) = setup();
    let mut session = auth::sign_in(&backend, &store, EMAIL, PASSWORD).expect("sign in");
    session.expires_at = Some(1);
    store.save(&session).expect("save");

    let resolved = CurrentSession::new(&store, &backend)
        .resolve()
        .expect("resolve")
        .expect("present");
    assert_ne!(resolved.access_token, session.access_token);
    let stored = store.load().expect("load").expect("stored");
    assert_eq!(stored.access_token, resolved.access_token);
}

#[test]
fn lookup_failure_follows_policy() {
    let (_dir, store, backend) = setup();
    auth::sign_in(&backend, &store, EMAIL, PASSWORD).expect("sign in");
    backend.set_identity_down(true).expect("down");

    let current = CurrentSession::new(&store, &backend);
    assert_eq!(
        current.gate(&Route::dashboard(), GatePolicy::FailClosed),
        GateDecision::Redirect(Route::Login)
    );
    assert_eq!(current.gate(&Route::dashboard(), GatePolicy::FailOpen), GateDecision::Admit);
}

#[test]
fn invalidate_clears_local_copy_even_when_provider_is_down() {
    let (_dir, store, backend) = setup();
    auth::sign_in(&backend, &store, EMAIL, PASSWORD).expect("sign in");
    backend.set_identity_down(true).expect("down");

    let removed = CurrentSession::new(&store, &backend)
        .invalidate()
        .expect("invalidate");
    assert!(removed);
    assert!(store.load().expect("load").is_none());
}

#[test]
fn reset_password_updates_and_ends_recovery_session() {
    let (_dir, _store, backend) = setup();
    let recovery: Session = backend.issue_session(EMAIL).expect("recovery");

    let err = auth::reset_password(&backend, &recovery, "abc", "abc").expect_err("short");
    assert_eq!(err.to_string(), "Password must be at least 6 characters.");
    assert_eq!(backend.counts().password_updates, 0);

    auth::reset_password(&backend, &recovery, "newpass1", "newpass1").expect("reset");
    assert_eq!(backend.counts().password_updates, 1);
    assert_eq!(backend.counts().sign_outs, 1);

    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    assert!(auth::sign_in(&backend, &store, EMAIL, PASSWORD).is_err());
    assert!(auth::sign_in(&backend, &store, EMAIL, "newpass1").is_ok());
}

#[test]
fn recovery_request_needs_an_email() {
    let (_dir, _store, backend) = setup();
    assert!(matches!(
        auth::request_recovery(&backend, "not-an-email"),
        Err(Error::Validation(_))
    ));
    auth::request_recovery(&backend, EMAIL).expect("request");
    assert_eq!(backend.recovery_requests(), vec![EMAIL.to_string()]);
}
