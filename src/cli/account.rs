//! Sign-in, sign-out and password recovery commands.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::auth::{self, PASSWORD_UPDATED_MESSAGE};
use crate::error::{Error, Result};
use crate::gate::{evaluate, CurrentSession, GateDecision, Presence, Route};
use crate::output::{emit_success, HumanOutput};

use super::Context;

#[derive(serde::Serialize)]
struct LoginReport {
    email: Option<String>,
    already_signed_in: bool,
    expires_at: Option<i64>,
}

#[derive(serde::Serialize)]
struct LogoutReport {
    removed: bool,
}

#[derive(serde::Serialize)]
struct RecoveryReport {
    email: String,
}

#[derive(serde::Serialize)]
struct ResetReport {
    redirect: String,
}

pub fn run_login(ctx: &Context, email: &str, password: Option<String>) -> Result<()> {
    let backend = ctx.backend()?;
    let current = CurrentSession::new(&ctx.store, backend.identity());

    let presence: Presence = current.resolve().into();
    if let GateDecision::Redirect(_) = evaluate(&Route::Login, &presence, ctx.config.gate_policy()) {
        let session = match presence {
            Presence::Present(session) => Some(session),
            _ => None,
        };
        let signed_in_as = session.as_ref().and_then(|s| s.email().map(str::to_string));
        let mut human = HumanOutput::new(format!(
            "taskdesk login: already signed in{}",
            signed_in_as
                .as_deref()
                .map(|email| format!(" as {email}"))
                .unwrap_or_default()
        ));
        human.push_next_step("taskdesk list");
        human.push_next_step("taskdesk logout");
        return emit_success(
            ctx.output,
            "login",
            &LoginReport {
                email: signed_in_as,
                already_signed_in: true,
                expires_at: session.and_then(|s| s.expires_at),
            },
            Some(&human),
        );
    }

    let password = match password {
        Some(password) => password,
        None => prompt_secret("Password: ")?,
    };
    let session = auth::sign_in(backend.identity(), &ctx.store, email, &password)?;

    let shown = session.email().unwrap_or(email).to_string();
    let mut human = HumanOutput::new(format!("taskdesk login: signed in as {shown}"));
    human.push_summary("session", ctx.store.path().display().to_string());
    human.push_next_step("taskdesk list");
    human.push_next_step("taskdesk console");

    emit_success(
        ctx.output,
        "login",
        &LoginReport {
            email: Some(shown),
            already_signed_in: false,
            expires_at: session.expires_at,
        },
        Some(&human),
    )
}

pub fn run_logout(ctx: &Context) -> Result<()> {
    let removed = match ctx.backend() {
        Ok(backend) => CurrentSession::new(&ctx.store, backend.identity()).invalidate()?,
        Err(err) => {
            tracing::warn!(error = %err, "backend not configured; clearing local session only");
            ctx.store.clear()?
        }
    };

    let header = if removed {
        "taskdesk logout: signed out"
    } else {
        "taskdesk logout: no session"
    };
    let mut human = HumanOutput::new(header);
    human.push_next_step("taskdesk login --email <email>");

    emit_success(ctx.output, "logout", &LogoutReport { removed }, Some(&human))
}

pub fn run_forgot(ctx: &Context, email: &str) -> Result<()> {
    let backend = ctx.backend()?;
    auth::request_recovery(backend.identity(), email)?;

    let mut human = HumanOutput::new(format!(
        "taskdesk forgot-password: recovery email requested for {}",
        email.trim()
    ));
    human.push_next_step("taskdesk reset-password --link <link from email> --password <new> --confirm <new>");

    emit_success(
        ctx.output,
        "forgot-password",
        &RecoveryReport {
            email: email.trim().to_string(),
        },
        Some(&human),
    )
}

pub fn run_reset(ctx: &Context, link: &str, password: &str, confirm: &str) -> Result<()> {
    // Local checks first so a typo never costs a round trip.
    auth::validate_new_password(password, confirm)?;
    let recovery = auth::parse_recovery_link(link, auth::unix_now())?;
    let backend = ctx.backend()?;
    auth::reset_password(backend.identity(), &recovery, password, confirm)?;
    ctx.store.clear()?;

    let redirect = "/login?reset=1".to_string();
    let mut human = HumanOutput::new(format!(
        "taskdesk reset-password: {PASSWORD_UPDATED_MESSAGE}"
    ));
    human.push_next_step("taskdesk login --email <email>");

    emit_success(
        ctx.output,
        "reset-password",
        &ResetReport { redirect },
        Some(&human),
    )
}

fn prompt_line(prompt: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(Error::InvalidArgument("no input on stdin".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompt for a secret. On a terminal the typed characters are not
/// echoed; piped input is read as a plain line.
fn prompt_secret(prompt: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        return prompt_line(prompt);
    }
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;

    let mut secret = String::new();
    let outcome = {
        enable_raw_mode()?;
        let _raw = RawMode;
        loop {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match apply_secret_key(&mut secret, key) {
                        SecretInput::Pending => {}
                        done => break done,
                    }
                }
                _ => {}
            }
        }
    };
    writeln!(stderr)?;
    match outcome {
        SecretInput::Aborted => Err(Error::InvalidArgument("password entry cancelled".to_string())),
        _ => Ok(secret),
    }
}

struct RawMode;

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecretInput {
    Pending,
    Done,
    Aborted,
}

fn apply_secret_key(secret: &mut String, key: KeyEvent) -> SecretInput {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => SecretInput::Aborted,
            KeyCode::Char('u') => {
                secret.clear();
                SecretInput::Pending
            }
            _ => SecretInput::Pending,
        };
    }
    match key.code {
        KeyCode::Enter => SecretInput::Done,
        KeyCode::Esc => SecretInput::Aborted,
        KeyCode::Backspace => {
            secret.pop();
            SecretInput::Pending
        }
        KeyCode::Char(ch) if !ch.is_control() => {
            secret.push(ch);
            SecretInput::Pending
        }
        _ => SecretInput::Pending,
    }
}

pub(super) fn confirm(prompt: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{prompt} [y/N] "))?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn secret_keys_edit_and_finish() {
        let mut secret = String::new();
        for ch in "hunter22".chars() {
            assert_eq!(apply_secret_key(&mut secret, key(KeyCode::Char(ch))), SecretInput::Pending);
        }
        apply_secret_key(&mut secret, key(KeyCode::Backspace));
        assert_eq!(secret, "hunter2");
        assert_eq!(apply_secret_key(&mut secret, key(KeyCode::Enter)), SecretInput::Done);
    }

    #[test]
    fn ctrl_c_and_esc_cancel_secret_entry() {
        let mut secret = "abc".to_string();
        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert_eq!(apply_secret_key(&mut secret, ctrl_u), SecretInput::Pending);
        assert_eq!(secret, "");
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_secret_key(&mut secret, ctrl_c), SecretInput::Aborted);
        assert_eq!(apply_secret_key(&mut secret, key(KeyCode::Esc)), SecretInput::Aborted);
    }
}
