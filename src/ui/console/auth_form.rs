//! Sign-in and reset-password forms.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::flight::FlightState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    None,
    Submit,
    /// Secondary action: "forgot password" on the sign-in form.
    Alternate,
    Quit,
}

#[derive(Debug, Clone)]
pub struct AuthField {
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
}

impl AuthField {
    fn new(label: &'static str, secret: bool) -> Self {
        Self {
            label,
            value: String::new(),
            secret,
        }
    }

    /// What the screen shows: secrets are masked.
    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    fields: Vec<AuthField>,
    active: usize,
    pub(crate) flight: FlightState,
    notice: Option<String>,
}

impl AuthForm {
    pub fn sign_in() -> Self {
        Self::with_fields(vec![
            AuthField::new("Email", false),
            AuthField::new("Password", true),
        ])
    }

    pub fn reset_password() -> Self {
        Self::with_fields(vec![
            AuthField::new("New password", true),
            AuthField::new("Confirm password", true),
        ])
    }

    fn with_fields(fields: Vec<AuthField>) -> Self {
        Self {
            fields,
            active: 0,
            flight: FlightState::Idle,
            notice: None,
        }
    }

    pub fn fields(&self) -> &[AuthField] {
        &self.fields
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn value(&self, idx: usize) -> &str {
        self.fields
            .get(idx)
            .map(|field| field.value.as_str())
            .unwrap_or("")
    }

    pub fn error(&self) -> Option<&str> {
        self.flight.error()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_in_flight()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AuthAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('f') => AuthAction::Alternate,
                KeyCode::Char('u') => {
                    if let Some(field) = self.fields.get_mut(self.active) {
                        field.value.clear();
                    }
                    AuthAction::None
                }
                _ => AuthAction::None,
            };
        }

        match key.code {
            KeyCode::Esc => return AuthAction::Quit,
            KeyCode::Tab | KeyCode::Down => self.move_active(1),
            KeyCode::BackTab | KeyCode::Up => self.move_active(-1),
            KeyCode::Enter => {
                if self.active + 1 >= self.fields.len() {
                    return AuthAction::Submit;
                }
                self.move_active(1);
            }
            _ if self.is_busy() => {}
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.active) {
                    field.value.pop();
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                if let Some(field) = self.fields.get_mut(self.active) {
                    field.value.push(ch);
                }
            }
            _ => {}
        }
        AuthAction::None
    }

    fn move_active(&mut self, delta: isize) {
        let len = self.fields.len() as isize;
        if len == 0 {
            return;
        }
        self.active = (self.active as isize + delta).rem_euclid(len) as usize;
    }
}
