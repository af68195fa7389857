//! Per-row action menu, the add/edit form slot and delete confirmation.
//!
//! At most one row menu and at most one form are open at a time; opening
//! one closes the other. Delete always goes through an explicit
//! confirmation and is single-flight.

use crate::flight::FlightState;
use crate::form::{FormMode, FormSession};
use crate::record::{FieldValues, TaskId, TaskRecord};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this record?";

/// A form submit handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmit {
    pub ticket: u64,
    pub mode: FormMode,
    pub values: FieldValues,
}

/// What happened when a submit result came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormSettled {
    /// The result belonged to a form that is no longer open.
    Stale,
    /// Add succeeded and the form closed.
    Created,
    /// Edit succeeded; the form stays open with a clean baseline.
    Updated,
    /// The write failed; the form keeps its edits.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct RowActions {
    open_menu: Option<TaskId>,
    form: Option<FormSession>,
    pending_delete: Option<TaskId>,
    delete_flight: FlightState,
}

impl RowActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_menu(&self) -> Option<&TaskId> {
        self.open_menu.as_ref()
    }

    pub fn form(&self) -> Option<&FormSession> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormSession> {
        self.form.as_mut()
    }

    pub fn pending_delete(&self) -> Option<&TaskId> {
        self.pending_delete.as_ref()
    }

    pub fn is_deleting(&self) -> bool {
        self.delete_flight.is_in_flight()
    }

    pub fn delete_flight(&self) -> &FlightState {
        &self.delete_flight
    }

    fn form_busy(&self) -> bool {
        self.form.as_ref().is_some_and(|form| form.is_submitting())
    }

    /// Open the menu for a row, or close it when it is already open.
    /// Disabled while a delete is in flight or a form is saving.
    pub fn toggle_menu(&mut self, id: &TaskId) -> bool {
        if self.is_deleting() || self.form_busy() {
            return false;
        }
        if self.open_menu.as_ref() == Some(id) {
            self.open_menu = None;
        } else {
            self.form = None;
            self.open_menu = Some(id.clone());
        }
        true
    }

    /// Any interaction outside the open menu.
    pub fn dismiss_menu(&mut self) {
        self.open_menu = None;
    }

    pub fn open_add(&mut self) -> bool {
        self.open_form(FormSession::open_add())
    }

    pub fn open_edit(&mut self, record: &TaskRecord) -> bool {
        self.open_form(FormSession::open_edit(record))
    }

    fn open_form(&mut self, form: FormSession) -> bool {
        if self.form_busy() {
            return false;
        }
        self.open_menu = None;
        self.pending_delete = None;
        self.form = Some(form);
        true
    }

    /// Close the form; refused while it is saving.
    pub fn close_form(&mut self) -> bool {
        if self.form_busy() {
            return false;
        }
        self.form = None;
        true
    }

    pub fn submit_form(&mut self) -> Option<FormSubmit> {
        let form = self.form.as_mut()?;
        let values = form.begin_submit()?;
        Some(FormSubmit {
            ticket: form.ticket(),
            mode: form.mode().clone(),
            values,
        })
    }

    pub fn finish_form(&mut self, ticket: u64, result: std::result::Result<(), String>) -> FormSettled {
        let Some(form) = self.form.as_mut().filter(|form| form.ticket() == ticket) else {
            return FormSettled::Stale;
        };
        let failure = result.as_ref().err().cloned();
        let is_add = matches!(form.mode(), FormMode::Add);
        form.finish_submit(result);
        match failure {
            Some(message) => FormSettled::Failed(message),
            None if is_add => {
                self.form = None;
                FormSettled::Created
            }
            None => FormSettled::Updated,
        }
    }

    /// Ask for delete confirmation; closes the menu first.
    pub fn request_delete(&mut self, id: &TaskId) -> bool {
        if self.is_deleting() {
            return false;
        }
        self.open_menu = None;
        self.pending_delete = Some(id.clone());
        true
    }

    /// Answer the pending confirmation. Returns the id to delete only when
    /// confirmed and no other delete is outstanding.
    pub fn answer_delete(&mut self, confirmed: bool) -> Option<TaskId> {
        let id = self.pending_delete.take()?;
        if !confirmed || !self.delete_flight.begin() {
            return None;
        }
        Some(id)
    }

    pub fn finish_delete(&mut self, result: std::result::Result<(), String>) {
        match result {
            Ok(()) => self.delete_flight.succeed(),
            Err(message) => self.delete_flight.fail(message),
        }
    }

    /// Drop every open surface, e.g. on sign-out.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
