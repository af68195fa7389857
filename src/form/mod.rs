//! Add/edit form sessions with dirty tracking.
//!
//! A session holds the current values for every schema field and a
//! baseline snapshot. Dirty is always derived from the two, never stored.

mod layout;

use std::sync::atomic::{AtomicU64, Ordering};

pub use layout::{accepts_char, layout, step_date, Control, FieldSlot, FormSection};

use crate::flight::FlightState;
use crate::format;
use crate::record::{invalid_date_message, FieldValues, TaskId, TaskRecord};
use crate::schema::{FieldKind, TaskField};

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(TaskId),
}

impl FormMode {
    pub fn key(&self) -> &'static str {
        match self {
            FormMode::Add => "add",
            FormMode::Edit(_) => "edit",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FormMode::Add => "Add record",
            FormMode::Edit(_) => "Edit record",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormSession {
    mode: FormMode,
    values: FieldValues,
    baseline: FieldValues,
    submitted: Option<FieldValues>,
    flight: FlightState,
    ticket: u64,
}

impl FormSession {
    pub fn open_add() -> Self {
        Self::open(FormMode::Add, FieldValues::empty())
    }

    pub fn open_edit(record: &TaskRecord) -> Self {
        Self::open(FormMode::Edit(record.id.clone()), record.form_values())
    }

    fn open(mode: FormMode, baseline: FieldValues) -> Self {
        Self {
            mode,
            values: baseline.clone(),
            baseline,
            submitted: None,
            flight: FlightState::Idle,
            ticket: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    /// Identifies this session; results carrying another ticket are stale.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn value(&self, field: TaskField) -> &str {
        self.values.get(field)
    }

    pub fn set_value(&mut self, field: TaskField, value: impl Into<String>) {
        self.values.set(field, value);
    }

    pub fn flight(&self) -> &FlightState {
        &self.flight
    }

    pub fn is_submitting(&self) -> bool {
        self.flight.is_in_flight()
    }

    pub fn is_dirty(&self) -> bool {
        is_dirty(&self.values, &self.baseline)
    }

    /// Inline message for a date field that is neither empty nor a full
    /// `YYYY-MM-DD` date.
    pub fn validation_error(&self) -> Option<String> {
        self.values.invalid_date().map(invalid_date_message)
    }

    pub fn can_submit(&self) -> bool {
        self.is_dirty() && !self.is_submitting() && self.validation_error().is_none()
    }

    /// Start a submit and hand back the values to send. `None` while a
    /// submit is outstanding, when nothing changed, or when a date is
    /// incomplete.
    pub fn begin_submit(&mut self) -> Option<FieldValues> {
        if !self.can_submit() || !self.flight.begin() {
            return None;
        }
        let snapshot = self.values.clone();
        self.submitted = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Settle an outstanding submit. Success moves the baseline to the
    /// submitted values; failure keeps the edits so the user can retry.
    pub fn finish_submit(&mut self, result: std::result::Result<(), String>) {
        if !self.flight.is_in_flight() {
            return;
        }
        match result {
            Ok(()) => {
                if let Some(submitted) = self.submitted.take() {
                    self.baseline = submitted;
                }
                self.flight.succeed();
            }
            Err(message) => {
                self.submitted = None;
                self.flight.fail(message);
            }
        }
    }
}

/// Field-by-field comparison under the schema rules: dates compare after
/// normalization to `YYYY-MM-DD`, text compares exactly.
pub fn is_dirty(current: &FieldValues, baseline: &FieldValues) -> bool {
    TaskField::ALL
        .into_iter()
        .any(|field| field_differs(field, current.get(field), baseline.get(field)))
}

fn field_differs(field: TaskField, current: &str, baseline: &str) -> bool {
    match field.kind() {
        FieldKind::Date => {
            format::to_date_input_value(current) != format::to_date_input_value(baseline)
        }
        FieldKind::Text => current != baseline,
    }
}
