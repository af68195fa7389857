use chrono::Duration;

use crate::format;
use crate::schema::{FieldKind, TaskField, FORM_GROUPS};

use super::FormSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Text,
    Date,
}

impl From<FieldKind> for Control {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => Control::Text,
            FieldKind::Date => Control::Date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    pub field: TaskField,
    pub label: &'static str,
    pub control: Control,
    pub value: String,
    pub input_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSection {
    pub title: &'static str,
    pub slots: Vec<FieldSlot>,
}

/// Sections and slots for a form, in display order. The first slot of the
/// first section takes initial focus.
pub fn layout(form: &FormSession) -> Vec<FormSection> {
    let mode = form.mode().key();
    FORM_GROUPS
        .iter()
        .map(|group| FormSection {
            title: group.title,
            slots: group
                .fields
                .iter()
                .map(|field| FieldSlot {
                    field: *field,
                    label: field.label(),
                    control: field.kind().into(),
                    value: form.value(*field).to_string(),
                    input_id: format!("{mode}-{}", field.name()),
                })
                .collect(),
        })
        .collect()
}

/// Whether a typed character is accepted by a control.
pub fn accepts_char(control: Control, ch: char) -> bool {
    if ch.is_control() {
        return false;
    }
    match control {
        Control::Text => true,
        Control::Date => ch.is_ascii_digit() || ch == '-',
    }
}

/// Move a date value by whole days. An empty value starts from `today`;
/// an unparseable value is left alone.
pub fn step_date(value: &str, days: i64, today: chrono::NaiveDate) -> Option<String> {
    let base = if value.trim().is_empty() {
        today
    } else {
        format::parse_date(value)?
    };
    let next = base.checked_add_signed(Duration::days(days))?;
    Some(next.format("%Y-%m-%d").to_string())
}
