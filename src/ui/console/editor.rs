use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::form::{accepts_char, step_date, Control, FormSession};
use crate::schema::{TaskField, FORM_GROUPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Cancel,
    Submit,
}

/// Focus and key handling for the add/edit form. Values live in the
/// `FormSession`; this only tracks which field is active.
#[derive(Debug, Clone, Default)]
pub struct FormEditor {
    active: usize,
}

impl FormEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields in tab order: section by section.
    pub fn fields() -> Vec<TaskField> {
        FORM_GROUPS
            .iter()
            .flat_map(|group| group.fields.iter().copied())
            .collect()
    }

    pub fn active_field(&self) -> TaskField {
        let fields = Self::fields();
        fields[self.active.min(fields.len() - 1)]
    }

    pub fn handle_key(&mut self, form: &mut FormSession, key: KeyEvent, today: NaiveDate) -> EditorAction {
        let fields = Self::fields();
        let field = self.active_field();
        let control = Control::from(field.kind());

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => return EditorAction::Submit,
                KeyCode::Char('u') => {
                    if !form.is_submitting() {
                        form.set_value(field, "");
                    }
                    return EditorAction::None;
                }
                _ => return EditorAction::None,
            }
        }

        match key.code {
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.move_active(1, fields.len()),
            KeyCode::BackTab | KeyCode::Up => self.move_active(-1, fields.len()),
            KeyCode::Enter => {
                if self.active + 1 >= fields.len() {
                    return EditorAction::Submit;
                }
                self.move_active(1, fields.len());
            }
            _ if form.is_submitting() => {}
            KeyCode::Backspace => {
                let mut value = form.value(field).to_string();
                value.pop();
                form.set_value(field, value);
            }
            KeyCode::Char(ch @ ('+' | '-')) if control == Control::Date => {
                let days = if ch == '+' { 1 } else { -1 };
                match step_date(form.value(field), days, today) {
                    Some(next) => form.set_value(field, next),
                    None => push_char(form, field, control, ch),
                }
            }
            KeyCode::Char(ch) => push_char(form, field, control, ch),
            _ => {}
        }
        EditorAction::None
    }

    fn move_active(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let next = (self.active as isize + delta).rem_euclid(len as isize);
        self.active = next as usize;
    }
}

fn push_char(form: &mut FormSession, field: TaskField, control: Control, ch: char) {
    if !accepts_char(control, ch) {
        return;
    }
    let mut value = form.value(field).to_string();
    value.push(ch);
    form.set_value(field, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(editor: &mut FormEditor, form: &mut FormSession, text: &str, today: NaiveDate) {
        for ch in text.chars() {
            editor.handle_key(form, key(KeyCode::Char(ch)), today);
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("date")
    }

    #[test]
    fn typing_marks_form_dirty_and_first_field_has_focus() {
        let mut form = FormSession::open_add();
        let mut editor = FormEditor::new();
        assert_eq!(editor.active_field(), FormEditor::fields()[0]);
        type_text(&mut editor, &mut form, "Atlas", today());
        assert!(form.is_dirty());
        assert_eq!(form.value(FormEditor::fields()[0]), "Atlas");
    }

    #[test]
    fn date_field_filters_and_steps() {
        let mut form = FormSession::open_add();
        let mut editor = FormEditor::new();
        let fields = FormEditor::fields();
        let date_pos = fields
            .iter()
            .position(|field| *field == TaskField::DeploymentDate)
            .expect("date field");
        for _ in 0..date_pos {
            editor.handle_key(&mut form, key(KeyCode::Tab), today());
        }
        assert_eq!(editor.active_field(), TaskField::DeploymentDate);

        type_text(&mut editor, &mut form, "20x24-01-3a1", today());
        assert_eq!(form.value(TaskField::DeploymentDate), "2024-01-31");

        editor.handle_key(&mut form, key(KeyCode::Char('+')), today());
        assert_eq!(form.value(TaskField::DeploymentDate), "2024-02-01");
    }

    #[test]
    fn enter_on_last_field_submits_and_esc_cancels() {
        let mut form = FormSession::open_add();
        let mut editor = FormEditor::new();
        let len = FormEditor::fields().len();
        for _ in 0..len - 1 {
            assert_eq!(
                editor.handle_key(&mut form, key(KeyCode::Enter), today()),
                EditorAction::None
            );
        }
        assert_eq!(
            editor.handle_key(&mut form, key(KeyCode::Enter), today()),
            EditorAction::Submit
        );
        assert_eq!(
            editor.handle_key(&mut form, key(KeyCode::Esc), today()),
            EditorAction::Cancel
        );
    }

    #[test]
    fn tab_wraps_around() {
        let mut form = FormSession::open_add();
        let mut editor = FormEditor::new();
        editor.handle_key(&mut form, key(KeyCode::BackTab), today());
        let fields = FormEditor::fields();
        assert_eq!(editor.active_field(), fields[fields.len() - 1]);
    }
}
