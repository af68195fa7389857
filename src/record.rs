//! Task records as read from and written to the backend table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::format;
use crate::schema::{Column, FieldKind, TaskField, COLUMN_ORDER};

/// Backend-assigned record identifier. Numeric ids are kept as their
/// decimal text so they round-trip into `id=eq.<id>` filters unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("record id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.trim().to_string())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    fields: BTreeMap<TaskField, String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Keys present in the server row, in server order.
    columns: Vec<String>,
}

impl TaskRecord {
    /// Build a record from one JSON row. Strings are kept verbatim, numbers
    /// and booleans rendered to text, `null` treated as absent.
    pub fn from_row(row: &Map<String, Value>) -> Result<Self> {
        let id = row
            .get("id")
            .and_then(TaskId::from_json)
            .ok_or_else(|| Error::OperationFailed("backend row has no usable id".to_string()))?;

        let mut fields = BTreeMap::new();
        for field in TaskField::ALL {
            if let Some(text) = row.get(field.name()).and_then(json_text) {
                fields.insert(field, text);
            }
        }

        Ok(Self {
            id,
            fields,
            created_at: row.get("created_at").and_then(json_text),
            updated_at: row.get("updated_at").and_then(json_text),
            columns: row.keys().cloned().collect(),
        })
    }

    pub fn from_rows(rows: &[Value]) -> Result<Vec<Self>> {
        rows.iter()
            .map(|row| match row {
                Value::Object(map) => Self::from_row(map),
                other => Err(Error::OperationFailed(format!(
                    "backend returned a non-object row: {other}"
                ))),
            })
            .collect()
    }

    pub fn value(&self, field: TaskField) -> Option<&str> {
        self.fields.get(&field).map(|value| value.as_str())
    }

    pub fn column_value(&self, column: Column) -> Option<&str> {
        match column {
            Column::Field(field) => self.value(field),
            Column::CreatedAt => self.created_at.as_deref(),
            Column::UpdatedAt => self.updated_at.as_deref(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Values as an edit form baseline: missing becomes "", the date is
    /// normalized to `YYYY-MM-DD`.
    pub fn form_values(&self) -> FieldValues {
        let mut values = FieldValues::empty();
        for field in TaskField::ALL {
            let raw = self.value(field).unwrap_or("");
            let value = match field.kind() {
                FieldKind::Date => format::to_date_input_value(raw),
                FieldKind::Text => raw.to_string(),
            };
            values.set(field, value);
        }
        values
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.to_string()));
        for column in COLUMN_ORDER {
            let value = self
                .column_value(column)
                .map(|text| Value::String(text.to_string()))
                .unwrap_or(Value::Null);
            map.insert(column.name().to_string(), value);
        }
        Value::Object(map)
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

/// Raw form values for every schema field. Missing fields read as "".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldValues(BTreeMap<TaskField, String>);

impl FieldValues {
    pub fn empty() -> Self {
        Self(
            TaskField::ALL
                .into_iter()
                .map(|field| (field, String::new()))
                .collect(),
        )
    }

    pub fn get(&self, field: TaskField) -> &str {
        self.0.get(&field).map(|value| value.as_str()).unwrap_or("")
    }

    pub fn set(&mut self, field: TaskField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskField, &str)> + '_ {
        TaskField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }

    /// Parse `field=value` assignments (CLI `--set`).
    pub fn apply_assignments(&mut self, assignments: &[String]) -> Result<()> {
        for assignment in assignments {
            let Some((name, value)) = assignment.split_once('=') else {
                return Err(Error::InvalidArgument(format!(
                    "expected field=value, got '{assignment}'"
                )));
            };
            let field = TaskField::from_name(name).ok_or_else(|| {
                Error::InvalidArgument(format!("unknown field '{}'", name.trim()))
            })?;
            if field.kind() == FieldKind::Date && !format::is_date_input(value) {
                return Err(Error::Validation(invalid_date_message(field)));
            }
            self.set(field, value);
        }
        Ok(())
    }

    /// The first date field holding something other than an empty value
    /// or a full `YYYY-MM-DD` date.
    pub fn invalid_date(&self) -> Option<TaskField> {
        TaskField::ALL
            .into_iter()
            .find(|field| field.kind() == FieldKind::Date && !format::is_date_input(self.get(*field)))
    }

    pub fn validate(&self) -> Result<()> {
        match self.invalid_date() {
            Some(field) => Err(Error::Validation(invalid_date_message(field))),
            None => Ok(()),
        }
    }
}

pub fn invalid_date_message(field: TaskField) -> String {
    format!("{} must be empty or a date as YYYY-MM-DD.", field.label())
}

/// Write payload for create/update: the eleven schema fields only, never
/// the id or the server timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPayload(Map<String, Value>);

impl TaskPayload {
    pub fn from_values(values: &FieldValues) -> Self {
        let mut map = Map::new();
        for (field, raw) in values.iter() {
            let value = match field.kind() {
                FieldKind::Date => {
                    let raw = raw.trim();
                    if raw.is_empty() {
                        Value::Null
                    } else {
                        Value::String(raw.to_string())
                    }
                }
                FieldKind::Text => Value::String(raw.to_string()),
            };
            map.insert(field.name().to_string(), value);
        }
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}
