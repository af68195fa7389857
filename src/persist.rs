//! Create, update, delete and list task records through a gateway.
//!
//! Payloads always come from the field schema. No retries, no optimistic
//! local mutation; the caller re-fetches after a successful write.

use chrono::NaiveDate;
use tracing::debug;

use crate::auth::Session;
use crate::backend::TaskGateway;
use crate::error::Result;
use crate::form;
use crate::listing::ViewSelection;
use crate::record::{FieldValues, TaskId, TaskPayload, TaskRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub changed: bool,
    pub message: String,
    pub task_id: Option<TaskId>,
}

pub fn list_tasks(
    gateway: &dyn TaskGateway,
    session: &Session,
    selection: ViewSelection,
    today: NaiveDate,
) -> Result<Vec<TaskRecord>> {
    let query = selection.query(today);
    let rows = gateway.list(session, &query)?;
    debug!(count = rows.len(), since = ?query.since, "loaded tasks");
    Ok(rows)
}

pub fn create_task(
    gateway: &dyn TaskGateway,
    session: &Session,
    values: &FieldValues,
) -> Result<ActionOutcome> {
    values.validate()?;
    let payload = TaskPayload::from_values(values);
    let record = gateway.create(session, &payload)?;
    Ok(ActionOutcome {
        changed: true,
        message: format!("created {}", record.id),
        task_id: Some(record.id),
    })
}

/// Write every schema field of an edit form. When `baseline` is given and
/// nothing differs from it, no request is made.
pub fn update_task(
    gateway: &dyn TaskGateway,
    session: &Session,
    id: &TaskId,
    values: &FieldValues,
    baseline: Option<&FieldValues>,
) -> Result<ActionOutcome> {
    if let Some(baseline) = baseline {
        if !form::is_dirty(values, baseline) {
            return Ok(ActionOutcome {
                changed: false,
                message: "no changes".to_string(),
                task_id: Some(id.clone()),
            });
        }
    }
    values.validate()?;
    let payload = TaskPayload::from_values(values);
    let record = gateway.update(session, id, &payload)?;
    Ok(ActionOutcome {
        changed: true,
        message: format!("updated {}", record.id),
        task_id: Some(record.id),
    })
}

pub fn delete_task(
    gateway: &dyn TaskGateway,
    session: &Session,
    id: &TaskId,
) -> Result<ActionOutcome> {
    gateway.delete(session, id)?;
    Ok(ActionOutcome {
        changed: true,
        message: format!("deleted {id}"),
        task_id: Some(id.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::schema::TaskField;
    use serde_json::json;

    fn setup() -> (MemoryBackend, Session) {
        let backend = MemoryBackend::new().with_account("ops@example.com", "secret1");
        let session = backend.issue_session("ops@example.com").expect("session");
        (backend, session)
    }

    #[test]
    fn create_then_edit_without_changes_is_noop() {
        let (backend, session) = setup();
        let mut values = FieldValues::empty();
        values.set(TaskField::Project, "Atlas");
        let created = create_task(&backend, &session, &values).expect("create");
        assert!(created.changed);
        let id = created.task_id.expect("id");

        let outcome =
            update_task(&backend, &session, &id, &values, Some(&values)).expect("update");
        assert!(!outcome.changed);
        assert_eq!(outcome.message, "no changes");
        assert_eq!(backend.counts().update, 0);
    }

    #[test]
    fn update_sends_null_for_cleared_date() {
        let (backend, session) = setup();
        backend
            .seed(json!({ "id": 5, "project": "Atlas", "deployment_date": "2024-01-10" }))
            .expect("seed");
        let id = TaskId::new("5").expect("id");
        let mut values = FieldValues::empty();
        values.set(TaskField::Project, "Atlas");
        update_task(&backend, &session, &id, &values, None).expect("update");

        let today = NaiveDate::from_ymd_opt(2024, 1, 20).expect("date");
        let rows = list_tasks(
            &backend,
            &session,
            ViewSelection::all(crate::listing::SortOrder::Unspecified),
            today,
        )
        .expect("list");
        assert_eq!(rows[0].value(TaskField::DeploymentDate), None);
    }

    #[test]
    fn partial_date_is_rejected_and_stored_date_kept() {
        let (backend, session) = setup();
        backend
            .seed(json!({ "id": 5, "project": "Atlas", "deployment_date": "2024-01-10" }))
            .expect("seed");
        let id = TaskId::new("5").expect("id");
        let mut values = FieldValues::empty();
        values.set(TaskField::Project, "Atlas");
        values.set(TaskField::DeploymentDate, "2024-01-");

        let err = update_task(&backend, &session, &id, &values, None).expect_err("invalid");
        assert!(matches!(err, crate::error::Error::Validation(_)));
        assert!(create_task(&backend, &session, &values).is_err());
        assert_eq!(backend.counts().update, 0);
        assert_eq!(backend.counts().create, 0);

        let today = NaiveDate::from_ymd_opt(2024, 1, 20).expect("date");
        let rows = list_tasks(
            &backend,
            &session,
            ViewSelection::all(crate::listing::SortOrder::Unspecified),
            today,
        )
        .expect("list");
        assert_eq!(rows[0].value(TaskField::DeploymentDate), Some("2024-01-10"));
    }

    #[test]
    fn delete_missing_record_fails() {
        let (backend, session) = setup();
        let id = TaskId::new("404").expect("id");
        assert!(delete_task(&backend, &session, &id).is_err());
    }
}
