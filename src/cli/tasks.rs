//! Task record commands: list, add, edit, delete.

use chrono::Local;
use serde_json::Value;

use crate::auth::Session;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::format;
use crate::gate::CurrentSession;
use crate::listing::{self, SortOrder, ViewSelection};
use crate::menu::{RowActions, DELETE_PROMPT};
use crate::output::{emit_success, format_table, HumanOutput};
use crate::persist::{self, ActionOutcome};
use crate::record::{FieldValues, TaskId, TaskRecord};
use crate::schema::Column;

use super::{account, Context};

const MAX_CELL_WIDTH: usize = 28;

#[derive(serde::Serialize)]
struct ListReport {
    summary: String,
    view: &'static str,
    sort: Option<&'static str>,
    count: usize,
    columns: Vec<&'static str>,
    records: Vec<Value>,
}

#[derive(serde::Serialize)]
struct WriteReport {
    changed: bool,
    message: String,
    id: Option<String>,
}

#[derive(serde::Serialize)]
struct DeleteReport {
    id: String,
    deleted: bool,
}

/// The current session, or `NotSignedIn` when there is none.
fn require_session(ctx: &Context, backend: &dyn Backend) -> Result<Session> {
    CurrentSession::new(&ctx.store, backend.identity())
        .resolve()?
        .ok_or(Error::NotSignedIn)
}

fn selection_from_args(ctx: &Context, view: &str, sort: Option<&str>) -> ViewSelection {
    let mut pairs = vec![("view", view.trim())];
    if let Some(sort) = sort {
        pairs.push(("sort", sort));
    }
    ViewSelection::from_query(&pairs, ctx.config.dashboard.recent_days)
}

pub fn run_list(ctx: &Context, view: &str, sort: Option<&str>) -> Result<()> {
    let selection = selection_from_args(ctx, view, sort);
    if sort.is_some() && selection.sort == SortOrder::Unspecified {
        return Err(Error::InvalidArgument(
            "sort must be 'newest' or 'oldest'".to_string(),
        ));
    }

    let backend = ctx.backend()?;
    let session = require_session(ctx, backend.as_ref())?;
    let today = Local::now().date_naive();
    let rows = persist::list_tasks(backend.gateway(), &session, selection, today)?;

    let order = listing::display_order(&rows, selection);
    let columns = listing::display_columns(&rows);
    let summary = selection.summary(rows.len());

    let mut human = HumanOutput::new(format!("taskdesk list: {summary}"));
    if rows.is_empty() {
        human.push_detail("No records found");
    } else {
        human.set_body(render_table(&rows, &order, &columns));
    }
    if !ctx.output.quiet {
        human.push_next_step("taskdesk add --set project=<name>");
    }

    let report = ListReport {
        summary,
        view: selection.to_query()[0].1,
        sort: selection.sort.as_str(),
        count: rows.len(),
        columns: columns.iter().map(|column| column.name()).collect(),
        records: order.iter().map(|idx| rows[*idx].to_json()).collect(),
    };
    emit_success(ctx.output, "list", &report, Some(&human))
}

fn render_table(rows: &[TaskRecord], order: &[usize], columns: &[Column]) -> String {
    let mut headers = vec!["ID".to_string()];
    headers.extend(columns.iter().map(|column| column.label().to_string()));
    let body: Vec<Vec<String>> = order
        .iter()
        .map(|idx| {
            let row = &rows[*idx];
            let mut cells = vec![row.id.to_string()];
            cells.extend(
                columns
                    .iter()
                    .map(|column| format::cell_display(*column, row.column_value(*column))),
            );
            cells
        })
        .collect();
    format_table(&headers, &body, MAX_CELL_WIDTH)
}

pub fn run_add(ctx: &Context, assignments: &[String]) -> Result<()> {
    let mut values = FieldValues::empty();
    values.apply_assignments(assignments)?;
    if !crate::form::is_dirty(&values, &FieldValues::empty()) {
        return Err(Error::InvalidArgument(
            "nothing to save; pass at least one --set field=value".to_string(),
        ));
    }

    let backend = ctx.backend()?;
    let session = require_session(ctx, backend.as_ref())?;
    let outcome = persist::create_task(backend.gateway(), &session, &values)?;
    emit_write(ctx, "add", outcome)
}

pub fn run_edit(ctx: &Context, id: &str, assignments: &[String]) -> Result<()> {
    let id = TaskId::new(id)?;
    // Reject malformed assignments before touching the backend.
    FieldValues::empty().apply_assignments(assignments)?;
    let backend = ctx.backend()?;
    let session = require_session(ctx, backend.as_ref())?;

    let today = Local::now().date_naive();
    let rows = persist::list_tasks(
        backend.gateway(),
        &session,
        ViewSelection::all(SortOrder::Unspecified),
        today,
    )?;
    let record = rows
        .iter()
        .find(|row| row.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    let baseline = record.form_values();
    let mut values = baseline.clone();
    values.apply_assignments(assignments)?;
    let outcome = persist::update_task(backend.gateway(), &session, &id, &values, Some(&baseline))?;
    emit_write(ctx, "edit", outcome)
}

fn emit_write(ctx: &Context, command: &str, outcome: ActionOutcome) -> Result<()> {
    let header = if outcome.changed {
        "Saved successfully".to_string()
    } else {
        outcome.message.clone()
    };
    let mut human = HumanOutput::new(format!("taskdesk {command}: {header}"));
    if let Some(id) = &outcome.task_id {
        human.push_summary("id", id.to_string());
    }
    human.push_next_step("taskdesk list --view all");

    emit_success(
        ctx.output,
        command,
        &WriteReport {
            changed: outcome.changed,
            message: outcome.message,
            id: outcome.task_id.map(|id| id.to_string()),
        },
        Some(&human),
    )
}

pub fn run_delete(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    let id = TaskId::new(id)?;
    let mut actions = RowActions::new();
    actions.request_delete(&id);

    let confirmed = yes || account::confirm(DELETE_PROMPT)?;
    let Some(target) = actions.answer_delete(confirmed) else {
        let mut human = HumanOutput::new("taskdesk delete: cancelled");
        human.push_summary("id", id.to_string());
        return emit_success(
            ctx.output,
            "delete",
            &DeleteReport {
                id: id.to_string(),
                deleted: false,
            },
            Some(&human),
        );
    };

    let backend = ctx.backend()?;
    let session = require_session(ctx, backend.as_ref())?;
    let result = persist::delete_task(backend.gateway(), &session, &target);
    actions.finish_delete(result.as_ref().map(|_| ()).map_err(|err| err.to_string()));
    let outcome = result?;

    let mut human = HumanOutput::new(format!("taskdesk delete: {}", outcome.message));
    human.push_next_step("taskdesk list");
    emit_success(
        ctx.output,
        "delete",
        &DeleteReport {
            id: target.to_string(),
            deleted: true,
        },
        Some(&human),
    )
}
