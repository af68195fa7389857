use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::auth::{INVALID_LINK_MESSAGE, PASSWORD_UPDATED_MESSAGE};
use crate::form::{self, Control, FormSession};
use crate::format;
use crate::listing::ViewWindow;
use crate::menu::DELETE_PROMPT;
use crate::schema::Column;

use super::app::{AppState, Dashboard, ResetScreen, Screen, StatusKind};
use super::auth_form::AuthForm;
use super::editor::FormEditor;

const ID_WIDTH: usize = 8;
const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 22;
const FORM_LABEL_WIDTH: usize = 22;
const HELP_KEY_WIDTH: usize = 14;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_BG_MUTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);
const COLOR_MAGENTA: Color = Color::Rgb(214, 140, 230);

pub fn render(frame: &mut Frame, app: &mut AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);
    let header = chunks[0];
    let main = chunks[1];
    let footer = chunks[2];

    render_header(frame, app, header);

    let show_saved = app.flash_visible();
    let recent_days = app.recent_days;
    match &mut app.screen {
        Screen::Pending(route) => {
            let text = format!("Checking session for {route}…");
            let widget = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(COLOR_MUTED),
            )))
            .alignment(Alignment::Center);
            frame.render_widget(widget, centered_rect(main.width, 3, main));
        }
        Screen::Login(form) => render_auth_form(frame, main, "Sign in", form),
        Screen::Reset(reset) => render_reset(frame, main, reset),
        Screen::Dashboard(dash) => render_dashboard(frame, main, dash, show_saved, recent_days),
    }

    render_footer(frame, app, footer);

    if app.show_help {
        if let Screen::Dashboard(_) = app.screen {
            render_help_modal(frame, area);
        }
    }
}

fn render_header(frame: &mut Frame, app: &AppState, area: Rect) {
    let title = match &app.screen {
        Screen::Pending(_) => "Loading",
        Screen::Login(_) => "Sign in",
        Screen::Reset(_) => "Reset password",
        Screen::Dashboard(_) => "Dashboard",
    };
    let mut spans = vec![
        Span::styled(
            "taskdesk",
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", Style::default().fg(COLOR_MUTED_DARK)),
        Span::styled(
            title,
            Style::default()
                .fg(COLOR_INFO)
                .add_modifier(Modifier::UNDERLINED),
        ),
    ];
    if let Some(email) = app.email.as_deref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("signed in as {email}"),
            Style::default().fg(COLOR_MUTED),
        ));
    }
    let widget = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(COLOR_BG_MUTED)),
    );
    frame.render_widget(widget, area);
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint_span = Span::styled(app.footer_hint(), Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status, status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let busy_line = if app.is_busy() {
        Line::from(Span::styled("working…", Style::default().fg(COLOR_ACCENT)))
    } else {
        Line::from("")
    };
    let widget = Paragraph::new(vec![line, busy_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER_LIST)),
        );
    frame.render_widget(widget, area);
}

fn render_auth_form(frame: &mut Frame, area: Rect, title: &str, form: &AuthForm) {
    let width = area.width.saturating_sub(8).min(64);
    let height = (form.fields().len() as u16 * 2 + 7).min(area.height);
    let modal = centered_rect(width, height, area);
    let content_width = modal.width.saturating_sub(2) as usize;

    let mut lines = Vec::new();
    for (idx, field) in form.fields().iter().enumerate() {
        let active = idx == form.active_index();
        let label = pad_text(field.label, 18.min(content_width));
        let value_width = content_width.saturating_sub(19);
        let mut spans = vec![Span::styled(label, Style::default().fg(COLOR_TEXT))];
        spans.push(Span::raw(" "));
        let value = truncate_text(&field.display(), value_width);
        let style = if active {
            Style::default()
                .fg(COLOR_TEXT)
                .add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(COLOR_MUTED)
        };
        spans.push(Span::styled(pad_text(&value, value_width.max(1)), style));
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    if form.is_busy() {
        lines.push(Line::from(Span::styled(
            "please wait…",
            Style::default().fg(COLOR_ACCENT),
        )));
    } else if let Some(error) = form.error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )));
    } else if let Some(notice) = form.notice() {
        lines.push(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(COLOR_SUCCESS),
        )));
    }

    frame.render_widget(Clear, modal);
    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, modal);
}

fn render_reset(frame: &mut Frame, area: Rect, reset: &ResetScreen) {
    match reset {
        ResetScreen::Ready { form, .. } => render_auth_form(frame, area, "Set a new password", form),
        ResetScreen::Invalid => render_message(frame, area, INVALID_LINK_MESSAGE, COLOR_ERROR),
        ResetScreen::Done => render_message(frame, area, PASSWORD_UPDATED_MESSAGE, COLOR_SUCCESS),
    }
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let width = area.width.saturating_sub(8).min(64);
    let modal = centered_rect(width, 5, area);
    frame.render_widget(Clear, modal);
    let widget = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Reset password"))
    .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_dashboard(
    frame: &mut Frame,
    area: Rect,
    dash: &mut Dashboard,
    show_saved: bool,
    recent_days: u32,
) {
    let (list_area, form_area) = if dash.actions.form().is_some() {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    render_task_list(frame, list_area, dash, show_saved, recent_days);

    if let (Some(form_area), Some(form)) = (form_area, dash.actions.form()) {
        render_form(frame, form_area, form, &dash.editor);
    }

    if dash.actions.open_menu().is_some() {
        render_row_menu(frame, area);
    }
    if let Some(id) = dash.actions.pending_delete().cloned() {
        let project = dash
            .list
            .rows()
            .iter()
            .find(|row| row.id == id)
            .and_then(|row| row.value(crate::schema::TaskField::Project))
            .unwrap_or("")
            .to_string();
        render_delete_confirm_modal(frame, area, id.as_str(), &project);
    }
}

fn render_task_list(
    frame: &mut Frame,
    area: Rect,
    dash: &mut Dashboard,
    show_saved: bool,
    recent_days: u32,
) {
    let content_width = area.width.saturating_sub(2) as usize;
    let selection = dash.list.selection();
    let mut lines: Vec<Line<'static>> = Vec::new();

    let mut top = vec![Span::styled(
        selection.summary(dash.list.len()),
        Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
    )];
    top.push(Span::raw("   "));
    top.push(Span::styled("v ", Style::default().fg(COLOR_ACCENT)));
    top.push(Span::styled(
        selection.toggle_label(recent_days),
        Style::default().fg(COLOR_MUTED),
    ));
    if selection.window == ViewWindow::All {
        top.push(Span::raw("   "));
        top.push(Span::styled("s ", Style::default().fg(COLOR_ACCENT)));
        top.push(Span::styled(
            selection.toggle_sort().sort.menu_label(),
            Style::default().fg(COLOR_MUTED),
        ));
    }
    lines.push(Line::from(top));

    if show_saved {
        lines.push(Line::from(Span::styled(
            "Saved successfully",
            Style::default()
                .fg(COLOR_SUCCESS)
                .add_modifier(Modifier::BOLD),
        )));
    } else if let Some(error) = dash.load_error.as_ref() {
        lines.push(Line::from(Span::styled(
            format!("load error: {error}"),
            Style::default().fg(COLOR_ERROR),
        )));
    } else {
        lines.push(Line::from(""));
    }

    let columns = visible_columns(dash.list.columns(), content_width);
    lines.push(render_header_row(&columns, content_width));

    if dash.loading && dash.list.is_empty() {
        lines.push(Line::from(Span::styled(
            "Loading…",
            Style::default().fg(COLOR_MUTED),
        )));
    } else if dash.list.is_empty() {
        lines.push(Line::from(Span::styled(
            "No records found",
            Style::default().fg(COLOR_MUTED),
        )));
    } else {
        let list_height = (area.height as usize)
            .saturating_sub(2)
            .saturating_sub(lines.len());
        let total = dash.list.len();
        let cursor = dash.cursor;
        let (start, end) = list_window(total, Some(cursor), list_height);
        let menu_id = dash.actions.open_menu().cloned();
        for pos in start..end {
            let Some(record) = dash.list.row_at(pos) else {
                continue;
            };
            let mut cells = vec![pad_text(record.id.as_str(), ID_WIDTH)];
            for (column, width) in &columns {
                let text = format::cell_display(*column, record.column_value(*column));
                cells.push(pad_text(&text, *width));
            }
            let text = truncate_text(&cells.join(" "), content_width);
            let mut style = Style::default().fg(COLOR_TEXT);
            if pos == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if menu_id.as_ref() == Some(&record.id) {
                style = style.fg(COLOR_ACCENT);
            }
            lines.push(Line::from(Span::styled(text, style)));
        }
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Records")
            .border_style(Style::default().fg(COLOR_BORDER_LIST)),
    );
    frame.render_widget(widget, area);
}

/// Columns that fit, each with its width, after the id column.
fn visible_columns(columns: &[Column], width: usize) -> Vec<(Column, usize)> {
    let mut remaining = width.saturating_sub(ID_WIDTH);
    let mut out = Vec::new();
    for column in columns {
        let wanted = column
            .label()
            .chars()
            .count()
            .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
        if remaining < wanted + 1 {
            break;
        }
        remaining -= wanted + 1;
        out.push((*column, wanted));
    }
    out
}

fn render_header_row(columns: &[(Column, usize)], width: usize) -> Line<'static> {
    let mut cells = vec![pad_text("ID", ID_WIDTH)];
    for (column, col_width) in columns {
        cells.push(pad_text(column.label(), *col_width));
    }
    Line::from(Span::styled(
        truncate_text(&cells.join(" "), width),
        Style::default()
            .fg(COLOR_MAGENTA)
            .add_modifier(Modifier::BOLD),
    ))
}

fn render_form(frame: &mut Frame, area: Rect, form: &FormSession, editor: &FormEditor) {
    let width = area.width.saturating_sub(2) as usize;
    let value_width = width.saturating_sub(FORM_LABEL_WIDTH + 1);
    let active = editor.active_field();
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (idx, section) in form::layout(form).into_iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        lines.push(section_header(section.title));
        for slot in section.slots {
            let is_active = slot.field == active;
            let placeholder = slot.value.is_empty() && slot.control == Control::Date;
            let value = if placeholder {
                "YYYY-MM-DD".to_string()
            } else {
                slot.value.clone()
            };
            let value_style = if placeholder {
                Style::default().fg(COLOR_MUTED_DARK)
            } else {
                Style::default().fg(COLOR_TEXT)
            };
            let mut spans = vec![
                Span::styled(
                    pad_text(slot.label, FORM_LABEL_WIDTH.min(width)),
                    Style::default().fg(COLOR_MUTED),
                ),
                Span::raw(" "),
                Span::styled(pad_text(&truncate_text(&value, value_width), value_width), value_style),
            ];
            if is_active {
                for span in &mut spans {
                    span.style = span.style.add_modifier(Modifier::REVERSED);
                }
            }
            lines.push(Line::from(spans));
        }
    }

    lines.push(Line::from(""));
    if form.is_submitting() {
        lines.push(Line::from(Span::styled(
            "saving…",
            Style::default().fg(COLOR_ACCENT),
        )));
    } else if let Some(error) = form.flight().error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )));
    } else if let Some(error) = form.validation_error() {
        lines.push(Line::from(Span::styled(
            error,
            Style::default().fg(COLOR_ERROR),
        )));
    } else if form.is_dirty() {
        lines.push(Line::from(Span::styled(
            "unsaved changes (ctrl+s to save)",
            Style::default().fg(COLOR_WARNING),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "no changes",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    }

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(form.mode().title())
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn render_row_menu(frame: &mut Frame, area: Rect) {
    let modal = centered_rect(24, 6, area);
    frame.render_widget(Clear, modal);
    let lines = vec![
        help_line("e", "Edit", 20),
        help_line("d", "Delete", 20),
        Line::from(""),
        Line::from(Span::styled("esc close", Style::default().fg(COLOR_MUTED_DARK))),
    ];
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Actions")
            .border_style(Style::default().fg(COLOR_BORDER_LIST)),
    );
    frame.render_widget(widget, modal);
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, id: &str, project: &str) {
    let content_width = area.width.saturating_sub(8).min(64);
    let height = 9u16.min(area.height.saturating_sub(6).max(8));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let title_width = (content_width as usize).saturating_sub(10);
    let mut lines: Vec<Line<'static>> = Vec::new();
    lines.push(Line::from(Span::styled(
        DELETE_PROMPT,
        Style::default()
            .fg(COLOR_ERROR)
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        label_span("ID: "),
        Span::styled(id.to_string(), id_style()),
    ]));
    if !project.trim().is_empty() {
        lines.push(Line::from(vec![
            label_span("Project: "),
            Span::styled(
                truncate_text(project, title_width),
                Style::default().fg(COLOR_TEXT),
            ),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "y/enter delete  n/esc cancel",
        Style::default().fg(COLOR_MUTED_DARK),
    )));

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Delete record"))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let width = 52u16.min(area.width.saturating_sub(4));
    let lines = build_list_help_lines(width.saturating_sub(2) as usize);
    let modal = centered_rect(width, lines.len() as u16 + 2, area);
    frame.render_widget(Clear, modal);
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Help")
            .border_style(Style::default().fg(COLOR_BORDER_LIST)),
    );
    frame.render_widget(widget, modal);
}

fn build_list_help_lines(width: usize) -> Vec<Line<'static>> {
    vec![
        help_header("Dashboard"),
        help_line("j/k or up/down", "move selection", width),
        help_line("enter/a", "row actions (edit, delete)", width),
        help_line("n", "add record", width),
        help_line("v", "recent window / all records", width),
        help_line("s", "sort all records by date", width),
        help_line("r", "reload", width),
        help_line("L", "sign out", width),
        help_line("q/esc", "quit", width),
        help_header("Form"),
        help_line("tab/shift+tab", "next or previous field", width),
        help_line("+/-", "step a date by one day", width),
        help_line("ctrl+u", "clear field", width),
        help_line("ctrl+s", "save", width),
        help_line("esc", "close form", width),
    ]
}

fn help_header(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(COLOR_INFO).add_modifier(Modifier::BOLD),
    ))
}

fn help_line(keys: &str, desc: &str, width: usize) -> Line<'static> {
    let key_text = pad_text(keys, HELP_KEY_WIDTH.min(width));
    let desc_width = width.saturating_sub(HELP_KEY_WIDTH + 1);
    let desc_text = truncate_text(desc, desc_width);
    Line::from(vec![
        Span::styled(
            key_text,
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(desc_text, Style::default().fg(COLOR_MUTED)),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn list_window(total: usize, selected: Option<usize>, height: usize) -> (usize, usize) {
    if total == 0 || height == 0 {
        return (0, 0);
    }
    if total <= height {
        return (0, total);
    }
    let selected = selected.unwrap_or(0);
    let mut start = selected.saturating_sub(height / 2);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn pad_text(value: &str, width: usize) -> String {
    let text = truncate_text(value, width);
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    format!("{text}{}", " ".repeat(width - len))
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

fn label_span(label: &str) -> Span<'static> {
    Span::styled(label.to_string(), Style::default().fg(COLOR_MUTED_DARK))
}

fn section_header(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(COLOR_MAGENTA)
            .add_modifier(Modifier::BOLD),
    ))
}

fn id_style() -> Style {
    Style::default()
        .fg(COLOR_MUTED)
        .add_modifier(Modifier::BOLD)
}
