use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use crossterm::cursor::Show;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::debug;

use crate::auth::{self, Session, SessionStore};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::gate::{GateDecision, GatePolicy, Route};
use crate::listing::{TaskListView, ViewSelection, ViewWindow};
use crate::menu::{FormSettled, RowActions};
use crate::record::TaskRecord;

use super::auth_form::{AuthAction, AuthForm};
use super::editor::{EditorAction, FormEditor};
use super::view;
use super::worker::{spawn_worker, LoadRequest, UiMsg};

const EVENT_POLL_MS: u64 = 120;
const SAVED_MESSAGE: &str = "Saved successfully";

pub struct ConsoleOptions {
    pub route: Route,
    pub recovery_link: Option<String>,
    pub recent_days: u32,
    pub flash: Duration,
    pub policy: GatePolicy,
}

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

pub(crate) enum ResetScreen {
    Invalid,
    Ready { recovery: Session, form: AuthForm },
    Done,
}

pub(crate) struct Dashboard {
    pub(crate) list: TaskListView,
    pub(crate) actions: RowActions,
    pub(crate) editor: FormEditor,
    pub(crate) cursor: usize,
    pub(crate) loading: bool,
    pub(crate) load_error: Option<String>,
}

pub(crate) enum Screen {
    /// Waiting for the gate to decide the first route.
    Pending(Route),
    Login(AuthForm),
    Reset(ResetScreen),
    Dashboard(Dashboard),
}

/// Side effects of a key press, applied by `AppState` after the screen
/// state has been updated.
enum Effect {
    Send(LoadRequest),
    Info(String),
    Error(String),
    ToggleHelp,
    Quit,
}

impl Dashboard {
    fn new(selection: ViewSelection) -> Self {
        Self {
            list: TaskListView::new(selection),
            actions: RowActions::new(),
            editor: FormEditor::new(),
            cursor: 0,
            loading: false,
            load_error: None,
        }
    }

    pub(crate) fn selected_record(&mut self) -> Option<TaskRecord> {
        self.list.row_at(self.cursor).cloned()
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.list.len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    fn handle_key(&mut self, key: KeyEvent, today: NaiveDate, recent_days: u32) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.actions.pending_delete().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    if let Some(id) = self.actions.answer_delete(true) {
                        effects.push(Effect::Info(format!("deleting {id}…")));
                        effects.push(Effect::Send(LoadRequest::Delete(id)));
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.actions.answer_delete(false);
                    effects.push(Effect::Info("cancelled".to_string()));
                }
                _ => {}
            }
            return effects;
        }

        if let Some(form) = self.actions.form_mut() {
            match self.editor.handle_key(form, key, today) {
                EditorAction::None => {}
                EditorAction::Cancel => {
                    if !self.actions.close_form() {
                        effects.push(Effect::Info("still saving…".to_string()));
                    }
                }
                EditorAction::Submit => match self.actions.submit_form() {
                    Some(submit) => effects.push(Effect::Send(LoadRequest::Save(submit))),
                    None => match self.actions.form() {
                        Some(form) if form.is_submitting() => {
                            effects.push(Effect::Info("still saving…".to_string()))
                        }
                        Some(form) => match form.validation_error() {
                            Some(message) => effects.push(Effect::Error(message)),
                            None => effects.push(Effect::Info("no changes to save".to_string())),
                        },
                        None => {}
                    },
                },
            }
            return effects;
        }

        if self.actions.open_menu().is_some() {
            match key.code {
                KeyCode::Char('e') => {
                    if let Some(record) = self.selected_record() {
                        if self.actions.open_edit(&record) {
                            self.editor = FormEditor::new();
                        }
                    }
                    return effects;
                }
                KeyCode::Char('d') => {
                    if let Some(record) = self.selected_record() {
                        if !self.actions.request_delete(&record.id) {
                            effects.push(Effect::Info("a delete is already running".to_string()));
                        }
                    }
                    return effects;
                }
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('a') => {
                    self.actions.dismiss_menu();
                    return effects;
                }
                _ => self.actions.dismiss_menu(),
            }
        }

        let selection = self.list.selection();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => effects.push(Effect::Quit),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::PageDown => self.move_cursor(10),
            KeyCode::PageUp => self.move_cursor(-10),
            KeyCode::Enter | KeyCode::Char('a') => {
                if let Some(record) = self.selected_record() {
                    if !self.actions.toggle_menu(&record.id) {
                        effects.push(Effect::Info("busy; try again shortly".to_string()));
                    }
                }
            }
            KeyCode::Char('n') => {
                if self.actions.open_add() {
                    self.editor = FormEditor::new();
                }
            }
            KeyCode::Char('v') => effects.push(Effect::Send(LoadRequest::Navigate(
                Route::dashboard_with(selection.toggle_window(recent_days), false),
            ))),
            KeyCode::Char('s') => {
                if selection.window == ViewWindow::All {
                    effects.push(Effect::Send(LoadRequest::Navigate(Route::dashboard_with(
                        selection.toggle_sort(),
                        false,
                    ))));
                } else {
                    effects.push(Effect::Info(
                        "sorting applies to all records (press v)".to_string(),
                    ));
                }
            }
            KeyCode::Char('r') => effects.push(Effect::Send(LoadRequest::Reload(selection))),
            KeyCode::Char('L') => effects.push(Effect::Send(LoadRequest::SignOut)),
            KeyCode::Char('?') => effects.push(Effect::ToggleHelp),
            _ => {}
        }
        effects
    }
}

pub struct AppState {
    pub(crate) screen: Screen,
    pub(crate) email: Option<String>,
    pub(crate) show_help: bool,
    pub(crate) recent_days: u32,
    recovery: Option<Session>,
    status_message: Option<String>,
    info_message: Option<String>,
    flash_until: Option<Instant>,
    redirect_at: Option<Instant>,
    pending: usize,
    flash: Duration,
}

impl AppState {
    pub(crate) fn new(options: &ConsoleOptions) -> Self {
        let recovery = options.recovery_link.as_deref().and_then(|link| {
            auth::parse_recovery_link(link, auth::unix_now())
                .map_err(|err| debug!(error = %err, "recovery link rejected"))
                .ok()
        });
        Self {
            screen: Screen::Pending(options.route.clone()),
            email: None,
            show_help: false,
            recent_days: options.recent_days,
            recovery,
            status_message: None,
            info_message: None,
            flash_until: None,
            redirect_at: None,
            pending: 0,
            flash: options.flash,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub(crate) fn flash_visible(&self) -> bool {
        self.flash_until.is_some()
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(message) = self.status_message.as_ref() {
            return Some((message.clone(), StatusKind::Error));
        }
        self.info_message
            .as_ref()
            .map(|info| (info.clone(), StatusKind::Info))
    }

    pub(crate) fn footer_hint(&self) -> String {
        match &self.screen {
            Screen::Pending(_) => "q quit".to_string(),
            Screen::Login(_) => {
                "tab next field  enter sign in  ctrl+f forgot password  esc quit".to_string()
            }
            Screen::Reset(ResetScreen::Ready { .. }) => {
                "tab next field  enter update password  esc back to sign in".to_string()
            }
            Screen::Reset(_) => "enter/esc back to sign in".to_string(),
            Screen::Dashboard(dash) => {
                if dash.actions.pending_delete().is_some() {
                    "y/enter delete  n/esc keep".to_string()
                } else if dash.actions.form().is_some() {
                    "tab/shift+tab field  +/- date  ctrl+s save  esc close".to_string()
                } else if dash.actions.open_menu().is_some() {
                    "e edit  d delete  esc close menu".to_string()
                } else {
                    "j/k move  enter actions  n add  v view  s sort  r reload  L sign out  ? help  q quit"
                        .to_string()
                }
            }
        }
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.status_message = Some(message);
        self.info_message = None;
    }

    pub(crate) fn set_info(&mut self, message: String) {
        self.info_message = Some(message);
        self.status_message = None;
    }

    fn send(&mut self, tx: &Sender<LoadRequest>, req: LoadRequest) {
        if let LoadRequest::Reload(_) = &req {
            if let Screen::Dashboard(dash) = &mut self.screen {
                dash.loading = true;
            }
        }
        if tx.send(req).is_err() {
            self.set_error("console worker stopped".to_string());
            return;
        }
        self.pending += 1;
    }

    pub(crate) fn navigate(&mut self, route: Route, tx: &Sender<LoadRequest>) {
        debug!(route = %route, "navigate");
        self.send(tx, LoadRequest::Navigate(route));
    }

    /// Show the screen for a route the gate already decided on.
    fn enter(&mut self, route: Route, tx: &Sender<LoadRequest>) {
        match &route {
            Route::Login => {
                if !matches!(self.screen, Screen::Login(_)) {
                    self.screen = Screen::Login(AuthForm::sign_in());
                }
            }
            Route::ResetPassword => {
                self.screen = Screen::Reset(match self.recovery.clone() {
                    Some(recovery) => ResetScreen::Ready {
                        recovery,
                        form: AuthForm::reset_password(),
                    },
                    None => ResetScreen::Invalid,
                });
            }
            Route::Dashboard(_) => {
                let selection = ViewSelection::from_query(route.query(), self.recent_days);
                if route.param("saved") == Some("1") {
                    self.flash_until = Some(Instant::now() + self.flash);
                }
                match &mut self.screen {
                    Screen::Dashboard(dash) => {
                        if dash.list.selection() != selection {
                            dash.list.set_selection(selection);
                            dash.cursor = 0;
                        }
                    }
                    screen => *screen = Screen::Dashboard(Dashboard::new(selection)),
                }
                self.send(tx, LoadRequest::Reload(selection));
            }
            Route::Other(path) => {
                let message = format!("{path}: no such page");
                self.set_error(message);
                self.enter(Route::dashboard(), tx);
            }
        }
    }

    pub(crate) fn handle_ui_msg(&mut self, msg: UiMsg, tx: &Sender<LoadRequest>) {
        self.pending = self.pending.saturating_sub(1);
        match msg {
            UiMsg::Routed {
                requested,
                decision,
                email,
            } => {
                self.email = email;
                let target = match decision {
                    GateDecision::Admit => requested,
                    GateDecision::Redirect(to) => to,
                };
                self.enter(target, tx);
            }
            UiMsg::Loaded { selection, result } => {
                let Screen::Dashboard(dash) = &mut self.screen else {
                    return;
                };
                if dash.list.selection() != selection {
                    return;
                }
                dash.loading = false;
                match result {
                    Ok(rows) => {
                        dash.list.replace_rows(rows);
                        dash.load_error = None;
                        let len = dash.list.len();
                        dash.cursor = dash.cursor.min(len.saturating_sub(1));
                    }
                    Err(err) => dash.load_error = Some(err),
                }
            }
            UiMsg::SignedIn(result) => {
                if let Screen::Login(form) = &mut self.screen {
                    match result {
                        Ok(()) => form.flight.succeed(),
                        Err(err) => {
                            form.flight.fail(err);
                            return;
                        }
                    }
                }
                self.navigate(Route::dashboard(), tx);
            }
            UiMsg::RecoverySent(result) => match result {
                Ok(()) => {
                    if let Screen::Login(form) = &mut self.screen {
                        form.set_notice("Check your email for a reset link.");
                    }
                }
                Err(err) => self.set_error(err),
            },
            UiMsg::SignedOut => {
                self.email = None;
                self.screen = Screen::Login(AuthForm::sign_in());
                self.set_info("signed out".to_string());
            }
            UiMsg::PasswordReset(result) => {
                let Screen::Reset(reset) = &mut self.screen else {
                    return;
                };
                match result {
                    Ok(()) => {
                        *reset = ResetScreen::Done;
                        self.recovery = None;
                        self.redirect_at = Some(Instant::now() + self.flash);
                    }
                    Err(err) => {
                        if let ResetScreen::Ready { form, .. } = reset {
                            form.flight.fail(err);
                        }
                    }
                }
            }
            UiMsg::Saved { ticket, result } => {
                let Screen::Dashboard(dash) = &mut self.screen else {
                    return;
                };
                let settled = dash
                    .actions
                    .finish_form(ticket, result.as_ref().map(|_| ()).map_err(Clone::clone));
                let selection = dash.list.selection();
                match settled {
                    FormSettled::Stale => {}
                    FormSettled::Created => {
                        self.navigate(Route::dashboard_with(selection, true), tx);
                    }
                    FormSettled::Updated => {
                        self.set_info(SAVED_MESSAGE.to_string());
                        self.send(tx, LoadRequest::Reload(selection));
                    }
                    FormSettled::Failed(err) => self.set_error(err),
                }
            }
            UiMsg::Deleted(result) => {
                let Screen::Dashboard(dash) = &mut self.screen else {
                    return;
                };
                dash.actions
                    .finish_delete(result.as_ref().map(|_| ()).map_err(Clone::clone));
                let selection = dash.list.selection();
                match result {
                    Ok(outcome) => {
                        self.set_info(outcome.message);
                        self.send(tx, LoadRequest::Reload(selection));
                    }
                    Err(err) => self.set_error(err),
                }
            }
            UiMsg::SessionLost => {
                if let Screen::Dashboard(dash) = &mut self.screen {
                    dash.actions.reset();
                }
                self.set_info("session ended; sign in again".to_string());
                self.navigate(Route::Login, tx);
            }
        }
    }

    /// Timers: the saved flash and the post-reset redirect. Returns true
    /// when something visible changed.
    pub(crate) fn tick(&mut self, now: Instant, tx: &Sender<LoadRequest>) -> bool {
        let mut changed = false;
        if self.flash_until.is_some_and(|until| now >= until) {
            self.flash_until = None;
            changed = true;
        }
        if self.redirect_at.is_some_and(|at| now >= at) {
            self.redirect_at = None;
            self.navigate(Route::Login, tx);
            changed = true;
        }
        changed
    }

    /// Returns true when the console should exit.
    pub(crate) fn handle_key(&mut self, key: KeyEvent, tx: &Sender<LoadRequest>) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        self.info_message = None;

        let today = Local::now().date_naive();
        let recent_days = self.recent_days;
        let effects = match &mut self.screen {
            Screen::Pending(_) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => vec![Effect::Quit],
                _ => Vec::new(),
            },
            Screen::Login(form) => match form.handle_key(key) {
                AuthAction::None => Vec::new(),
                AuthAction::Quit => vec![Effect::Quit],
                AuthAction::Submit => {
                    if form.flight.begin() {
                        vec![Effect::Send(LoadRequest::SignIn {
                            email: form.value(0).trim().to_string(),
                            password: form.value(1).to_string(),
                        })]
                    } else {
                        Vec::new()
                    }
                }
                AuthAction::Alternate => vec![
                    Effect::Info("requesting a recovery email…".to_string()),
                    Effect::Send(LoadRequest::Recover(form.value(0).trim().to_string())),
                ],
            },
            Screen::Reset(ResetScreen::Ready { recovery, form }) => match form.handle_key(key) {
                AuthAction::None | AuthAction::Alternate => Vec::new(),
                AuthAction::Quit => vec![Effect::Send(LoadRequest::Navigate(Route::Login))],
                AuthAction::Submit => {
                    let password = form.value(0).to_string();
                    let confirm = form.value(1).to_string();
                    match auth::validate_new_password(&password, &confirm) {
                        Err(err) => {
                            form.flight.fail(err.to_string());
                            Vec::new()
                        }
                        Ok(()) if form.flight.begin() => {
                            vec![Effect::Send(LoadRequest::ResetPassword {
                                recovery: recovery.clone(),
                                password,
                                confirm,
                            })]
                        }
                        Ok(()) => Vec::new(),
                    }
                }
            },
            Screen::Reset(_) => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
                    self.redirect_at = None;
                    vec![Effect::Send(LoadRequest::Navigate(Route::Login))]
                }
                _ => Vec::new(),
            },
            Screen::Dashboard(dash) => dash.handle_key(key, today, recent_days),
        };

        for effect in effects {
            match effect {
                Effect::Send(req) => self.send(tx, req),
                Effect::Info(message) => self.set_info(message),
                Effect::Error(message) => self.set_error(message),
                Effect::ToggleHelp => self.show_help = !self.show_help,
                Effect::Quit => return true,
            }
        }
        false
    }
}

pub fn run(backend: Arc<dyn Backend>, store: SessionStore, options: ConsoleOptions) -> Result<()> {
    let (ui_tx, ui_rx) = mpsc::channel();
    let (req_tx, req_rx) = mpsc::channel();

    spawn_worker(backend, store, options.policy, req_rx, ui_tx);

    let mut app = AppState::new(&options);
    app.navigate(options.route.clone(), &req_tx);
    if !app.is_busy() {
        return Err(Error::OperationFailed(
            "failed to start console worker".to_string(),
        ));
    }
    run_terminal(&mut app, ui_rx, req_tx)
}

fn run_terminal(
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
    req_tx: Sender<LoadRequest>,
) -> Result<()> {
    enable_raw_mode()?;
    let _guard = TerminalGuard {
        restore: restore_terminal,
    };
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    run_loop(&mut terminal, app, ui_rx, req_tx)
}

/// Runs `restore` on drop, so every exit after raw mode is on (including
/// a failed setup step) leaves the terminal usable.
struct TerminalGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
    req_tx: Sender<LoadRequest>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            app.handle_ui_msg(msg, &req_tx);
            dirty = true;
        }

        if app.tick(Instant::now(), &req_tx) {
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key, &req_tx) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}
