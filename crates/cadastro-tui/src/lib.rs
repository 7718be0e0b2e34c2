// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use cadastro_app::{
    AppCommand, AppMode, AppState, CellValue, Company, CompanyId, Contact, ContactId,
    DocumentKind, DuplicateFields, FormKind, FormPayload, JobRole, PersonKind, PostalAddress,
    RecordStatus, RegistryCompany, RoleId, RowRecord, SectorId, SignInInput, SummaryCounts,
    Sector, TabKind, TableController, UniquenessQuery, digits_only, email_is_valid, mask_document,
    mask_phone, mask_postal_code, password_strength, role_matches_sector,
};
use cadastro_app::forms::{
    CompanyFormInput, ContactFormInput, RoleFormInput, SectorFormInput,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventState, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_SECS: u64 = 5;
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum TabSnapshot {
    Contacts(Vec<Contact>),
    Companies(Vec<Company>),
    Sectors(Vec<Sector>),
    Roles(Vec<JobRole>),
}

impl TabSnapshot {
    pub const fn tab_kind(&self) -> TabKind {
        match self {
            Self::Contacts(_) => TabKind::Contacts,
            Self::Companies(_) => TabKind::Companies,
            Self::Sectors(_) => TabKind::Sectors,
            Self::Roles(_) => TabKind::Roles,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Contacts(rows) => rows.len(),
            Self::Companies(rows) => rows.len(),
            Self::Sectors(rows) => rows.len(),
            Self::Roles(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessField {
    Email,
    Phone,
    Document,
}

impl UniquenessField {
    const fn label(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Document => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniquenessEvent {
    Completed {
        request_id: u64,
        field: UniquenessField,
        duplicates: DuplicateFields,
    },
    Failed {
        request_id: u64,
        field: UniquenessField,
        error: String,
    },
}

impl UniquenessEvent {
    const fn request_id(&self) -> u64 {
        match self {
            Self::Completed { request_id, .. } | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Uniqueness(UniquenessEvent),
}

/// Seam between the interface and whatever serves the data: the HTTP
/// client in production, fixture data for `--demo` and tests.
pub trait AppRuntime {
    fn load_summary(&mut self) -> Result<SummaryCounts>;
    fn load_tab_snapshot(&mut self, tab: TabKind) -> Result<Option<TabSnapshot>>;
    fn load_companies(&mut self) -> Result<Vec<Company>>;
    fn load_sectors(&mut self) -> Result<Vec<Sector>>;
    fn load_roles(&mut self) -> Result<Vec<JobRole>>;
    fn remembered_email(&mut self) -> Option<String>;
    fn sign_in(&mut self, input: &SignInInput) -> Result<String>;
    fn submit_form(&mut self, payload: &FormPayload) -> Result<()>;
    fn toggle_status(&mut self, tab: TabKind, id: i64, desired: bool) -> Result<RecordStatus>;
    fn delete_record(&mut self, tab: TabKind, id: i64) -> Result<()>;
    fn check_uniqueness(&mut self, query: &UniquenessQuery) -> Result<DuplicateFields>;
    fn company_registry_lookup(&mut self, document: &str) -> Result<Option<RegistryCompany>>;
    fn postal_lookup(&mut self, code: &str) -> Result<Option<PostalAddress>>;
    fn import_records(&mut self, path: &Path) -> Result<String>;

    /// Runs the duplicate check and delivers the outcome through the
    /// internal event channel. The default implementation is synchronous;
    /// network-backed runtimes override it to run on a worker thread.
    fn spawn_uniqueness_check(
        &mut self,
        request_id: u64,
        field: UniquenessField,
        query: UniquenessQuery,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let event = match self.check_uniqueness(&query) {
            Ok(duplicates) => InternalEvent::Uniqueness(UniquenessEvent::Completed {
                request_id,
                field,
                duplicates,
            }),
            Err(error) => InternalEvent::Uniqueness(UniquenessEvent::Failed {
                request_id,
                field,
                error: error.to_string(),
            }),
        };
        tx.send(event)
            .map_err(|_| anyhow::anyhow!("uniqueness event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoginUiState {
    input: SignInInput,
    cursor: usize,
    show_password: bool,
    caps_lock: bool,
    submitting: bool,
    field_errors: [Option<String>; 2],
}

impl LoginUiState {
    fn new(remembered_email: Option<String>) -> Self {
        let remember = remembered_email.is_some();
        Self {
            input: SignInInput {
                email: remembered_email.unwrap_or_default(),
                password: String::new(),
                remember,
            },
            cursor: 0,
            show_password: false,
            caps_lock: false,
            submitting: false,
            field_errors: [None, None],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Email,
    Phone,
    Document,
    PostalCode,
    Password,
    Integer,
    PersonPick,
    CompanyPick,
    SectorPick,
    RolePick,
    ActiveToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormFieldSpec {
    label: &'static str,
    kind: FieldKind,
}

const CONTACT_NAME: usize = 0;
const CONTACT_EMAIL: usize = 1;
const CONTACT_PHONE: usize = 2;
const CONTACT_COMPANY: usize = 3;
const CONTACT_SECTOR: usize = 4;
const CONTACT_ROLE: usize = 5;
const CONTACT_PASSWORD: usize = 6;

const COMPANY_PERSON: usize = 0;
const COMPANY_LEGAL_NAME: usize = 1;
const COMPANY_TRADE_NAME: usize = 2;
const COMPANY_DOCUMENT: usize = 3;
const COMPANY_STATE_REG: usize = 4;
const COMPANY_MUNICIPAL_REG: usize = 5;
const COMPANY_POSTAL: usize = 6;
const COMPANY_STREET: usize = 7;
const COMPANY_DISTRICT: usize = 8;
const COMPANY_CITY: usize = 9;
const COMPANY_STATE: usize = 10;

const ROLE_SECTOR: usize = 1;
const ROLE_INDEX: usize = 2;

fn form_field_specs(kind: FormKind) -> &'static [FormFieldSpec] {
    match kind {
        FormKind::Contact => &[
            FormFieldSpec { label: "full name", kind: FieldKind::Text },
            FormFieldSpec { label: "email", kind: FieldKind::Email },
            FormFieldSpec { label: "phone", kind: FieldKind::Phone },
            FormFieldSpec { label: "company", kind: FieldKind::CompanyPick },
            FormFieldSpec { label: "sector", kind: FieldKind::SectorPick },
            FormFieldSpec { label: "role", kind: FieldKind::RolePick },
            FormFieldSpec { label: "password", kind: FieldKind::Password },
            FormFieldSpec { label: "active", kind: FieldKind::ActiveToggle },
        ],
        FormKind::Company => &[
            FormFieldSpec { label: "person kind", kind: FieldKind::PersonPick },
            FormFieldSpec { label: "legal name", kind: FieldKind::Text },
            FormFieldSpec { label: "trade name", kind: FieldKind::Text },
            FormFieldSpec { label: "document", kind: FieldKind::Document },
            FormFieldSpec { label: "state registration", kind: FieldKind::Text },
            FormFieldSpec { label: "municipal registration", kind: FieldKind::Text },
            FormFieldSpec { label: "postal code", kind: FieldKind::PostalCode },
            FormFieldSpec { label: "street", kind: FieldKind::Text },
            FormFieldSpec { label: "district", kind: FieldKind::Text },
            FormFieldSpec { label: "city", kind: FieldKind::Text },
            FormFieldSpec { label: "state", kind: FieldKind::Text },
            FormFieldSpec { label: "active", kind: FieldKind::ActiveToggle },
        ],
        FormKind::Sector => &[
            FormFieldSpec { label: "name", kind: FieldKind::Text },
            FormFieldSpec { label: "active", kind: FieldKind::ActiveToggle },
        ],
        FormKind::Role => &[
            FormFieldSpec { label: "name", kind: FieldKind::Text },
            FormFieldSpec { label: "sector", kind: FieldKind::SectorPick },
            FormFieldSpec { label: "ordering index", kind: FieldKind::Integer },
            FormFieldSpec { label: "active", kind: FieldKind::ActiveToggle },
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UniquenessInFlight {
    request_id: u64,
    field: UniquenessField,
}

#[derive(Debug, Clone, PartialEq)]
struct FormUiState {
    kind: FormKind,
    record_id: Option<i64>,
    values: Vec<String>,
    picks: Vec<i64>,
    person: PersonKind,
    active: bool,
    cursor: usize,
    errors: Vec<Option<String>>,
    duplicates: DuplicateFields,
    in_flight: Option<UniquenessInFlight>,
    check_failed: bool,
    dirty: bool,
    discard_armed: bool,
}

impl FormUiState {
    fn blank(kind: FormKind) -> Self {
        let len = form_field_specs(kind).len();
        Self {
            kind,
            record_id: None,
            values: vec![String::new(); len],
            picks: vec![0; len],
            person: PersonKind::Legal,
            active: true,
            cursor: 0,
            errors: vec![None; len],
            duplicates: DuplicateFields::default(),
            in_flight: None,
            check_failed: false,
            dirty: false,
            discard_armed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PendingAction {
    Toggle {
        tab: TabKind,
        id: i64,
        name: String,
        current: RecordStatus,
    },
    Delete {
        tab: TabKind,
        id: i64,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct ConfirmUiState {
    action: PendingAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ImportUiState {
    path: String,
}

#[derive(Debug)]
struct ViewData {
    page_size: usize,
    summary: SummaryCounts,
    companies: Vec<Company>,
    sectors: Vec<Sector>,
    roles: Vec<JobRole>,
    snapshot: Option<TabSnapshot>,
    table: Option<TableController>,
    columns: &'static [&'static str],
    selected_row: usize,
    selected_col: usize,
    login: Option<LoginUiState>,
    form: Option<FormUiState>,
    confirm: Option<ConfirmUiState>,
    import_prompt: Option<ImportUiState>,
    help_visible: bool,
    status_token: u64,
    uniqueness_counter: u64,
}

impl ViewData {
    fn new(page_size: usize) -> Self {
        Self {
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
            summary: SummaryCounts::default(),
            companies: Vec::new(),
            sectors: Vec::new(),
            roles: Vec::new(),
            snapshot: None,
            table: None,
            columns: &[],
            selected_row: 0,
            selected_col: 0,
            login: None,
            form: None,
            confirm: None,
            import_prompt: None,
            help_visible: false,
            status_token: 0,
            uniqueness_counter: 0,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    page_size: usize,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(page_size);
    let (internal_tx, internal_rx) = mpsc::channel();

    if state.operator.is_none() {
        view_data.login = Some(LoginUiState::new(runtime.remembered_email()));
    } else if let Err(error) = refresh_all(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error:#}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Uniqueness(event) => {
                handle_uniqueness_event(state, view_data, tx, event);
            }
        }
    }
}

/// Responses are matched against the latest request id issued; anything
/// older is a superseded check and is dropped.
fn handle_uniqueness_event(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: UniquenessEvent,
) {
    let mut toast = None;
    if let Some(form) = view_data.form.as_mut() {
        let Some(in_flight) = form.in_flight else {
            return;
        };
        if event.request_id() != in_flight.request_id {
            return;
        }
        form.in_flight = None;

        match event {
            UniquenessEvent::Completed { field, duplicates, .. } => {
                let flagged = match field {
                    UniquenessField::Email => duplicates.email,
                    UniquenessField::Phone => duplicates.phone,
                    UniquenessField::Document => duplicates.document,
                };
                match field {
                    UniquenessField::Email => form.duplicates.email = flagged,
                    UniquenessField::Phone => form.duplicates.phone = flagged,
                    UniquenessField::Document => form.duplicates.document = flagged,
                }
                if let Some(index) = uniqueness_field_index(form.kind, field) {
                    form.errors[index] = flagged
                        .then(|| format!("{} already registered to another record", field.label()));
                }
                if flagged {
                    toast = Some(format!("duplicate {} found", field.label()));
                }
            }
            UniquenessEvent::Failed { field, error, .. } => {
                form.check_failed = true;
                toast = Some(format!(
                    "duplicate check for {} failed: {error} -- saving is blocked until it succeeds",
                    field.label()
                ));
            }
        }
    }
    if let Some(message) = toast {
        emit_status(state, view_data, tx, message);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(STATUS_CLEAR_SECS));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.login.is_some() {
        handle_login_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.confirm.is_some() {
        handle_confirm_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.import_prompt.is_some() {
        handle_import_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.form.is_some() {
        handle_form_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if state.mode == AppMode::Search {
        handle_search_key(state, view_data, key);
        return false;
    }

    handle_nav_key(state, runtime, view_data, internal_tx, key)
}

fn handle_login_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(login) = view_data.login.as_mut() else {
        return;
    };
    login.caps_lock = caps_lock_hint(&key, login.caps_lock);

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('r') {
            login.show_password = !login.show_password;
        }
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down => {
            login.cursor = (login.cursor + 1) % 3;
        }
        KeyCode::BackTab | KeyCode::Up => {
            login.cursor = (login.cursor + 2) % 3;
        }
        KeyCode::Char(' ') if login.cursor == 2 => {
            login.input.remember = !login.input.remember;
        }
        KeyCode::Char(ch) => {
            match login.cursor {
                0 => {
                    login.input.email.push(ch);
                    login.field_errors[0] = None;
                }
                1 => {
                    login.input.password.push(ch);
                    login.field_errors[1] = None;
                }
                _ => {}
            }
        }
        KeyCode::Backspace => match login.cursor {
            0 => {
                login.input.email.pop();
                login.field_errors[0] = None;
            }
            1 => {
                login.input.password.pop();
                login.field_errors[1] = None;
            }
            _ => {}
        },
        KeyCode::Enter => {
            submit_sign_in(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
}

/// Caps-lock state comes from the kitty keyboard protocol when the
/// terminal reports it, with a shift-vs-case heuristic as fallback.
fn caps_lock_hint(key: &KeyEvent, current: bool) -> bool {
    if key.state.contains(KeyEventState::CAPS_LOCK) {
        return true;
    }
    match key.code {
        KeyCode::Char(ch) if ch.is_ascii_uppercase() => {
            !key.modifiers.contains(KeyModifiers::SHIFT)
        }
        KeyCode::Char(ch) if ch.is_ascii_lowercase() => {
            key.modifiers.contains(KeyModifiers::SHIFT)
        }
        _ => current,
    }
}

fn submit_sign_in<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(login) = view_data.login.as_mut() else {
        return;
    };
    if login.submitting {
        return;
    }

    login.field_errors = [None, None];
    let email = login.input.email.trim();
    if email.is_empty() {
        login.field_errors[0] = Some("email is required".to_owned());
    } else if !email_is_valid(email) {
        login.field_errors[0] = Some("email is not a valid address".to_owned());
    }
    if login.input.password.is_empty() {
        login.field_errors[1] = Some("password is required".to_owned());
    } else if login.input.password.chars().count() < 6 {
        login.field_errors[1] = Some("password must have at least 6 characters".to_owned());
    }
    if login.field_errors.iter().any(Option::is_some) {
        return;
    }

    login.submitting = true;
    let input = login.input.clone();
    match runtime.sign_in(&input) {
        Ok(operator) => {
            view_data.login = None;
            state.dispatch(AppCommand::SetOperator(operator.clone()));
            if let Err(error) = refresh_all(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error:#}"));
            } else {
                emit_status(state, view_data, internal_tx, format!("signed in as {operator}"));
            }
        }
        Err(error) => {
            if let Some(login) = view_data.login.as_mut() {
                login.submitting = false;
            }
            emit_status(state, view_data, internal_tx, format!("sign-in failed: {error:#}"));
        }
    }
}

fn handle_confirm_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            let Some(confirm) = view_data.confirm.take() else {
                return;
            };
            state.dispatch(AppCommand::ExitToNav);
            execute_pending_action(state, runtime, view_data, internal_tx, confirm.action);
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            view_data.confirm = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        _ => {}
    }
}

/// On success only the affected row is patched from the status the server
/// echoed; on failure every row keeps its prior state.
fn execute_pending_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: PendingAction,
) {
    match action {
        PendingAction::Toggle { tab, id, name, current } => {
            let desired = !current.is_active();
            match runtime.toggle_status(tab, id, desired) {
                Ok(status) => {
                    if let Some(table) = view_data.table.as_mut() {
                        table.patch_status(id, status);
                    }
                    if let Some(snapshot) = view_data.snapshot.as_mut() {
                        patch_snapshot_status(snapshot, id, status);
                    }
                    refresh_summary(runtime, view_data);
                    let verb = if status.is_active() { "activated" } else { "deactivated" };
                    emit_status(state, view_data, internal_tx, format!("{name} {verb}"));
                }
                Err(error) => {
                    emit_status(state, view_data, internal_tx, format!("toggle failed: {error:#}"));
                }
            }
        }
        PendingAction::Delete { tab, id, name } => match runtime.delete_record(tab, id) {
            Ok(()) => {
                if let Some(table) = view_data.table.as_mut() {
                    table.remove_row(id);
                }
                if let Some(snapshot) = view_data.snapshot.as_mut() {
                    remove_from_snapshot(snapshot, id);
                }
                view_data.selected_row = 0;
                refresh_summary(runtime, view_data);
                emit_status(state, view_data, internal_tx, format!("{name} deleted"));
            }
            Err(error) => {
                emit_status(state, view_data, internal_tx, format!("delete failed: {error:#}"));
            }
        },
    }
}

fn handle_import_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(prompt) = view_data.import_prompt.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.import_prompt = None;
        }
        KeyCode::Char(ch) => {
            prompt.path.push(ch);
        }
        KeyCode::Backspace => {
            prompt.path.pop();
        }
        KeyCode::Enter => {
            let path = prompt.path.trim().to_owned();
            if path.is_empty() {
                emit_status(state, view_data, internal_tx, "enter a file path to import");
                return;
            }
            match runtime.import_records(Path::new(&path)) {
                Ok(message) => {
                    view_data.import_prompt = None;
                    if let Err(error) = refresh_all(state, runtime, view_data) {
                        emit_status(
                            state,
                            view_data,
                            internal_tx,
                            format!("reload after import failed: {error:#}"),
                        );
                    } else {
                        emit_status(state, view_data, internal_tx, message);
                    }
                }
                Err(error) => {
                    emit_status(state, view_data, internal_tx, format!("import failed: {error:#}"));
                }
            }
        }
        _ => {}
    }
}

fn handle_search_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    let Some(table) = view_data.table.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    match key.code {
        KeyCode::Esc => {
            table.clear_query();
            view_data.selected_row = 0;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            table.pop_query_char();
            view_data.selected_row = 0;
        }
        KeyCode::Char(ch) => {
            table.push_query_char(ch);
            view_data.selected_row = 0;
        }
        _ => {}
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => {
            view_data.help_visible = true;
        }
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextTab);
            load_active_tab(state, runtime, view_data, internal_tx);
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevTab);
            load_active_tab(state, runtime, view_data, internal_tx);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_selection(view_data, 1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            move_selection(view_data, -1);
        }
        KeyCode::Left | KeyCode::Char('h') => {
            move_column(view_data, -1);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            move_column(view_data, 1);
        }
        KeyCode::Char('g') => {
            view_data.selected_row = 0;
        }
        KeyCode::Char('G') => {
            if let Some(table) = view_data.table.as_ref() {
                view_data.selected_row = table.view().visible.len().saturating_sub(1);
            }
        }
        KeyCode::Char('n') | KeyCode::PageDown => {
            if let Some(table) = view_data.table.as_mut()
                && table.next_page()
            {
                view_data.selected_row = 0;
            }
        }
        KeyCode::Char('p') | KeyCode::PageUp => {
            if let Some(table) = view_data.table.as_mut()
                && table.prev_page()
            {
                view_data.selected_row = 0;
            }
        }
        KeyCode::Char('/') => {
            if view_data.table.is_some() {
                state.dispatch(AppCommand::EnterSearch);
            }
        }
        KeyCode::Char('f') => {
            if let Some(table) = view_data.table.as_mut() {
                let status = table.cycle_status();
                view_data.selected_row = 0;
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("status filter: {}", status.label()),
                );
            }
        }
        KeyCode::Char('s') => {
            cycle_sort_on_selected(state, view_data, internal_tx);
        }
        KeyCode::Char('S') => {
            if let Some(table) = view_data.table.as_mut() {
                table.clear_sort();
                emit_status(state, view_data, internal_tx, "sort cleared");
            }
        }
        KeyCode::Char('a') => {
            open_blank_form(state, view_data);
        }
        KeyCode::Char('e') => {
            open_edit_form(state, view_data);
        }
        KeyCode::Char('t') => {
            open_toggle_confirm(state, view_data);
        }
        KeyCode::Char('d') => {
            open_delete_confirm(state, view_data, internal_tx);
        }
        KeyCode::Char('i') => {
            if matches!(state.active_tab, TabKind::Contacts | TabKind::Companies) {
                view_data.import_prompt = Some(ImportUiState::default());
            }
        }
        KeyCode::Char('r') => {
            if let Err(error) = refresh_all(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("reload failed: {error:#}"));
            } else {
                emit_status(state, view_data, internal_tx, "reloaded");
            }
        }
        _ => {}
    }
    false
}

fn load_active_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Err(error) = refresh_tab(state, runtime, view_data) {
        emit_status(state, view_data, internal_tx, format!("load failed: {error:#}"));
    }
}

fn move_selection(view_data: &mut ViewData, delta: isize) {
    let Some(table) = view_data.table.as_ref() else {
        return;
    };
    let len = table.view().visible.len();
    if len == 0 {
        view_data.selected_row = 0;
        return;
    }
    let current = view_data.selected_row.min(len - 1) as isize;
    view_data.selected_row = (current + delta).clamp(0, len as isize - 1) as usize;
}

fn move_column(view_data: &mut ViewData, delta: isize) {
    let len = view_data.columns.len();
    if len == 0 {
        return;
    }
    let current = view_data.selected_col.min(len - 1) as isize;
    view_data.selected_col = (current + delta).rem_euclid(len as isize) as usize;
}

fn cycle_sort_on_selected(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let column = view_data.selected_col;
    let label = view_data.columns.get(column).copied().unwrap_or("column");
    let Some(table) = view_data.table.as_mut() else {
        return;
    };
    let message = match table.cycle_sort(column) {
        Some(sort) => match sort.direction {
            cadastro_app::SortDirection::Asc => format!("sort {label} asc"),
            cadastro_app::SortDirection::Desc => format!("sort {label} desc"),
        },
        None => "sort cleared".to_owned(),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn selected_row_target(view_data: &ViewData) -> Option<(i64, String, RecordStatus)> {
    let table = view_data.table.as_ref()?;
    let view = table.view();
    let row_index = *view.visible.get(view_data.selected_row)?;
    let row = table.row(row_index)?;
    let name = row
        .cells
        .first()
        .map(CellValue::display)
        .unwrap_or_default();
    Some((row.id, name, row.status))
}

fn open_toggle_confirm(state: &mut AppState, view_data: &mut ViewData) {
    if state.active_tab == TabKind::Dashboard {
        return;
    }
    let Some((id, name, current)) = selected_row_target(view_data) else {
        return;
    };
    view_data.confirm = Some(ConfirmUiState {
        action: PendingAction::Toggle {
            tab: state.active_tab,
            id,
            name,
            current,
        },
    });
    state.dispatch(AppCommand::OpenConfirm);
}

fn open_delete_confirm(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.active_tab != TabKind::Contacts {
        emit_status(state, view_data, internal_tx, "delete applies to contacts only");
        return;
    }
    let Some((id, name, _)) = selected_row_target(view_data) else {
        return;
    };
    view_data.confirm = Some(ConfirmUiState {
        action: PendingAction::Delete {
            tab: state.active_tab,
            id,
            name,
        },
    });
    state.dispatch(AppCommand::OpenConfirm);
}

fn form_kind_for_tab(tab: TabKind) -> Option<FormKind> {
    match tab {
        TabKind::Dashboard => None,
        TabKind::Contacts => Some(FormKind::Contact),
        TabKind::Companies => Some(FormKind::Company),
        TabKind::Sectors => Some(FormKind::Sector),
        TabKind::Roles => Some(FormKind::Role),
    }
}

fn open_blank_form(state: &mut AppState, view_data: &mut ViewData) {
    let Some(kind) = form_kind_for_tab(state.active_tab) else {
        return;
    };
    view_data.form = Some(FormUiState::blank(kind));
    state.dispatch(AppCommand::OpenForm(kind));
}

fn open_edit_form(state: &mut AppState, view_data: &mut ViewData) {
    let Some(kind) = form_kind_for_tab(state.active_tab) else {
        return;
    };
    let Some((id, _, _)) = selected_row_target(view_data) else {
        return;
    };
    let Some(snapshot) = view_data.snapshot.as_ref() else {
        return;
    };

    let mut form = FormUiState::blank(kind);
    form.record_id = Some(id);
    match snapshot {
        TabSnapshot::Contacts(rows) => {
            let Some(contact) = rows.iter().find(|row| row.id.get() == id) else {
                return;
            };
            form.values[CONTACT_NAME] = contact.full_name.clone();
            form.values[CONTACT_EMAIL] = contact.email.clone();
            form.values[CONTACT_PHONE] = mask_phone(&contact.phone);
            form.picks[CONTACT_COMPANY] = contact.company_id.get();
            form.picks[CONTACT_SECTOR] = contact.sector_id.get();
            form.picks[CONTACT_ROLE] = contact.role_id.get();
            form.active = contact.status.is_active();
        }
        TabSnapshot::Companies(rows) => {
            let Some(company) = rows.iter().find(|row| row.id.get() == id) else {
                return;
            };
            form.person = company.person;
            form.values[COMPANY_LEGAL_NAME] = company.legal_name.clone();
            form.values[COMPANY_TRADE_NAME] = company.trade_name.clone();
            form.values[COMPANY_DOCUMENT] =
                mask_document(&company.document, company.person.document_kind());
            form.values[COMPANY_STATE_REG] = company.state_registration.clone();
            form.values[COMPANY_MUNICIPAL_REG] = company.municipal_registration.clone();
            form.values[COMPANY_POSTAL] = mask_postal_code(&company.postal_code);
            form.values[COMPANY_STREET] = company.street.clone();
            form.values[COMPANY_DISTRICT] = company.district.clone();
            form.values[COMPANY_CITY] = company.city.clone();
            form.values[COMPANY_STATE] = company.state.clone();
            form.active = company.status.is_active();
        }
        TabSnapshot::Sectors(rows) => {
            let Some(sector) = rows.iter().find(|row| row.id.get() == id) else {
                return;
            };
            form.values[0] = sector.name.clone();
            form.active = sector.status.is_active();
        }
        TabSnapshot::Roles(rows) => {
            let Some(role) = rows.iter().find(|row| row.id.get() == id) else {
                return;
            };
            form.values[0] = role.name.clone();
            form.picks[ROLE_SECTOR] = role.sector_id.get();
            form.values[ROLE_INDEX] = role
                .position_index
                .map(|index| index.to_string())
                .unwrap_or_default();
            form.active = role.status.is_active();
        }
    }

    view_data.form = Some(form);
    state.dispatch(AppCommand::OpenForm(kind));
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            submit_active_form(state, runtime, view_data, internal_tx);
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            let Some(form) = view_data.form.as_mut() else {
                return;
            };
            if form.dirty && !form.discard_armed {
                form.discard_armed = true;
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "unsaved changes -- press esc again to discard",
                );
                return;
            }
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Down | KeyCode::Tab | KeyCode::Enter => {
            move_form_cursor(state, runtime, view_data, internal_tx, 1);
        }
        KeyCode::Up | KeyCode::BackTab => {
            move_form_cursor(state, runtime, view_data, internal_tx, -1);
        }
        KeyCode::Left => {
            apply_form_choice(state, view_data, internal_tx, -1);
        }
        KeyCode::Right => {
            apply_form_choice(state, view_data, internal_tx, 1);
        }
        KeyCode::Char(ch) => {
            edit_form_value(view_data, FormEdit::Push(ch));
        }
        KeyCode::Backspace => {
            edit_form_value(view_data, FormEdit::Pop);
        }
        _ => {}
    }
}

enum FormEdit {
    Push(char),
    Pop,
}

fn edit_form_value(view_data: &mut ViewData, edit: FormEdit) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let specs = form_field_specs(form.kind);
    let Some(spec) = specs.get(form.cursor) else {
        return;
    };

    let value = &mut form.values[form.cursor];
    match spec.kind {
        FieldKind::Text | FieldKind::Email | FieldKind::Password => match edit {
            FormEdit::Push(ch) => value.push(ch),
            FormEdit::Pop => {
                value.pop();
            }
        },
        FieldKind::Integer => match edit {
            FormEdit::Push(ch) => {
                if ch.is_ascii_digit() {
                    value.push(ch);
                }
            }
            FormEdit::Pop => {
                value.pop();
            }
        },
        FieldKind::Phone => {
            apply_digit_edit(value, edit, 11);
            *value = mask_phone(value);
        }
        FieldKind::PostalCode => {
            apply_digit_edit(value, edit, 8);
            *value = mask_postal_code(value);
        }
        FieldKind::Document => {
            let kind = form.person.document_kind();
            apply_digit_edit(value, edit, kind.digit_count());
            *value = mask_document(value, kind);
        }
        FieldKind::PersonPick
        | FieldKind::CompanyPick
        | FieldKind::SectorPick
        | FieldKind::RolePick
        | FieldKind::ActiveToggle => return,
    }

    form.dirty = true;
    form.discard_armed = false;
    form.errors[form.cursor] = None;
    form.check_failed = false;
    match spec.kind {
        FieldKind::Email => form.duplicates.email = false,
        FieldKind::Phone => form.duplicates.phone = false,
        FieldKind::Document => form.duplicates.document = false,
        _ => {}
    }
}

fn apply_digit_edit(value: &mut String, edit: FormEdit, digit_cap: usize) {
    match edit {
        FormEdit::Push(ch) => {
            if ch.is_ascii_digit() && digits_only(value).len() < digit_cap {
                value.push(ch);
            }
        }
        FormEdit::Pop => {
            let mut digits = digits_only(value);
            digits.pop();
            *value = digits;
        }
    }
}

fn move_form_cursor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let previous = {
        let Some(form) = view_data.form.as_mut() else {
            return;
        };
        let len = form_field_specs(form.kind).len() as isize;
        let previous = form.cursor;
        form.cursor = (form.cursor as isize + delta).rem_euclid(len) as usize;
        previous
    };
    on_field_exit(state, runtime, view_data, internal_tx, previous);
}

/// Field-exit hooks: duplicate pre-checks on identifying fields, and the
/// fail-open enrichment lookups.
fn on_field_exit<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    index: usize,
) {
    let Some(form) = view_data.form.as_ref() else {
        return;
    };
    let record_id = form.record_id;
    match (form.kind, index) {
        (FormKind::Contact, CONTACT_EMAIL) => {
            let email = form.values[CONTACT_EMAIL].trim().to_owned();
            if !email.is_empty() && email_is_valid(&email) {
                begin_uniqueness_check(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    UniquenessField::Email,
                    UniquenessQuery {
                        email: Some(email),
                        record_id,
                        ..UniquenessQuery::default()
                    },
                );
            }
        }
        (FormKind::Contact, CONTACT_PHONE) => {
            let digits = digits_only(&form.values[CONTACT_PHONE]);
            if (10..=11).contains(&digits.len()) {
                begin_uniqueness_check(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    UniquenessField::Phone,
                    UniquenessQuery {
                        phone: Some(digits),
                        record_id,
                        ..UniquenessQuery::default()
                    },
                );
            }
        }
        (FormKind::Company, COMPANY_DOCUMENT) => {
            let kind = form.person.document_kind();
            let digits = digits_only(&form.values[COMPANY_DOCUMENT]);
            if digits.len() != kind.digit_count() {
                return;
            }
            begin_uniqueness_check(
                state,
                runtime,
                view_data,
                internal_tx,
                UniquenessField::Document,
                UniquenessQuery {
                    document: Some(digits.clone()),
                    record_id,
                    ..UniquenessQuery::default()
                },
            );
            if kind == DocumentKind::Organization {
                apply_registry_prefill(state, runtime, view_data, internal_tx, &digits);
            }
        }
        (FormKind::Company, COMPANY_POSTAL) => {
            let digits = digits_only(&form.values[COMPANY_POSTAL]);
            if digits.len() == 8 {
                apply_postal_prefill(state, runtime, view_data, internal_tx, &digits);
            }
        }
        _ => {}
    }
}

fn begin_uniqueness_check<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    field: UniquenessField,
    query: UniquenessQuery,
) {
    view_data.uniqueness_counter += 1;
    let request_id = view_data.uniqueness_counter;

    if let Some(form) = view_data.form.as_mut() {
        form.in_flight = Some(UniquenessInFlight { request_id, field });
        form.check_failed = false;
    }

    let spawn_result =
        runtime.spawn_uniqueness_check(request_id, field, query, internal_tx.clone());
    if let Err(error) = spawn_result {
        if let Some(form) = view_data.form.as_mut() {
            form.in_flight = None;
            form.check_failed = true;
        }
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("duplicate check failed to start: {error:#}"),
        );
    }
}

/// Registry data never overwrites what the operator already typed.
fn apply_registry_prefill<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    document: &str,
) {
    match runtime.company_registry_lookup(document) {
        Ok(Some(registry)) => {
            let mut filled = false;
            if let Some(form) = view_data.form.as_mut() {
                let pairs = [
                    (COMPANY_LEGAL_NAME, &registry.legal_name),
                    (COMPANY_TRADE_NAME, &registry.trade_name),
                    (COMPANY_STATE_REG, &registry.state_registration),
                    (COMPANY_MUNICIPAL_REG, &registry.municipal_registration),
                ];
                for (index, value) in pairs {
                    if form.values[index].trim().is_empty() && !value.trim().is_empty() {
                        form.values[index] = value.clone();
                        filled = true;
                    }
                }
            }
            if filled {
                emit_status(state, view_data, internal_tx, "company data filled from registry");
            }
        }
        Ok(None) => {}
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("registry lookup failed: {error:#}"),
            );
        }
    }
}

fn apply_postal_prefill<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    code: &str,
) {
    match runtime.postal_lookup(code) {
        Ok(Some(address)) => {
            if let Some(form) = view_data.form.as_mut() {
                let pairs = [
                    (COMPANY_STREET, &address.street),
                    (COMPANY_DISTRICT, &address.district),
                    (COMPANY_CITY, &address.city),
                    (COMPANY_STATE, &address.state),
                ];
                for (index, value) in pairs {
                    if form.values[index].trim().is_empty() && !value.trim().is_empty() {
                        form.values[index] = value.clone();
                    }
                }
            }
        }
        Ok(None) => {}
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("postal lookup failed: {error:#}"),
            );
        }
    }
}

fn apply_form_choice(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let mut toast = None;
    if let Some(form) = view_data.form.as_mut() {
        let specs = form_field_specs(form.kind);
        let Some(spec) = specs.get(form.cursor) else {
            return;
        };
        match spec.kind {
            FieldKind::PersonPick => {
                form.person = form.person.toggled();
                // switching kinds restarts document entry under the other mask
                form.values[COMPANY_DOCUMENT].clear();
                form.errors[COMPANY_DOCUMENT] = None;
                form.duplicates.document = false;
                form.dirty = true;
                toast = Some(format!("person kind: {}", form.person.label()));
            }
            FieldKind::CompanyPick => {
                let ids: Vec<i64> = view_data.companies.iter().map(|company| company.id.get()).collect();
                form.picks[form.cursor] = cycle_id(form.picks[form.cursor], &ids, delta);
                form.dirty = true;
            }
            FieldKind::SectorPick => {
                let ids: Vec<i64> = view_data.sectors.iter().map(|sector| sector.id.get()).collect();
                form.picks[form.cursor] = cycle_id(form.picks[form.cursor], &ids, delta);
                form.dirty = true;
                // contact role choices depend on the sector; reset on change
                if form.kind == FormKind::Contact {
                    form.picks[CONTACT_ROLE] = 0;
                }
            }
            FieldKind::RolePick => {
                let sector_id = form.picks[CONTACT_SECTOR];
                if sector_id == 0 {
                    toast = Some("choose a sector to enable roles".to_owned());
                } else {
                    let ids: Vec<i64> = view_data
                        .roles
                        .iter()
                        .filter(|role| role.sector_id.get() == sector_id)
                        .map(|role| role.id.get())
                        .collect();
                    if ids.is_empty() {
                        toast = Some("no roles registered for this sector".to_owned());
                    } else {
                        form.picks[form.cursor] = cycle_id(form.picks[form.cursor], &ids, delta);
                        form.dirty = true;
                    }
                }
            }
            FieldKind::ActiveToggle => {
                form.active = !form.active;
                form.dirty = true;
            }
            _ => return,
        }
    }
    if let Some(message) = toast {
        emit_status(state, view_data, internal_tx, message);
    }
}

/// Cycles through the id list with an extra "none" slot at the end.
fn cycle_id(current: i64, ids: &[i64], delta: isize) -> i64 {
    if ids.is_empty() {
        return 0;
    }
    let slots = ids.len() as isize + 1;
    let position = match ids.iter().position(|&id| id == current) {
        Some(position) => position as isize,
        None => slots - 1,
    };
    let next = (position + delta).rem_euclid(slots) as usize;
    if next == ids.len() { 0 } else { ids[next] }
}

fn uniqueness_field_index(kind: FormKind, field: UniquenessField) -> Option<usize> {
    match (kind, field) {
        (FormKind::Contact, UniquenessField::Email) => Some(CONTACT_EMAIL),
        (FormKind::Contact, UniquenessField::Phone) => Some(CONTACT_PHONE),
        (FormKind::Company, UniquenessField::Document) => Some(COMPANY_DOCUMENT),
        _ => None,
    }
}

fn build_form_payload(form: &FormUiState) -> Result<FormPayload> {
    let payload = match form.kind {
        FormKind::Contact => FormPayload::Contact(ContactFormInput {
            id: form.record_id.map(ContactId::new),
            full_name: form.values[CONTACT_NAME].trim().to_owned(),
            email: form.values[CONTACT_EMAIL].trim().to_owned(),
            phone: digits_only(&form.values[CONTACT_PHONE]),
            company_id: CompanyId::new(form.picks[CONTACT_COMPANY]),
            sector_id: SectorId::new(form.picks[CONTACT_SECTOR]),
            role_id: RoleId::new(form.picks[CONTACT_ROLE]),
            password: form.values[CONTACT_PASSWORD].clone(),
            active: form.active,
        }),
        FormKind::Company => FormPayload::Company(Box::new(CompanyFormInput {
            id: form.record_id.map(CompanyId::new),
            person: form.person,
            legal_name: form.values[COMPANY_LEGAL_NAME].trim().to_owned(),
            trade_name: form.values[COMPANY_TRADE_NAME].trim().to_owned(),
            document: digits_only(&form.values[COMPANY_DOCUMENT]),
            state_registration: form.values[COMPANY_STATE_REG].trim().to_owned(),
            municipal_registration: form.values[COMPANY_MUNICIPAL_REG].trim().to_owned(),
            postal_code: digits_only(&form.values[COMPANY_POSTAL]),
            street: form.values[COMPANY_STREET].trim().to_owned(),
            district: form.values[COMPANY_DISTRICT].trim().to_owned(),
            city: form.values[COMPANY_CITY].trim().to_owned(),
            state: form.values[COMPANY_STATE].trim().to_owned(),
            active: form.active,
        })),
        FormKind::Sector => FormPayload::Sector(SectorFormInput {
            id: form.record_id.map(SectorId::new),
            name: form.values[0].trim().to_owned(),
            active: form.active,
        }),
        FormKind::Role => {
            let raw_index = form.values[ROLE_INDEX].trim();
            let position_index = if raw_index.is_empty() {
                None
            } else {
                Some(
                    raw_index
                        .parse::<i32>()
                        .context("role ordering index must be a number")?,
                )
            };
            FormPayload::Role(RoleFormInput {
                id: form.record_id.map(RoleId::new),
                name: form.values[0].trim().to_owned(),
                sector_id: SectorId::new(form.picks[ROLE_SECTOR]),
                position_index,
                active: form.active,
            })
        }
    };
    Ok(payload)
}

/// Gate order: synchronous validation, then the duplicate-check gate.
/// Pending and failed checks both block (fail closed); a flagged field
/// blocks until its value changes.
fn submit_active_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let (payload, blocked) = {
        let Some(form) = view_data.form.as_ref() else {
            return;
        };
        let payload = match build_form_payload(form) {
            Ok(payload) => payload,
            Err(error) => {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
                return;
            }
        };
        let blocked = if form.in_flight.is_some() {
            Some("duplicate check still running -- wait for it to finish")
        } else if form.check_failed {
            Some("duplicate check failed -- revisit the field to retry before saving")
        } else if form.duplicates.any() {
            Some("resolve duplicated fields before saving")
        } else {
            None
        };
        (payload, blocked)
    };

    if let Err(error) = payload.validate() {
        emit_status(state, view_data, internal_tx, format!("{error:#}"));
        return;
    }
    if let FormPayload::Contact(contact) = &payload
        && !role_matches_sector(&view_data.roles, contact.role_id, contact.sector_id)
    {
        emit_status(
            state,
            view_data,
            internal_tx,
            "the selected role does not belong to the selected sector",
        );
        return;
    }
    if let Some(message) = blocked {
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    match runtime.submit_form(&payload) {
        Ok(()) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            if let Err(error) = refresh_all(state, runtime, view_data) {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("saved, but reload failed: {error:#}"),
                );
            } else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("{} saved", payload.kind().label()),
                );
            }
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("save failed: {error:#}"));
        }
    }
}

fn refresh_all<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.summary = runtime.load_summary()?;
    view_data.companies = runtime.load_companies()?;
    view_data.sectors = runtime.load_sectors()?;
    view_data.roles = runtime.load_roles()?;
    refresh_tab(state, runtime, view_data)
}

/// Filter state is per page load: switching tabs rebuilds the controller
/// from a fresh snapshot with default filters.
fn refresh_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.selected_row = 0;
    view_data.selected_col = 0;
    view_data.columns = snapshot_columns(state.active_tab);

    if state.active_tab == TabKind::Dashboard {
        view_data.snapshot = None;
        view_data.table = None;
        return Ok(());
    }

    let snapshot = runtime.load_tab_snapshot(state.active_tab)?;
    match snapshot {
        Some(snapshot) => {
            let rows = build_rows(
                &snapshot,
                &view_data.companies,
                &view_data.sectors,
                &view_data.roles,
            );
            view_data.table = Some(TableController::new(
                rows,
                searchable_columns(state.active_tab),
                view_data.page_size,
            ));
            view_data.snapshot = Some(snapshot);
        }
        None => {
            view_data.snapshot = None;
            view_data.table = None;
        }
    }
    Ok(())
}

fn refresh_summary<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    if let Ok(summary) = runtime.load_summary() {
        view_data.summary = summary;
    }
}

fn snapshot_columns(tab: TabKind) -> &'static [&'static str] {
    match tab {
        TabKind::Dashboard => &[],
        TabKind::Contacts => &["name", "email", "phone", "company", "role", "created", "status"],
        TabKind::Companies => &[
            "legal name",
            "trade name",
            "kind",
            "document",
            "city",
            "created",
            "status",
        ],
        TabKind::Sectors => &["name", "status"],
        TabKind::Roles => &["name", "sector", "index", "status"],
    }
}

/// Contacts and companies search over the same fields their pages always
/// did (name and email, legal and trade name); the small catalogs match
/// against the whole row.
fn searchable_columns(tab: TabKind) -> Vec<usize> {
    match tab {
        TabKind::Dashboard => Vec::new(),
        TabKind::Contacts => vec![0, 1],
        TabKind::Companies => vec![0, 1],
        TabKind::Sectors => vec![0, 1],
        TabKind::Roles => vec![0, 1, 2, 3],
    }
}

fn build_rows(
    snapshot: &TabSnapshot,
    companies: &[Company],
    sectors: &[Sector],
    roles: &[JobRole],
) -> Vec<RowRecord> {
    match snapshot {
        TabSnapshot::Contacts(rows) => rows
            .iter()
            .map(|contact| {
                let company_name = companies
                    .iter()
                    .find(|company| company.id == contact.company_id)
                    .map(|company| company.trade_name.clone())
                    .unwrap_or_default();
                let role_name = roles
                    .iter()
                    .find(|role| role.id == contact.role_id)
                    .map(|role| role.name.clone())
                    .unwrap_or_default();
                RowRecord {
                    id: contact.id.get(),
                    cells: vec![
                        CellValue::Text(contact.full_name.clone()),
                        CellValue::Text(contact.email.clone()),
                        CellValue::Text(mask_phone(&contact.phone)),
                        CellValue::Text(company_name),
                        CellValue::Text(role_name),
                        CellValue::Date(contact.created_on),
                        CellValue::Status(contact.status),
                    ],
                    status: contact.status,
                }
            })
            .collect(),
        TabSnapshot::Companies(rows) => rows
            .iter()
            .map(|company| RowRecord {
                id: company.id.get(),
                cells: vec![
                    CellValue::Text(company.legal_name.clone()),
                    CellValue::Text(company.trade_name.clone()),
                    CellValue::Text(company.person.label().to_owned()),
                    CellValue::Text(mask_document(
                        &company.document,
                        company.person.document_kind(),
                    )),
                    CellValue::Text(company.city.clone()),
                    CellValue::Date(company.created_on),
                    CellValue::Status(company.status),
                ],
                status: company.status,
            })
            .collect(),
        TabSnapshot::Sectors(rows) => rows
            .iter()
            .map(|sector| RowRecord {
                id: sector.id.get(),
                cells: vec![
                    CellValue::Text(sector.name.clone()),
                    CellValue::Status(sector.status),
                ],
                status: sector.status,
            })
            .collect(),
        TabSnapshot::Roles(rows) => rows
            .iter()
            .map(|role| {
                let sector_name = sectors
                    .iter()
                    .find(|sector| sector.id == role.sector_id)
                    .map(|sector| sector.name.clone())
                    .unwrap_or_default();
                RowRecord {
                    id: role.id.get(),
                    cells: vec![
                        CellValue::Text(role.name.clone()),
                        CellValue::Text(sector_name),
                        CellValue::OptionalInteger(role.position_index.map(i64::from)),
                        CellValue::Status(role.status),
                    ],
                    status: role.status,
                }
            })
            .collect(),
    }
}

fn patch_snapshot_status(snapshot: &mut TabSnapshot, id: i64, status: RecordStatus) {
    match snapshot {
        TabSnapshot::Contacts(rows) => {
            if let Some(row) = rows.iter_mut().find(|row| row.id.get() == id) {
                row.status = status;
            }
        }
        TabSnapshot::Companies(rows) => {
            if let Some(row) = rows.iter_mut().find(|row| row.id.get() == id) {
                row.status = status;
            }
        }
        TabSnapshot::Sectors(rows) => {
            if let Some(row) = rows.iter_mut().find(|row| row.id.get() == id) {
                row.status = status;
            }
        }
        TabSnapshot::Roles(rows) => {
            if let Some(row) = rows.iter_mut().find(|row| row.id.get() == id) {
                row.status = status;
            }
        }
    }
}

fn remove_from_snapshot(snapshot: &mut TabSnapshot, id: i64) {
    match snapshot {
        TabSnapshot::Contacts(rows) => rows.retain(|row| row.id.get() != id),
        TabSnapshot::Companies(rows) => rows.retain(|row| row.id.get() != id),
        TabSnapshot::Sectors(rows) => rows.retain(|row| row.id.get() != id),
        TabSnapshot::Roles(rows) => rows.retain(|row| row.id.get() != id),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = TabKind::ALL
        .iter()
        .map(|tab| tab.label().to_owned())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title(header_title(state)).borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    if state.active_tab == TabKind::Dashboard {
        let body = Paragraph::new(render_dashboard_text(&view_data.summary))
            .block(Block::default().borders(Borders::ALL).title("dashboard"));
        frame.render_widget(body, layout[1]);
    } else {
        render_table(frame, layout[1], state, view_data);
    }

    let status = status_text(state, view_data);
    let status_widget = Paragraph::new(status)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(login) = &view_data.login {
        let area = centered_rect(56, 52, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(render_login_text(login))
            .block(Block::default().title("sign in").borders(Borders::ALL));
        frame.render_widget(body, area);
    }

    if let Some(form) = &view_data.form {
        let area = centered_rect(70, 72, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(render_form_text(form, view_data)).block(
            Block::default()
                .title(format!("{} form", form.kind.label()))
                .borders(Borders::ALL),
        );
        frame.render_widget(body, area);
    }

    if let Some(confirm) = &view_data.confirm {
        let area = centered_rect(52, 26, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(render_confirm_text(confirm)).block(
            Block::default()
                .title("confirm")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(body, area);
    }

    if let Some(prompt) = &view_data.import_prompt {
        let area = centered_rect(60, 22, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(render_import_text(prompt))
            .block(Block::default().title("import").borders(Borders::ALL));
        frame.render_widget(body, area);
    }

    if view_data.help_visible {
        let area = centered_rect(78, 68, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn header_title(state: &AppState) -> String {
    match &state.operator {
        Some(operator) => format!("cadastro -- {operator}"),
        None => "cadastro".to_owned(),
    }
}

fn render_dashboard_text(summary: &SummaryCounts) -> String {
    [
        format!(
            "contacts: {} active / {} inactive",
            summary.contacts_active, summary.contacts_inactive
        ),
        format!(
            "companies: {} active / {} inactive",
            summary.companies_active, summary.companies_inactive
        ),
        format!("sectors: {} active", summary.sectors_active),
        format!("roles: {} active", summary.roles_active),
        String::new(),
        "tab to browse records | ? help".to_owned(),
    ]
    .join("\n")
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let Some(table) = view_data.table.as_ref() else {
        let empty = Paragraph::new("no data loaded -- press r to reload").block(
            Block::default()
                .borders(Borders::ALL)
                .title(state.active_tab.label()),
        );
        frame.render_widget(empty, area);
        return;
    };

    let view = table.view();
    let title = table_title(state.active_tab, table, &view);

    if view.total_matched == 0 {
        let placeholder = Paragraph::new("no records match the current filters")
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(placeholder, area);
        return;
    }

    let columns = view_data.columns.len().max(1);
    let widths = vec![Constraint::Min(8); columns];

    let header_cells = view_data.columns.iter().enumerate().map(|(index, label)| {
        let mut text = (*label).to_owned();
        if let Some(sort) = table.filter().sort
            && sort.column == index
        {
            text.push(' ');
            text.push(match sort.direction {
                cadastro_app::SortDirection::Asc => '^',
                cadastro_app::SortDirection::Desc => 'v',
            });
        }
        let mut style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        if index == view_data.selected_col {
            style = style.fg(Color::Cyan);
        }
        Cell::from(text).style(style)
    });
    let header = Row::new(header_cells);

    let rows = view.visible.iter().enumerate().map(|(position, &row_index)| {
        let selected = position == view_data.selected_row;
        let record = table.row(row_index);
        let cells = (0..view_data.columns.len()).map(|column| {
            let text = record
                .and_then(|record| record.cells.get(column))
                .map(CellValue::display)
                .unwrap_or_default();
            let mut style = Style::default();
            if record.is_some_and(|record| !record.status.is_active()) {
                style = style.fg(Color::DarkGray);
            }
            if selected {
                style = style.bg(Color::DarkGray).fg(Color::White);
            }
            Cell::from(text).style(style)
        });
        Row::new(cells.collect::<Vec<_>>())
    });

    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn table_title(
    tab: TabKind,
    table: &TableController,
    view: &cadastro_app::PageView,
) -> String {
    let mut parts = vec![format!(
        "{} [{} of {}]",
        tab.label(),
        view.total_matched,
        table.rows().len()
    )];
    parts.push(format!("page {}/{}", view.page, view.total_pages.max(1)));
    let filter = table.filter();
    if !filter.query.is_empty() {
        parts.push(format!("search {:?}", filter.query));
    }
    if filter.status != cadastro_app::StatusFilter::All {
        parts.push(format!("status {}", filter.status.label()));
    }
    parts.join(" | ")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(message) = &state.status_line {
        return message.clone();
    }
    if view_data.login.is_some() {
        return "enter sign in | tab next field | space toggle remember | ctrl+r reveal".to_owned();
    }
    match state.mode {
        AppMode::Search => "type to filter | enter keep | esc clear".to_owned(),
        AppMode::Form(_) => {
            "up/down field | left/right choice | ctrl+s save | esc cancel".to_owned()
        }
        AppMode::Confirm => "y confirm | n cancel".to_owned(),
        AppMode::Nav => {
            let mut hints = vec!["/ search", "f filter", "s sort", "a add", "e edit", "t toggle"];
            if state.active_tab == TabKind::Contacts {
                hints.push("d delete");
            }
            if matches!(state.active_tab, TabKind::Contacts | TabKind::Companies) {
                hints.push("i import");
            }
            if let Some(pager) = pager_hint(view_data) {
                hints.push(pager);
            }
            hints.push("? help");
            hints.join(" | ")
        }
    }
}

/// Mirrors the pager buttons: each direction is offered only when it is
/// enabled for the current page.
fn pager_hint(view_data: &ViewData) -> Option<&'static str> {
    let view = view_data.table.as_ref()?.view();
    match (view.has_prev(), view.has_next()) {
        (true, true) => Some("p/n page"),
        (true, false) => Some("p prev page"),
        (false, true) => Some("n next page"),
        (false, false) => None,
    }
}

fn render_login_text(login: &LoginUiState) -> String {
    let mut lines = Vec::new();
    let cursor = |index: usize| if login.cursor == index { ">" } else { " " };

    lines.push(format!("{} email:    {}", cursor(0), login.input.email));
    if let Some(error) = &login.field_errors[0] {
        lines.push(format!("    ! {error}"));
    }

    let password = if login.show_password {
        login.input.password.clone()
    } else {
        "*".repeat(login.input.password.chars().count())
    };
    lines.push(format!("{} password: {password}", cursor(1)));
    if let Some(error) = &login.field_errors[1] {
        lines.push(format!("    ! {error}"));
    }
    if !login.input.password.is_empty() {
        let (level, met) = password_strength(&login.input.password);
        lines.push(format!("    strength: {} ({})", level.label(), met.join(", ")));
    }

    lines.push(format!(
        "{} remember email: [{}]",
        cursor(2),
        if login.input.remember { "x" } else { " " }
    ));

    if login.caps_lock {
        lines.push(String::new());
        lines.push("caps lock is on".to_owned());
    }
    if login.submitting {
        lines.push(String::new());
        lines.push("signing in...".to_owned());
    }
    lines.join("\n")
}

fn render_form_text(form: &FormUiState, view_data: &ViewData) -> String {
    let specs = form_field_specs(form.kind);
    let mut lines = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        let marker = if index == form.cursor { ">" } else { " " };
        let value = match spec.kind {
            FieldKind::Password => "*".repeat(form.values[index].chars().count()),
            FieldKind::PersonPick => form.person.label().to_owned(),
            FieldKind::CompanyPick => view_data
                .companies
                .iter()
                .find(|company| company.id.get() == form.picks[index])
                .map(|company| company.trade_name.clone())
                .unwrap_or_else(|| "(none)".to_owned()),
            FieldKind::SectorPick => view_data
                .sectors
                .iter()
                .find(|sector| sector.id.get() == form.picks[index])
                .map(|sector| sector.name.clone())
                .unwrap_or_else(|| "(none)".to_owned()),
            FieldKind::RolePick => view_data
                .roles
                .iter()
                .find(|role| role.id.get() == form.picks[index])
                .map(|role| role.name.clone())
                .unwrap_or_else(|| "(none)".to_owned()),
            FieldKind::ActiveToggle => if form.active { "active" } else { "inactive" }.to_owned(),
            FieldKind::Document if form.values[index].is_empty() => {
                form.person.document_kind().placeholder().to_owned()
            }
            _ => form.values[index].clone(),
        };
        lines.push(format!("{marker} {}: {value}", spec.label));
        if let Some(error) = &form.errors[index] {
            lines.push(format!("    ! {error}"));
        }
        if spec.kind == FieldKind::Password && !form.values[index].is_empty() {
            let (level, _) = password_strength(&form.values[index]);
            lines.push(format!("    strength: {}", level.label()));
        }
    }

    if form.in_flight.is_some() {
        lines.push(String::new());
        lines.push("checking duplicates...".to_owned());
    }
    lines.join("\n")
}

fn render_confirm_text(confirm: &ConfirmUiState) -> String {
    match &confirm.action {
        PendingAction::Toggle { name, current, .. } => {
            let verb = if current.is_active() { "Deactivate" } else { "Activate" };
            format!("{verb} {name:?}?\n\ny confirm | n cancel")
        }
        PendingAction::Delete { name, .. } => format!(
            "Delete {name:?}?\n\nThis cannot be undone.\n\ny confirm | n cancel"
        ),
    }
}

fn render_import_text(prompt: &ImportUiState) -> String {
    format!(
        "file path: {}\n\nenter upload | esc cancel\nthe whole listing reloads after a successful import",
        prompt.path
    )
}

fn help_overlay_text() -> String {
    "tab/shift-tab switch tab | j/k row | h/l column | g/G first/last row\n\
     / search (esc clears) | f status filter | s sort column | S clear sort\n\
     n/p next/prev page | a add | e edit | t toggle status | d delete (contacts)\n\
     i import (contacts/companies) | r reload | q quit\n\
     forms: up/down field | left/right choice | ctrl+s save | esc cancel"
        .to_owned()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::{
        CONTACT_EMAIL, CONTACT_PASSWORD, CONTACT_ROLE, CONTACT_SECTOR, COMPANY_DOCUMENT,
        COMPANY_LEGAL_NAME, COMPANY_PERSON, COMPANY_POSTAL, COMPANY_STREET, COMPANY_TRADE_NAME,
        AppRuntime, InternalEvent, LoginUiState, TabSnapshot, UniquenessEvent, UniquenessField,
        UniquenessInFlight, ViewData, build_form_payload, caps_lock_hint, handle_key_event,
        handle_uniqueness_event, move_form_cursor, pager_hint, process_internal_events,
        refresh_all, submit_active_form, submit_sign_in, table_title,
    };
    use anyhow::{Result, bail};
    use cadastro_app::{
        AppMode, AppState, CellValue, Company, CompanyId, Contact, ContactId, DuplicateFields,
        FormPayload, JobRole, PersonKind, PostalAddress, RecordStatus, RegistryCompany, RoleId,
        Sector, SectorId, SignInInput, SummaryCounts, TabKind, UniquenessQuery,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
    use std::path::Path;
    use std::sync::mpsc::{self, Receiver, Sender};

    #[derive(Debug, Default)]
    struct TestRuntime {
        contacts: Vec<Contact>,
        companies: Vec<Company>,
        sectors: Vec<Sector>,
        roles: Vec<JobRole>,
        remembered: Option<String>,
        sign_in_error: Option<String>,
        toggle_result: Option<RecordStatus>,
        duplicates: DuplicateFields,
        uniqueness_error: Option<String>,
        registry: Option<RegistryCompany>,
        postal: Option<PostalAddress>,
        import_message: Option<String>,
        submitted: Vec<FormPayload>,
        deleted: Vec<i64>,
        list_loads: usize,
    }

    impl AppRuntime for TestRuntime {
        fn load_summary(&mut self) -> Result<SummaryCounts> {
            Ok(SummaryCounts::default())
        }

        fn load_tab_snapshot(&mut self, tab: TabKind) -> Result<Option<TabSnapshot>> {
            self.list_loads += 1;
            Ok(match tab {
                TabKind::Dashboard => None,
                TabKind::Contacts => Some(TabSnapshot::Contacts(self.contacts.clone())),
                TabKind::Companies => Some(TabSnapshot::Companies(self.companies.clone())),
                TabKind::Sectors => Some(TabSnapshot::Sectors(self.sectors.clone())),
                TabKind::Roles => Some(TabSnapshot::Roles(self.roles.clone())),
            })
        }

        fn load_companies(&mut self) -> Result<Vec<Company>> {
            Ok(self.companies.clone())
        }

        fn load_sectors(&mut self) -> Result<Vec<Sector>> {
            Ok(self.sectors.clone())
        }

        fn load_roles(&mut self) -> Result<Vec<JobRole>> {
            Ok(self.roles.clone())
        }

        fn remembered_email(&mut self) -> Option<String> {
            self.remembered.clone()
        }

        fn sign_in(&mut self, input: &SignInInput) -> Result<String> {
            if let Some(error) = &self.sign_in_error {
                bail!("{error}");
            }
            Ok(input.email.split('@').next().unwrap_or("operator").to_owned())
        }

        fn submit_form(&mut self, payload: &FormPayload) -> Result<()> {
            self.submitted.push(payload.clone());
            Ok(())
        }

        fn toggle_status(
            &mut self,
            _tab: TabKind,
            _id: i64,
            _desired: bool,
        ) -> Result<RecordStatus> {
            match self.toggle_result {
                Some(status) => Ok(status),
                None => bail!("backend unavailable"),
            }
        }

        fn delete_record(&mut self, _tab: TabKind, id: i64) -> Result<()> {
            self.deleted.push(id);
            Ok(())
        }

        fn check_uniqueness(&mut self, _query: &UniquenessQuery) -> Result<DuplicateFields> {
            if let Some(error) = &self.uniqueness_error {
                bail!("{error}");
            }
            Ok(self.duplicates)
        }

        fn company_registry_lookup(&mut self, _document: &str) -> Result<Option<RegistryCompany>> {
            Ok(self.registry.clone())
        }

        fn postal_lookup(&mut self, _code: &str) -> Result<Option<PostalAddress>> {
            Ok(self.postal.clone())
        }

        fn import_records(&mut self, _path: &Path) -> Result<String> {
            match &self.import_message {
                Some(message) => Ok(message.clone()),
                None => bail!("import endpoint offline"),
            }
        }
    }

    fn sample_sector(id: i64, name: &str) -> Sector {
        Sector {
            id: SectorId::new(id),
            name: name.to_owned(),
            status: RecordStatus::Active,
        }
    }

    fn sample_role(id: i64, sector_id: i64, name: &str) -> JobRole {
        JobRole {
            id: RoleId::new(id),
            name: name.to_owned(),
            sector_id: SectorId::new(sector_id),
            position_index: Some(id as i32),
            status: RecordStatus::Active,
        }
    }

    fn sample_company(id: i64, trade_name: &str) -> Company {
        Company {
            id: CompanyId::new(id),
            legal_name: format!("{trade_name} Ltda"),
            trade_name: trade_name.to_owned(),
            person: PersonKind::Legal,
            document: format!("{id:014}"),
            state_registration: String::new(),
            municipal_registration: String::new(),
            postal_code: String::new(),
            street: String::new(),
            district: String::new(),
            city: "Sao Paulo".to_owned(),
            state: "SP".to_owned(),
            status: RecordStatus::Active,
            created_on: None,
        }
    }

    fn sample_contact(id: i64, name: &str) -> Contact {
        Contact {
            id: ContactId::new(id),
            full_name: name.to_owned(),
            email: format!("contact{id}@example.com"),
            phone: "11987654321".to_owned(),
            company_id: CompanyId::new(1),
            sector_id: SectorId::new(1),
            role_id: RoleId::new(1),
            status: if id % 2 == 0 {
                RecordStatus::Inactive
            } else {
                RecordStatus::Active
            },
            created_on: None,
        }
    }

    fn runtime_with_contacts(count: i64) -> TestRuntime {
        TestRuntime {
            contacts: (1..=count)
                .map(|id| sample_contact(id, &format!("Contact {id:02}")))
                .collect(),
            companies: vec![sample_company(1, "Acme"), sample_company(2, "Vertice")],
            sectors: vec![sample_sector(1, "Comercial"), sample_sector(2, "Tecnologia")],
            roles: vec![
                sample_role(1, 1, "Analista"),
                sample_role(2, 1, "Gerente"),
                sample_role(3, 2, "Desenvolvedor"),
            ],
            toggle_result: Some(RecordStatus::Inactive),
            ..TestRuntime::default()
        }
    }

    fn channel() -> (Sender<InternalEvent>, Receiver<InternalEvent>) {
        mpsc::channel()
    }

    fn ready(
        runtime: &mut TestRuntime,
        tab: TabKind,
    ) -> (AppState, ViewData) {
        let mut state = AppState {
            active_tab: tab,
            operator: Some("ana".to_owned()),
            ..AppState::default()
        };
        let mut view_data = ViewData::new(10);
        refresh_all(&mut state, runtime, &mut view_data).expect("fixture data loads");
        (state, view_data)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn contact_rows_join_company_and_role_names() {
        let mut runtime = runtime_with_contacts(3);
        let (_state, view_data) = ready(&mut runtime, TabKind::Contacts);

        let table = view_data.table.as_ref().expect("table built");
        let row = table.row(0).expect("first row");
        assert_eq!(row.cells[3], CellValue::Text("Acme".to_owned()));
        assert_eq!(row.cells[4], CellValue::Text("Analista".to_owned()));
        assert_eq!(row.cells[2], CellValue::Text("(11) 98765-4321".to_owned()));
    }

    #[test]
    fn fixture_snapshot_builds_rows_for_every_contact() {
        let data = cadastro_testkit::demo_data(42);
        let mut runtime = TestRuntime {
            contacts: data.contacts.clone(),
            companies: data.companies.clone(),
            sectors: data.sectors.clone(),
            roles: data.roles.clone(),
            ..TestRuntime::default()
        };
        let (_state, view_data) = ready(&mut runtime, TabKind::Contacts);

        let table = view_data.table.as_ref().expect("table built");
        assert_eq!(table.rows().len(), data.contacts.len());
        for (row, contact) in table.rows().iter().zip(&data.contacts) {
            assert_eq!(row.id, contact.id.get());
            assert_eq!(row.status, contact.status);
            let company = data
                .companies
                .iter()
                .find(|company| company.id == contact.company_id)
                .expect("fixture contacts reference known companies");
            assert_eq!(row.cells[3], CellValue::Text(company.trade_name.clone()));
        }
    }

    #[test]
    fn search_typing_filters_and_resets_page() {
        let mut runtime = runtime_with_contacts(25);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('n')));
        assert_eq!(view_data.table.as_ref().expect("table").view().page, 2);

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('/')));
        assert_eq!(state.mode, AppMode::Search);
        for ch in "contact 07".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }

        let table = view_data.table.as_ref().expect("table");
        assert_eq!(table.filter().query, "contact 07");
        let view = table.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.total_matched, 1);
    }

    #[test]
    fn escape_clears_search_and_returns_to_nav() {
        let mut runtime = runtime_with_contacts(5);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('/')));
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('z')));
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));

        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(view_data.table.as_ref().expect("table").filter().query, "");
    }

    #[test]
    fn toggle_success_patches_only_target_row() {
        let mut runtime = runtime_with_contacts(6);
        runtime.toggle_result = Some(RecordStatus::Inactive);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('t')));
        assert_eq!(state.mode, AppMode::Confirm);
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('y')));

        let table = view_data.table.as_ref().expect("table");
        let patched = table.row(0).expect("row");
        assert_eq!(patched.status, RecordStatus::Inactive);
        assert_eq!(patched.cells[6], CellValue::Status(RecordStatus::Inactive));
        let untouched = table.row(2).expect("row");
        assert_eq!(untouched.status, RecordStatus::Active);
        assert_eq!(table.filter().query, "");
        assert_eq!(table.filter().page, 1);

        if let Some(TabSnapshot::Contacts(rows)) = &view_data.snapshot {
            assert_eq!(rows[0].status, RecordStatus::Inactive);
        } else {
            panic!("contacts snapshot expected");
        }
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("deactivated"))
        );
    }

    #[test]
    fn toggle_failure_leaves_rows_untouched() {
        let mut runtime = runtime_with_contacts(4);
        runtime.toggle_result = None;
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('t')));
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('y')));

        let table = view_data.table.as_ref().expect("table");
        assert_eq!(table.row(0).expect("row").status, RecordStatus::Active);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("toggle failed"))
        );
    }

    #[test]
    fn delete_removes_contact_after_confirmation() {
        let mut runtime = runtime_with_contacts(4);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('d')));
        assert_eq!(state.mode, AppMode::Confirm);
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('y')));

        assert_eq!(runtime.deleted, vec![1]);
        assert_eq!(view_data.table.as_ref().expect("table").rows().len(), 3);
    }

    #[test]
    fn sort_keeps_page_and_filter_resets_it() {
        let mut runtime = runtime_with_contacts(25);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('n')));
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('s')));
        assert_eq!(view_data.table.as_ref().expect("table").view().page, 2);

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('f')));
        let table = view_data.table.as_ref().expect("table");
        assert_eq!(table.filter().page, 1);
        assert_eq!(table.filter().status, cadastro_app::StatusFilter::Active);
    }

    #[test]
    fn stale_uniqueness_response_is_discarded() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        let form = view_data.form.as_mut().expect("form open");
        form.in_flight = Some(UniquenessInFlight {
            request_id: 2,
            field: UniquenessField::Email,
        });

        handle_uniqueness_event(
            &mut state,
            &mut view_data,
            &tx,
            UniquenessEvent::Completed {
                request_id: 1,
                field: UniquenessField::Email,
                duplicates: DuplicateFields {
                    email: true,
                    ..DuplicateFields::default()
                },
            },
        );
        let form = view_data.form.as_ref().expect("form");
        assert!(!form.duplicates.email);
        assert!(form.in_flight.is_some());

        handle_uniqueness_event(
            &mut state,
            &mut view_data,
            &tx,
            UniquenessEvent::Completed {
                request_id: 2,
                field: UniquenessField::Email,
                duplicates: DuplicateFields {
                    email: true,
                    ..DuplicateFields::default()
                },
            },
        );
        let form = view_data.form.as_ref().expect("form");
        assert!(form.duplicates.email);
        assert!(form.in_flight.is_none());
        assert!(form.errors[CONTACT_EMAIL].is_some());
    }

    fn fill_valid_contact_form(view_data: &mut ViewData) {
        let form = view_data.form.as_mut().expect("form open");
        form.values[0] = "Ana Souza".to_owned();
        form.values[CONTACT_EMAIL] = "ana@example.com".to_owned();
        form.picks[3] = 1;
        form.picks[CONTACT_SECTOR] = 1;
        form.picks[CONTACT_ROLE] = 1;
        form.values[CONTACT_PASSWORD] = "secret1".to_owned();
    }

    #[test]
    fn submit_blocked_by_duplicates_pending_and_failed_checks() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        fill_valid_contact_form(&mut view_data);

        view_data.form.as_mut().expect("form").duplicates.email = true;
        submit_active_form(&mut state, &mut runtime, &mut view_data, &tx);
        assert!(runtime.submitted.is_empty());
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("duplicated"))
        );

        let form = view_data.form.as_mut().expect("form");
        form.duplicates.email = false;
        form.in_flight = Some(UniquenessInFlight {
            request_id: 9,
            field: UniquenessField::Email,
        });
        submit_active_form(&mut state, &mut runtime, &mut view_data, &tx);
        assert!(runtime.submitted.is_empty());

        let form = view_data.form.as_mut().expect("form");
        form.in_flight = None;
        form.check_failed = true;
        submit_active_form(&mut state, &mut runtime, &mut view_data, &tx);
        assert!(runtime.submitted.is_empty());
    }

    #[test]
    fn submit_sends_payload_when_clean() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        fill_valid_contact_form(&mut view_data);
        submit_active_form(&mut state, &mut runtime, &mut view_data, &tx);

        assert_eq!(runtime.submitted.len(), 1);
        assert!(view_data.form.is_none());
        assert_eq!(state.mode, AppMode::Nav);
        if let FormPayload::Contact(contact) = &runtime.submitted[0] {
            assert_eq!(contact.full_name, "Ana Souza");
            assert_eq!(contact.role_id.get(), 1);
        } else {
            panic!("contact payload expected");
        }
    }

    #[test]
    fn submit_rejects_role_outside_selected_sector() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        fill_valid_contact_form(&mut view_data);
        view_data.form.as_mut().expect("form").picks[CONTACT_ROLE] = 3;
        submit_active_form(&mut state, &mut runtime, &mut view_data, &tx);

        assert!(runtime.submitted.is_empty());
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("does not belong"))
        );
    }

    #[test]
    fn field_exit_runs_duplicate_check_through_channel() {
        let mut runtime = runtime_with_contacts(2);
        runtime.duplicates = DuplicateFields {
            email: true,
            ..DuplicateFields::default()
        };
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        {
            let form = view_data.form.as_mut().expect("form");
            form.cursor = CONTACT_EMAIL;
            form.values[CONTACT_EMAIL] = "ana@example.com".to_owned();
        }
        move_form_cursor(&mut state, &mut runtime, &mut view_data, &tx, 1);
        process_internal_events(&mut state, &mut view_data, &tx, &rx);

        let form = view_data.form.as_ref().expect("form");
        assert!(form.duplicates.email);
        assert!(form.errors[CONTACT_EMAIL].is_some());
    }

    #[test]
    fn failed_duplicate_check_blocks_until_field_changes() {
        let mut runtime = runtime_with_contacts(2);
        runtime.uniqueness_error = Some("index offline".to_owned());
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        {
            let form = view_data.form.as_mut().expect("form");
            form.cursor = CONTACT_EMAIL;
            form.values[CONTACT_EMAIL] = "ana@example.com".to_owned();
        }
        move_form_cursor(&mut state, &mut runtime, &mut view_data, &tx, 1);
        process_internal_events(&mut state, &mut view_data, &tx, &rx);
        assert!(view_data.form.as_ref().expect("form").check_failed);

        // editing the checked field clears the latch
        {
            let form = view_data.form.as_mut().expect("form");
            form.cursor = CONTACT_EMAIL;
        }
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('x')));
        assert!(!view_data.form.as_ref().expect("form").check_failed);
    }

    #[test]
    fn login_preloads_remembered_email_and_validates() {
        let mut runtime = runtime_with_contacts(2);
        runtime.remembered = Some("ana@example.com".to_owned());
        let mut state = AppState::default();
        let mut view_data = ViewData::new(10);
        view_data.login = Some(LoginUiState::new(runtime.remembered_email()));
        let (tx, _rx) = channel();

        let login = view_data.login.as_ref().expect("login");
        assert_eq!(login.input.email, "ana@example.com");
        assert!(login.input.remember);

        submit_sign_in(&mut state, &mut runtime, &mut view_data, &tx);
        let login = view_data.login.as_ref().expect("login still open");
        assert!(login.field_errors[1].is_some());
        assert!(state.operator.is_none());

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Tab));
        for ch in "secret1".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }
        submit_sign_in(&mut state, &mut runtime, &mut view_data, &tx);

        assert!(view_data.login.is_none());
        assert_eq!(state.operator.as_deref(), Some("ana"));
    }

    #[test]
    fn failed_sign_in_keeps_login_open() {
        let mut runtime = runtime_with_contacts(2);
        runtime.sign_in_error = Some("invalid credentials".to_owned());
        let mut state = AppState::default();
        let mut view_data = ViewData::new(10);
        view_data.login = Some(LoginUiState::new(None));
        let (tx, _rx) = channel();

        let login = view_data.login.as_mut().expect("login");
        login.input.email = "ana@example.com".to_owned();
        login.input.password = "secret1".to_owned();
        submit_sign_in(&mut state, &mut runtime, &mut view_data, &tx);

        assert!(view_data.login.is_some());
        assert!(!view_data.login.as_ref().expect("login").submitting);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("invalid credentials"))
        );
    }

    #[test]
    fn caps_lock_tracks_protocol_state_and_heuristic() {
        let protocol = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Press,
            KeyEventState::CAPS_LOCK,
        );
        assert!(caps_lock_hint(&protocol, false));

        let upper_no_shift = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::NONE);
        assert!(caps_lock_hint(&upper_no_shift, false));

        let lower_no_shift = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(!caps_lock_hint(&lower_no_shift, true));

        let other = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert!(caps_lock_hint(&other, true));
    }

    #[test]
    fn document_mask_applied_while_typing() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Companies);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        view_data.form.as_mut().expect("form").cursor = COMPANY_DOCUMENT;
        for ch in "123456789".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }

        let form = view_data.form.as_ref().expect("form");
        assert_eq!(form.values[COMPANY_DOCUMENT], "12.345.678/9");
    }

    #[test]
    fn person_kind_switch_clears_document() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Companies);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        {
            let form = view_data.form.as_mut().expect("form");
            form.values[COMPANY_DOCUMENT] = "12.345".to_owned();
            form.cursor = COMPANY_PERSON;
        }
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Right));

        let form = view_data.form.as_ref().expect("form");
        assert_eq!(form.person, PersonKind::Natural);
        assert!(form.values[COMPANY_DOCUMENT].is_empty());
    }

    #[test]
    fn role_choice_requires_sector_and_respects_it() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        view_data.form.as_mut().expect("form").cursor = CONTACT_ROLE;
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Right));
        assert_eq!(view_data.form.as_ref().expect("form").picks[CONTACT_ROLE], 0);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("choose a sector"))
        );

        view_data.form.as_mut().expect("form").picks[CONTACT_SECTOR] = 1;
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Right));
        let picked = view_data.form.as_ref().expect("form").picks[CONTACT_ROLE];
        assert!(picked == 1 || picked == 2, "role {picked} must be in sector 1");
    }

    #[test]
    fn registry_prefill_fills_only_empty_fields() {
        let mut runtime = runtime_with_contacts(2);
        runtime.registry = Some(RegistryCompany {
            legal_name: "Acme Comunicacao Ltda".to_owned(),
            trade_name: "Acme".to_owned(),
            state_registration: "110.042.490.114".to_owned(),
            municipal_registration: "8214600".to_owned(),
        });
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Companies);
        let (tx, rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        {
            let form = view_data.form.as_mut().expect("form");
            form.values[COMPANY_LEGAL_NAME] = "Keep Me Ltda".to_owned();
            form.cursor = COMPANY_DOCUMENT;
        }
        for ch in "12345678901234".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }
        move_form_cursor(&mut state, &mut runtime, &mut view_data, &tx, 1);
        process_internal_events(&mut state, &mut view_data, &tx, &rx);

        let form = view_data.form.as_ref().expect("form");
        assert_eq!(form.values[COMPANY_LEGAL_NAME], "Keep Me Ltda");
        assert_eq!(form.values[COMPANY_TRADE_NAME], "Acme");
    }

    #[test]
    fn postal_prefill_fills_address_fields() {
        let mut runtime = runtime_with_contacts(2);
        runtime.postal = Some(PostalAddress {
            street: "Avenida Paulista".to_owned(),
            district: "Bela Vista".to_owned(),
            city: "Sao Paulo".to_owned(),
            state: "SP".to_owned(),
        });
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Companies);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        view_data.form.as_mut().expect("form").cursor = COMPANY_POSTAL;
        for ch in "01310100".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }
        move_form_cursor(&mut state, &mut runtime, &mut view_data, &tx, 1);

        let form = view_data.form.as_ref().expect("form");
        assert_eq!(form.values[COMPANY_POSTAL], "01310-100");
        assert_eq!(form.values[COMPANY_STREET], "Avenida Paulista");
    }

    #[test]
    fn import_success_reloads_everything() {
        let mut runtime = runtime_with_contacts(2);
        runtime.import_message = Some("12 records imported".to_owned());
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();
        let loads_before = runtime.list_loads;

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('i')));
        assert!(view_data.import_prompt.is_some());
        for ch in "/tmp/contatos.csv".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));

        assert!(view_data.import_prompt.is_none());
        assert!(runtime.list_loads > loads_before);
        assert_eq!(state.status_line.as_deref(), Some("12 records imported"));
    }

    #[test]
    fn import_failure_keeps_prompt_open() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('i')));
        for ch in "/tmp/x.csv".chars() {
            handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char(ch)));
        }
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Enter));

        assert!(view_data.import_prompt.is_some());
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("import failed"))
        );
    }

    #[test]
    fn pager_hint_reflects_page_bounds() {
        let mut runtime = runtime_with_contacts(25);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();
        assert_eq!(pager_hint(&view_data), Some("n next page"));

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('n')));
        assert_eq!(pager_hint(&view_data), Some("p/n page"));

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('n')));
        assert_eq!(pager_hint(&view_data), Some("p prev page"));

        let mut small = runtime_with_contacts(4);
        let (_state, small_view) = ready(&mut small, TabKind::Contacts);
        assert_eq!(pager_hint(&small_view), None);
    }

    #[test]
    fn table_title_reports_counts_query_and_page() {
        let mut runtime = runtime_with_contacts(25);
        let (_state, mut view_data) = ready(&mut runtime, TabKind::Contacts);

        let table = view_data.table.as_mut().expect("table");
        table.set_query("zzz");
        let view = table.view();
        let title = table_title(TabKind::Contacts, table, &view);
        assert!(title.contains("[0 of 25]"));
        assert!(title.contains("search \"zzz\""));
    }

    #[test]
    fn status_clear_respects_token() {
        let mut state = AppState::default();
        let mut view_data = ViewData::new(10);
        let (tx, rx) = channel();

        state.dispatch(cadastro_app::AppCommand::SetStatus("saved".to_owned()));
        view_data.status_token = 3;

        tx.send(InternalEvent::ClearStatus { token: 2 }).expect("send");
        process_internal_events(&mut state, &mut view_data, &tx, &rx);
        assert_eq!(state.status_line.as_deref(), Some("saved"));

        tx.send(InternalEvent::ClearStatus { token: 3 }).expect("send");
        process_internal_events(&mut state, &mut view_data, &tx, &rx);
        assert_eq!(state.status_line, None);
    }

    #[test]
    fn edit_form_prefills_masked_values() {
        let mut runtime = runtime_with_contacts(3);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('e')));
        let form = view_data.form.as_ref().expect("form open");
        assert_eq!(form.record_id, Some(1));
        assert_eq!(form.values[0], "Contact 01");
        assert_eq!(form.values[2], "(11) 98765-4321");

        let payload = build_form_payload(form).expect("payload builds");
        if let FormPayload::Contact(contact) = payload {
            assert_eq!(contact.id.map(|id| id.get()), Some(1));
            assert_eq!(contact.phone, "11987654321");
        } else {
            panic!("contact payload expected");
        }
    }

    #[test]
    fn submit_with_ctrl_s_uses_form_gate() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('a')));
        fill_valid_contact_form(&mut view_data);
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, ctrl('s'));

        assert_eq!(runtime.submitted.len(), 1);
    }

    #[test]
    fn help_overlay_opens_and_closes() {
        let mut runtime = runtime_with_contacts(2);
        let (mut state, mut view_data) = ready(&mut runtime, TabKind::Contacts);
        let (tx, _rx) = channel();

        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Char('?')));
        assert!(view_data.help_visible);
        handle_key_event(&mut state, &mut runtime, &mut view_data, &tx, key(KeyCode::Esc));
        assert!(!view_data.help_visible);
    }
}
