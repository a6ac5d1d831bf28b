use crate::api::TodoBackend;
use crate::error::{ClientError, Result};
use crate::forms::{LoginForm, RegisterForm, TodoDraft};
use crate::identity::{
    Credential, CredentialHandle, GoogleSignIn, ProviderConfig, ScriptLoader, SignInStatus,
};
use crate::models::{AuthResponse, Todo};
use crate::notify::Notifications;
use crate::session::Session;
use crate::todos::{Filter, TodoList};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Loading,
    SignIn,
    Dashboard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthTab {
    Login,
    Register,
    Google,
}

impl AuthTab {
    pub const ALL: [AuthTab; 3] = [AuthTab::Login, AuthTab::Register, AuthTab::Google];

    pub fn label(self) -> &'static str {
        match self {
            AuthTab::Login => "Login",
            AuthTab::Register => "Register",
            AuthTab::Google => "Google",
        }
    }

    fn field_count(self) -> usize {
        match self {
            AuthTab::Login => 2,
            AuthTab::Register => 3,
            AuthTab::Google => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    Insert,
    Confirm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Editor {
    Create,
    Edit(u64),
}

/// Result of a request that ran off the UI loop.
#[derive(Debug)]
pub enum Outcome {
    Authenticated(Result<AuthResponse>),
    GoogleAuthenticated(Result<AuthResponse>),
    Fetched(Result<Vec<Todo>>),
    Created(Result<Todo>),
    Updated { id: u64, result: Result<Todo> },
    Deleted { id: u64, result: Result<()> },
    Credential(Credential),
    SignInLoaded {
        status: SignInStatus,
        handle: Option<CredentialHandle>,
    },
}

impl Outcome {
    // Provider events are not tied to a session.
    fn is_session_bound(&self) -> bool {
        !matches!(self, Outcome::Credential(_) | Outcome::SignInLoaded { .. })
    }
}

// Outcomes carry the session epoch they were started in; anything from a
// previous session is dropped.
#[derive(Debug)]
pub struct Tagged {
    epoch: u64,
    outcome: Outcome,
}

pub struct App {
    pub session: Session,
    pub todos: TodoList,
    backend: Arc<dyn TodoBackend>,
    pub notifications: Notifications,
    pub state: ListState,
    pub screen: Screen,
    pub auth_tab: AuthTab,
    pub input_mode: InputMode,
    pub active_field: usize,
    pub login_form: LoginForm,
    pub register_form: RegisterForm,
    pub credential_input: String,
    pub provider_status: SignInStatus,
    credentials: Option<CredentialHandle>,
    pub authenticating: bool,
    pub draft: TodoDraft,
    pub editor: Editor,
    pub confirm_delete: Option<u64>,
    epoch: u64,
    tx: UnboundedSender<Tagged>,
    rx: UnboundedReceiver<Tagged>,
}

impl App {
    pub fn new(session: Session, backend: Arc<dyn TodoBackend>) -> App {
        let (tx, rx) = mpsc::unbounded_channel();
        App {
            session,
            todos: TodoList::new(),
            backend,
            notifications: Notifications::default(),
            state: ListState::default(),
            screen: Screen::Loading,
            auth_tab: AuthTab::Login,
            input_mode: InputMode::Normal,
            active_field: 0,
            login_form: LoginForm::default(),
            register_form: RegisterForm::default(),
            credential_input: String::new(),
            provider_status: SignInStatus::NotConfigured,
            credentials: None,
            authenticating: false,
            draft: TodoDraft::default(),
            editor: Editor::Create,
            confirm_delete: None,
            epoch: 0,
            tx,
            rx,
        }
    }

    /// Loads the sign-in provider in the background. The Google tab shows
    /// a loading notice until it resolves.
    pub fn load_sign_in<L>(&mut self, mut sign_in: GoogleSignIn<L>, config: ProviderConfig)
    where
        L: ScriptLoader + 'static,
    {
        if config.usable_client_id().is_none() {
            self.provider_status = SignInStatus::NotConfigured;
            return;
        }
        self.provider_status = SignInStatus::Idle;
        self.spawn(async move {
            let handle = sign_in.initialize(&config).await.ok();
            Outcome::SignInLoaded {
                status: sign_in.status().clone(),
                handle,
            }
        });
    }

    /// Wires the provider handle so delivered credentials come back through
    /// the outcome channel.
    fn attach_sign_in(&mut self, status: SignInStatus, handle: Option<CredentialHandle>) {
        self.provider_status = status;
        self.credentials = handle.map(|mut handle| {
            let tx = self.tx.clone();
            let epoch = self.epoch;
            handle.on_credential(move |credential| {
                let _ = tx.send(Tagged {
                    epoch,
                    outcome: Outcome::Credential(credential),
                });
            });
            handle
        });
    }

    /// Restores the persisted session, then shows the matching screen.
    pub async fn start(&mut self) {
        self.session.restore(self.backend.as_ref()).await;
        if self.session.is_signed_in() {
            self.enter_dashboard();
        } else {
            self.screen = Screen::SignIn;
        }
    }

    fn spawn<F>(&self, request: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let outcome = request.await;
            let _ = tx.send(Tagged { epoch, outcome });
        });
    }

    fn token(&self) -> Option<String> {
        self.session.token().map(str::to_string)
    }

    fn enter_dashboard(&mut self) {
        self.screen = Screen::Dashboard;
        self.input_mode = InputMode::Normal;
        self.todos = TodoList::new();
        self.state.select(None);
        self.refresh();
    }

    pub fn refresh(&mut self) {
        let Some(token) = self.token() else {
            return;
        };
        self.todos.begin_fetch();
        let backend = self.backend.clone();
        self.spawn(async move { Outcome::Fetched(backend.list_todos(&token).await) });
    }

    pub fn logout(&mut self) {
        self.end_session();
        self.notifications.success("Signed out");
    }

    // The backend rejected the token mid-session.
    fn expire_session(&mut self, error: &ClientError) {
        warn!(error = %error, "Token rejected, signing out");
        self.end_session();
        self.notifications
            .error("Your session has expired. Please sign in again");
    }

    fn end_session(&mut self) {
        self.session.logout();
        self.authenticating = false;
        self.epoch += 1;
        self.todos = TodoList::new();
        self.state.select(None);
        self.draft.clear();
        self.confirm_delete = None;
        self.login_form = LoginForm::default();
        self.register_form = RegisterForm::default();
        self.screen = Screen::SignIn;
        self.input_mode = InputMode::Normal;
        self.active_field = 0;
    }

    pub fn selected_todo(&self) -> Option<&Todo> {
        let visible = self.todos.visible();
        self.state.selected().and_then(|i| visible.get(i).copied())
    }

    fn clamp_selection(&mut self) {
        let len = self.todos.visible().len();
        let selected = match (len, self.state.selected()) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.state.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.todos.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.todos.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.todos.set_filter(filter);
        self.state.select(None);
        self.clamp_selection();
    }

    fn report(&mut self, error: &ClientError) {
        warn!(error = %error, "Action failed");
        self.notifications.error(error.user_message());
    }

    // Failure of a request made with the session token.
    fn reject(&mut self, error: &ClientError) {
        if matches!(error, ClientError::Unauthorized(_)) {
            self.expire_session(error);
        } else {
            self.report(error);
        }
    }

    /// Applies finished requests. Called once per loop iteration and
    /// never waits on the network.
    pub fn drain_outcomes(&mut self) {
        while let Ok(tagged) = self.rx.try_recv() {
            if tagged.epoch != self.epoch && tagged.outcome.is_session_bound() {
                debug!(outcome = ?tagged.outcome, "Dropping outcome from an ended session");
                continue;
            }
            self.apply(tagged.outcome);
        }
        self.notifications.prune(Instant::now());
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Authenticated(result) => self.finish_sign_in(result, "Signed in"),
            Outcome::GoogleAuthenticated(result) => {
                if result.is_ok() {
                    self.credential_input.clear();
                }
                self.finish_sign_in(result, "Successfully signed in with Google!");
            }
            Outcome::Credential(credential) => {
                if self.authenticating {
                    self.report(&ClientError::Busy);
                    return;
                }
                self.authenticating = true;
                let backend = self.backend.clone();
                self.spawn(async move {
                    Outcome::GoogleAuthenticated(backend.google_auth(&credential.0).await)
                });
            }
            Outcome::SignInLoaded { status, handle } => self.attach_sign_in(status, handle),
            Outcome::Fetched(result) => {
                if let Err(e) = self.todos.finish_fetch(result) {
                    if matches!(e, ClientError::Unauthorized(_)) {
                        self.expire_session(&e);
                    } else {
                        warn!(error = %e, "Fetching todos failed");
                        self.notifications.error("Failed to fetch todos");
                    }
                }
                self.clamp_selection();
            }
            Outcome::Created(result) => match self.todos.finish_create(result) {
                Ok(()) => {
                    self.notifications.success("Todo created successfully!");
                    let shown = self
                        .todos
                        .todos()
                        .first()
                        .is_some_and(|todo| self.todos.filter().matches(todo));
                    if shown {
                        self.state.select(Some(0));
                    }
                    self.clamp_selection();
                }
                Err(e) => self.reject(&e),
            },
            Outcome::Updated { id, result } => match self.todos.finish_update(id, result) {
                Ok(()) => {
                    self.notifications.success("Todo updated successfully!");
                    self.clamp_selection();
                }
                Err(e) => self.reject(&e),
            },
            Outcome::Deleted { id, result } => match self.todos.finish_delete(id, result) {
                Ok(()) => {
                    self.notifications.success("Todo deleted successfully!");
                    self.clamp_selection();
                }
                Err(e) => self.reject(&e),
            },
        }
    }

    fn finish_sign_in(&mut self, result: Result<AuthResponse>, fallback: &str) {
        self.authenticating = false;
        match result {
            Ok(auth) => {
                self.session.login(auth.access_token, auth.user);
                self.notifications
                    .success(auth.message.unwrap_or_else(|| fallback.to_string()));
                self.enter_dashboard();
            }
            Err(e) => self.report(&e),
        }
    }

    fn focused_buffer(&mut self) -> Option<&mut String> {
        match self.screen {
            Screen::SignIn => match (self.auth_tab, self.active_field) {
                (AuthTab::Login, 0) => Some(&mut self.login_form.email),
                (AuthTab::Login, _) => Some(&mut self.login_form.password),
                (AuthTab::Register, 0) => Some(&mut self.register_form.name),
                (AuthTab::Register, 1) => Some(&mut self.register_form.email),
                (AuthTab::Register, _) => Some(&mut self.register_form.password),
                (AuthTab::Google, _) => Some(&mut self.credential_input),
            },
            Screen::Dashboard => match self.active_field {
                0 => Some(&mut self.draft.title),
                _ => Some(&mut self.draft.description),
            },
            Screen::Loading => None,
        }
    }

    fn field_count(&self) -> usize {
        match self.screen {
            Screen::SignIn => self.auth_tab.field_count(),
            _ => 2,
        }
    }

    fn submit_sign_in(&mut self) {
        if self.authenticating {
            self.report(&ClientError::Busy);
            return;
        }
        match self.auth_tab {
            AuthTab::Login => match self.login_form.validate() {
                Ok((email, password)) => {
                    self.authenticating = true;
                    let backend = self.backend.clone();
                    self.spawn(async move {
                        Outcome::Authenticated(backend.login(&email, &password).await)
                    });
                }
                Err(e) => self.report(&e),
            },
            AuthTab::Register => match self.register_form.validate() {
                Ok((email, password, name)) => {
                    self.authenticating = true;
                    let backend = self.backend.clone();
                    self.spawn(async move {
                        Outcome::Authenticated(backend.register(&email, &password, &name).await)
                    });
                }
                Err(e) => self.report(&e),
            },
            AuthTab::Google => {
                let delivered = match self.credentials.as_mut() {
                    Some(handle) => handle.deliver(&self.credential_input),
                    None => {
                        self.notifications.error("Google OAuth not configured");
                        return;
                    }
                };
                if !delivered {
                    self.notifications.error("Paste a Google credential first");
                }
            }
        }
    }

    fn submit_editor(&mut self) {
        let Some(token) = self.token() else {
            self.report(&ClientError::SignedOut);
            return;
        };
        let backend = self.backend.clone();
        match self.editor {
            Editor::Create => match self.todos.begin_create(&self.draft) {
                Ok(new) => {
                    self.spawn(async move {
                        Outcome::Created(backend.create_todo(&token, &new).await)
                    });
                }
                Err(e) => {
                    self.report(&e);
                    return;
                }
            },
            Editor::Edit(id) => match self.todos.begin_edit(id, &self.draft) {
                Ok(Some(changes)) => {
                    self.spawn(async move {
                        let result = backend.update_todo(&token, id, &changes).await;
                        Outcome::Updated { id, result }
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    self.report(&e);
                    return;
                }
            },
        }
        self.draft.clear();
        self.input_mode = InputMode::Normal;
    }

    fn toggle_selected(&mut self) {
        let (Some(id), Some(token)) = (self.selected_todo().map(|t| t.id), self.token()) else {
            return;
        };
        match self.todos.begin_toggle(id) {
            Ok(changes) => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    let result = backend.update_todo(&token, id, &changes).await;
                    Outcome::Updated { id, result }
                });
            }
            Err(e) => self.report(&e),
        }
    }

    fn answer_delete(&mut self, confirmed: bool) {
        self.input_mode = InputMode::Normal;
        let (Some(id), Some(token)) = (self.confirm_delete.take(), self.token()) else {
            return;
        };
        match self.todos.begin_delete(id, |_| confirmed) {
            Ok(true) => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    let result = backend.delete_todo(&token, id).await;
                    Outcome::Deleted { id, result }
                });
            }
            Ok(false) => {}
            Err(e) => self.report(&e),
        }
    }

    fn open_editor(&mut self, editor: Editor) {
        self.draft = match editor {
            Editor::Create => TodoDraft::default(),
            Editor::Edit(id) => match self.todos.get(id) {
                Some(todo) => TodoDraft::from_todo(todo),
                None => return,
            },
        };
        self.editor = editor;
        self.active_field = 0;
        self.input_mode = InputMode::Editing;
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_input(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.input_mode {
            InputMode::Insert => {
                match key.code {
                    KeyCode::Esc => {
                        self.input_mode = match self.screen {
                            Screen::Dashboard => InputMode::Editing,
                            _ => InputMode::Normal,
                        }
                    }
                    KeyCode::Tab => self.active_field = (self.active_field + 1) % self.field_count(),
                    KeyCode::Enter if self.screen == Screen::SignIn => {
                        self.input_mode = InputMode::Normal;
                        self.submit_sign_in();
                    }
                    KeyCode::Char(c) => {
                        if let Some(buffer) = self.focused_buffer() {
                            buffer.push(c);
                        }
                    }
                    KeyCode::Backspace => {
                        if let Some(buffer) = self.focused_buffer() {
                            buffer.pop();
                        }
                    }
                    _ => {}
                }
                false
            }
            InputMode::Editing => {
                match key.code {
                    KeyCode::Char('i') => self.input_mode = InputMode::Insert,
                    KeyCode::Tab => self.active_field = (self.active_field + 1) % 2,
                    KeyCode::Enter => self.submit_editor(),
                    KeyCode::Esc => {
                        self.draft.clear();
                        self.input_mode = InputMode::Normal;
                    }
                    _ => {}
                }
                false
            }
            InputMode::Confirm => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_delete(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.answer_delete(false)
                    }
                    _ => {}
                }
                false
            }
            InputMode::Normal => match self.screen {
                Screen::Loading => key.code == KeyCode::Char('q'),
                Screen::SignIn => self.handle_sign_in_key(key.code),
                Screen::Dashboard => self.handle_dashboard_key(key.code),
            },
        }
    }

    fn handle_sign_in_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.switch_tab(AuthTab::Login),
            KeyCode::Char('2') => self.switch_tab(AuthTab::Register),
            KeyCode::Char('3') => self.switch_tab(AuthTab::Google),
            KeyCode::Tab => self.active_field = (self.active_field + 1) % self.field_count(),
            KeyCode::Char('i') => {
                if self.auth_tab != AuthTab::Google || self.credentials.is_some() {
                    self.input_mode = InputMode::Insert;
                }
            }
            KeyCode::Enter => self.submit_sign_in(),
            _ => {}
        }
        false
    }

    fn switch_tab(&mut self, tab: AuthTab) {
        self.auth_tab = tab;
        self.active_field = 0;
    }

    fn handle_dashboard_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => self.next(),
            KeyCode::Char('k') | KeyCode::Up => self.previous(),
            KeyCode::Char('a') => {
                if self.todos.is_creating() {
                    self.report(&ClientError::Busy);
                } else {
                    self.open_editor(Editor::Create);
                }
            }
            KeyCode::Char('e') => {
                if let Some(todo) = self.selected_todo() {
                    let id = todo.id;
                    if self.todos.is_pending(id) {
                        self.report(&ClientError::Busy);
                    } else {
                        self.open_editor(Editor::Edit(id));
                    }
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_selected(),
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_todo().map(|t| t.id) {
                    self.confirm_delete = Some(id);
                    self.input_mode = InputMode::Confirm;
                }
            }
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Active),
            KeyCode::Char('3') => self.set_filter(Filter::Completed),
            KeyCode::Char('f') => self.set_filter(self.todos.filter().next()),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('L') => self.logout(),
            _ => {}
        }
        false
    }
}
