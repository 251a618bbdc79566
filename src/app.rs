use crate::backend::{
    AuthGrant, BackendError, MutationService, Post, QueryService, Session, SessionHub,
};
use crate::feed::{ComposeFlow, FeedController, FetchRequest, SessionOutcome};
use crate::keybindings::{Context, KeybindingRegistry};
use crate::preferences::PreferenceManager;
use crate::storage::Database;
use crate::theme::{StyleMap, ThemeVariant};
use ratatui::style::Style;
use ratatui::text::Line;
use secrecy::SecretString;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::time::Instant;
use unicode_width::UnicodeWidthStr;
use uuid::Uuid;

/// Maximum scroll offset for the reader view (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// Lines the reader spends on title, byline and the blank separator.
pub const READER_HEADER_LINES: usize = 3;

// ============================================================================
// View Enums
// ============================================================================

/// Current view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Stored session is being checked (and refreshed) at startup.
    Connecting,
    Login,
    Feed,
    Post,
}

// ============================================================================
// Reader State
// ============================================================================

/// Loading state of the single-post reader.
#[derive(Debug, Clone)]
pub enum ReaderState {
    Idle,
    Loading {
        post_id: Uuid,
    },
    Loaded {
        post: Box<Post>,
        /// Markdown rendered once on arrival.
        rendered_lines: Vec<Line<'static>>,
    },
    NotFound,
    Failed {
        post_id: Uuid,
        error: String,
    },
}

// ============================================================================
// Login Form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMethod {
    #[default]
    Password,
    /// One-time code mailed by the auth service.
    EmailCode,
}

impl LoginMethod {
    pub fn label(self) -> &'static str {
        match self {
            LoginMethod::Password => "Email & Password",
            LoginMethod::EmailCode => "Email Code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    /// Password or one-time code, depending on the method.
    Secret,
}

/// What a login submit asks the backend to do.
#[derive(Debug)]
pub enum LoginRequest {
    SendCode { email: String },
    SignIn(AuthGrant),
}

/// Sign-in form state. The password is wiped as soon as it is handed off.
#[derive(Default)]
pub struct LoginForm {
    pub method: LoginMethod,
    pub focus: LoginField,
    pub email: String,
    pub password: String,
    pub code: String,
    /// A code was mailed for `email`; the code field is active.
    pub code_sent: bool,
    pub submitting: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl LoginForm {
    pub fn toggle_method(&mut self) {
        if self.submitting {
            return;
        }
        self.method = match self.method {
            LoginMethod::Password => LoginMethod::EmailCode,
            LoginMethod::EmailCode => LoginMethod::Password,
        };
        self.password.clear();
        self.code.clear();
        self.code_sent = false;
        self.focus = LoginField::Email;
        self.error = None;
        self.notice = None;
    }

    /// Whether the second field is shown for the current method.
    pub fn has_secret_field(&self) -> bool {
        self.method == LoginMethod::Password || self.code_sent
    }

    pub fn switch_field(&mut self) {
        if !self.has_secret_field() {
            self.focus = LoginField::Email;
            return;
        }
        self.focus = match self.focus {
            LoginField::Email => LoginField::Secret,
            LoginField::Secret => LoginField::Email,
        };
    }

    fn field_mut(&mut self) -> &mut String {
        match (self.focus, self.method) {
            (LoginField::Email, _) => &mut self.email,
            (LoginField::Secret, LoginMethod::Password) => &mut self.password,
            (LoginField::Secret, LoginMethod::EmailCode) => &mut self.code,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if self.submitting || c.is_control() {
            return;
        }
        // A new address invalidates a code sent to the old one.
        if self.focus == LoginField::Email && self.code_sent {
            self.code_sent = false;
            self.code.clear();
            self.notice = None;
        }
        self.field_mut().push(c);
        self.error = None;
    }

    pub fn backspace(&mut self) {
        if self.submitting {
            return;
        }
        if self.focus == LoginField::Email && self.code_sent {
            self.code_sent = false;
            self.code.clear();
            self.notice = None;
        }
        self.field_mut().pop();
        self.error = None;
    }

    /// Validate locally and produce the request to run. Sets `error` and
    /// returns `None` when the form is incomplete or already submitting.
    pub fn submit(&mut self) -> Option<LoginRequest> {
        if self.submitting {
            return None;
        }
        let email = self.email.trim().to_string();
        if email.is_empty() {
            self.error = Some("Email is required".to_string());
            self.focus = LoginField::Email;
            return None;
        }
        if !email.contains('@') {
            self.error = Some("Enter a valid email address".to_string());
            self.focus = LoginField::Email;
            return None;
        }

        let request = match self.method {
            LoginMethod::Password => {
                if self.password.is_empty() {
                    self.error = Some("Password is required".to_string());
                    self.focus = LoginField::Secret;
                    return None;
                }
                LoginRequest::SignIn(AuthGrant::Password {
                    email,
                    password: SecretString::from(std::mem::take(&mut self.password)),
                })
            }
            LoginMethod::EmailCode if !self.code_sent => LoginRequest::SendCode { email },
            LoginMethod::EmailCode => {
                let code = self.code.trim().to_string();
                if code.is_empty() {
                    self.error = Some("Enter the code from your email".to_string());
                    self.focus = LoginField::Secret;
                    return None;
                }
                LoginRequest::SignIn(AuthGrant::EmailCode { email, code })
            }
        };

        self.error = None;
        self.submitting = true;
        Some(request)
    }

    pub fn on_code_sent(&mut self, result: Result<(), String>) {
        self.submitting = false;
        match result {
            Ok(()) => {
                self.code_sent = true;
                self.focus = LoginField::Secret;
                self.notice = Some("Check your email for the sign-in code".to_string());
            }
            Err(e) => self.error = Some(e),
        }
    }

    pub fn sign_in_failed(&mut self, error: String) {
        self.submitting = false;
        self.error = Some(error);
        if self.method == LoginMethod::Password {
            self.focus = LoginField::Secret;
        }
    }

    pub fn reset(&mut self) {
        let method = self.method;
        *self = Self {
            method,
            ..Self::default()
        };
    }
}

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks
pub enum AppEvent {
    /// The session provider published a new identity (or signed out).
    SessionChanged(Option<Session>),
    /// Startup session check failed; treated as signed out.
    SessionUnavailable(String),
    PostsLoaded {
        generation: u64,
        result: Result<Vec<Post>, BackendError>,
    },
    PostLoaded {
        generation: u64,
        result: Result<Option<Post>, BackendError>,
    },
    PostPublished(Result<Post, BackendError>),
    /// The session itself arrives through `SessionChanged`.
    SignInCompleted(Result<(), BackendError>),
    EmailCodeSent(Result<(), BackendError>),
    SignedOut(Result<(), BackendError>),
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "feed_fetch", "publish")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub db: Database,
    pub sessions: Arc<SessionHub>,
    pub queries: Arc<dyn QueryService>,
    pub mutations: Arc<dyn MutationService>,
    pub preferences: PreferenceManager,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,

    pub keybindings: KeybindingRegistry,

    // UI State
    pub view: View,
    pub feed: FeedController,
    pub compose: ComposeFlow,
    pub login: LoginForm,
    /// Index into the derived (filtered) post list.
    pub selected_post: usize,

    // Reader
    pub reader: ReaderState,
    pub scroll_offset: usize,
    /// Visible reader lines from the last render, borders excluded.
    pub reader_visible_lines: usize,
    /// Reader width from the last render, borders excluded.
    pub reader_viewport_width: usize,
    /// (viewport_width, wrapped body lines) for the loaded post.
    pub reader_cached_line_count: Option<(usize, usize)>,

    // Background tasks
    pub feed_fetch_handle: Option<tokio::task::JoinHandle<()>>,
    /// Generation counter for post loads; late completions for an earlier
    /// post are dropped.
    pub post_load_generation: u64,
    pub post_load_handle: Option<tokio::task::JoinHandle<()>>,

    /// Status message with expiry. Cow avoids allocation for static literals.
    pub status_message: Option<(Cow<'static, str>, Instant)>,

    /// Dirty flag to skip unnecessary frame renders
    pub needs_redraw: bool,
    /// Current frame of the loading spinner animation.
    pub spinner_frame: usize,

    pub show_help: bool,
    pub help_scroll_offset: usize,
}

impl App {
    /// Build the app. `page` is the already-coerced starting page.
    pub fn new(
        db: Database,
        sessions: Arc<SessionHub>,
        backend: Arc<crate::backend::BackendClient>,
        preferences: PreferenceManager,
        page: u32,
    ) -> Self {
        let theme_variant = preferences.theme_variant();

        let mut keybindings = KeybindingRegistry::new();
        for warning in keybindings.apply_overrides(&preferences.keybinding_overrides()) {
            tracing::warn!(warning = %warning, "Keybinding override skipped");
        }

        let feed = FeedController::new(page, preferences.optimistic_insert());

        Self {
            db,
            sessions,
            queries: backend.clone(),
            mutations: backend,
            preferences,
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            keybindings,
            view: View::Connecting,
            feed,
            compose: ComposeFlow::new(),
            login: LoginForm::default(),
            selected_post: 0,
            reader: ReaderState::Idle,
            scroll_offset: 0,
            reader_visible_lines: 0,
            reader_viewport_width: 0,
            reader_cached_line_count: None,
            feed_fetch_handle: None,
            post_load_generation: 0,
            post_load_handle: None,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            show_help: false,
            help_scroll_offset: 0,
        }
    }

    /// Resolve a semantic role name to its `Style`.
    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = StyleMap::from_palette(&variant.palette());
        self.needs_redraw = true;
    }

    /// Cycle to the next theme variant (Dark → Light → Dark).
    pub fn cycle_theme(&mut self) -> ThemeVariant {
        let next = self.theme_variant.next();
        self.set_theme(next);
        next
    }

    /// Keybinding context for the surface that currently takes input.
    pub fn input_context(&self) -> Context {
        if self.compose.is_open() {
            return Context::Compose;
        }
        match self.view {
            View::Connecting => Context::Global,
            View::Login => Context::Login,
            View::Feed => Context::Feed,
            View::Post => Context::Reader,
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Route a session change through the feed controller and switch views.
    ///
    /// Returns the fetch to run, if any. A refreshed token for the user
    /// already shown updates the controller in place without refetching.
    pub fn apply_session(&mut self, session: Option<Session>) -> Option<FetchRequest> {
        if let Some(s) = &session {
            if self.feed.session().is_some() && self.feed.replace_tokens(s.clone()) {
                tracing::debug!(user_id = %s.user_id, "Session tokens refreshed");
                return None;
            }
        }

        match self.feed.on_session_change(session) {
            SessionOutcome::RedirectToLogin => {
                self.abort_background_loads();
                self.compose = ComposeFlow::new();
                self.reader = ReaderState::Idle;
                self.scroll_offset = 0;
                self.selected_post = 0;
                self.login.reset();
                self.view = View::Login;
                None
            }
            SessionOutcome::Fetch(req) => {
                if matches!(self.view, View::Connecting | View::Login) {
                    self.view = View::Feed;
                }
                self.login.reset();
                self.selected_post = 0;
                Some(req)
            }
        }
    }

    fn abort_background_loads(&mut self) {
        if let Some(handle) = self.feed_fetch_handle.take() {
            handle.abort();
            tracing::debug!("Aborted feed fetch task");
        }
        if let Some(handle) = self.post_load_handle.take() {
            handle.abort();
            tracing::debug!("Aborted post load task");
        }
    }

    // ========================================================================
    // Feed Navigation
    // ========================================================================

    /// Posts currently shown, after the filter.
    pub fn visible_posts(&self) -> Vec<&Post> {
        self.feed.derive_posts()
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.visible_posts().get(self.selected_post).copied()
    }

    pub fn clamp_selection(&mut self) {
        let len = self.visible_posts().len();
        self.selected_post = if len == 0 {
            0
        } else {
            self.selected_post.min(len - 1)
        };
    }

    pub fn nav_up(&mut self) {
        self.selected_post = self.selected_post.saturating_sub(1);
    }

    pub fn nav_down(&mut self) {
        let len = self.visible_posts().len();
        if len > 0 {
            self.selected_post = self.selected_post.saturating_add(1).min(len - 1);
        }
    }

    // ========================================================================
    // Reader
    // ========================================================================

    /// Switch to the reader for `post_id` and return the generation the
    /// load must report back with.
    pub fn enter_reader(&mut self, post_id: Uuid) -> u64 {
        self.view = View::Post;
        self.scroll_offset = 0;
        self.reader = ReaderState::Loading { post_id };
        self.reader_cached_line_count = None;
        self.post_load_generation = self.post_load_generation.wrapping_add(1);
        self.post_load_generation
    }

    /// Back to the feed. The feed is not refetched.
    pub fn exit_reader(&mut self) {
        if let Some(handle) = self.post_load_handle.take() {
            handle.abort();
            tracing::debug!("Aborted post load task on reader exit");
        }
        // Late completions for the closed post must not land.
        self.post_load_generation = self.post_load_generation.wrapping_add(1);
        self.view = View::Feed;
        self.reader = ReaderState::Idle;
        self.scroll_offset = 0;
        self.reader_cached_line_count = None;
    }

    /// Id of the post the reader is showing or loading.
    pub fn reader_post_id(&self) -> Option<Uuid> {
        match &self.reader {
            ReaderState::Loading { post_id } | ReaderState::Failed { post_id, .. } => {
                Some(*post_id)
            }
            ReaderState::Loaded { post, .. } => Some(post.id),
            ReaderState::Idle | ReaderState::NotFound => None,
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    /// Clamp scroll offset so the last page of content stays in view.
    pub fn clamp_scroll(&mut self, content_lines: usize, visible_lines: usize) {
        let max_scroll = content_lines.saturating_sub(visible_lines);
        self.scroll_offset = self.scroll_offset.min(max_scroll).min(MAX_SCROLL);
    }

    fn wrapped_line_count(line: &Line<'_>, viewport_width: usize) -> usize {
        let width = viewport_width.max(1);
        let line_width: usize = line.spans.iter().map(|s| s.content.width()).sum();
        if line_width == 0 {
            1
        } else {
            line_width.div_ceil(width)
        }
    }

    fn body_line_count(&self, width: usize) -> usize {
        match &self.reader {
            ReaderState::Loaded { rendered_lines, .. } => rendered_lines
                .iter()
                .map(|line| Self::wrapped_line_count(line, width))
                .sum(),
            ReaderState::Failed { .. } => 2,
            ReaderState::Idle | ReaderState::Loading { .. } | ReaderState::NotFound => 1,
        }
    }

    /// Display lines in the reader after wrapping, header included.
    pub fn reader_content_lines(&self) -> usize {
        let width = self.reader_viewport_width.max(1);
        if let Some((cached_width, cached_count)) = self.reader_cached_line_count {
            if cached_width == width {
                return READER_HEADER_LINES + cached_count;
            }
        }
        READER_HEADER_LINES + self.body_line_count(width)
    }

    /// Clamp scroll against the last rendered viewport, caching the wrapped
    /// line count so repeated scrolling stays cheap.
    pub fn clamp_reader_scroll(&mut self) {
        let width = self.reader_viewport_width.max(1);
        if !matches!(self.reader_cached_line_count, Some((w, _)) if w == width) {
            self.reader_cached_line_count = Some((width, self.body_line_count(width)));
        }
        let content_lines = self.reader_content_lines();
        self.clamp_scroll(content_lines, self.reader_visible_lines);
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds).
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

// ============================================================================
// Resource Cleanup
// ============================================================================

/// Abort in-flight loads so no task outlives the event loop.
impl Drop for App {
    fn drop(&mut self) {
        self.abort_background_loads();
    }
}
