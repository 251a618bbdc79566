//! Keybinding registry: maps keys to actions per context, with config overrides.
//!
//! Text-entry contexts (`Compose`, `Login`) only fall back to global bindings
//! for keys that cannot be typed, so `q` in a title is a letter, not Quit.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    Back,
    ShowHelp,
    CycleTheme,
    Logout,
    // Feed
    NavDown,
    NavUp,
    Select,
    NextPage,
    PrevPage,
    FilterAll,
    FilterMine,
    ComposePost,
    Retry,
    // Reader
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    ExitReader,
    // Forms
    SubmitForm,
    CancelForm,
    SwitchField,
    ToggleLoginMethod,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::Back => "Go back / dismiss",
            Self::ShowHelp => "Show help",
            Self::CycleTheme => "Toggle dark/light theme",
            Self::Logout => "Sign out",
            Self::NavDown => "Next post",
            Self::NavUp => "Previous post",
            Self::Select => "Open post",
            Self::NextPage => "Next page",
            Self::PrevPage => "Previous page",
            Self::FilterAll => "Show all posts",
            Self::FilterMine => "Show my posts (this page)",
            Self::ComposePost => "Write a post",
            Self::Retry => "Reload",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::ExitReader => "Back to feed",
            Self::SubmitForm => "Submit",
            Self::CancelForm => "Cancel",
            Self::SwitchField => "Next field",
            Self::ToggleLoginMethod => "Switch password / email code",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Feed,
    Reader,
    Compose,
    Login,
}

impl Context {
    /// Contexts where printable keys are text input.
    pub fn accepts_text(self) -> bool {
        matches!(self, Context::Compose | Context::Login)
    }
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// A character typed without Ctrl/Alt.
    fn is_printable(&self) -> bool {
        matches!(self.code, KeyCode::Char(_))
            && !self
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Left", "Right", "Backspace"
/// - Modifier combos: "Ctrl+d", "Ctrl+s"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then(|| KeySpec::ctrl(c));
    }

    match s.to_lowercase().as_str() {
        "enter" | "return" => return Some(KeySpec::plain(KeyCode::Enter)),
        "esc" | "escape" => return Some(KeySpec::plain(KeyCode::Esc)),
        "tab" => return Some(KeySpec::plain(KeyCode::Tab)),
        "up" => return Some(KeySpec::plain(KeyCode::Up)),
        "down" => return Some(KeySpec::plain(KeyCode::Down)),
        "left" => return Some(KeySpec::plain(KeyCode::Left)),
        "right" => return Some(KeySpec::plain(KeyCode::Right)),
        "backspace" => return Some(KeySpec::plain(KeyCode::Backspace)),
        "space" => return Some(KeySpec::plain(KeyCode::Char(' '))),
        _ => {}
    }

    if let Some(n) = s.strip_prefix(['F', 'f']).and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Some(KeySpec::plain(KeyCode::F(n)));
        }
        return None;
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then(|| KeySpec::plain(KeyCode::Char(c)))
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; lookups
/// try the active context first, then Global.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings in registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn register_defaults(&mut self) {
        use Context::*;
        use KeyCode::*;

        // === Global ===
        self.bind(Global, KeySpec::plain(Char('q')), Action::Quit);
        self.bind(Global, KeySpec::ctrl('c'), Action::Quit);
        self.bind(Global, KeySpec::plain(Esc), Action::Back);
        self.bind(Global, KeySpec::plain(Char('?')), Action::ShowHelp);
        self.bind(Global, KeySpec::plain(Char('T')), Action::CycleTheme);
        self.bind(Global, KeySpec::plain(Char('L')), Action::Logout);

        // === Feed ===
        self.bind(Feed, KeySpec::plain(Char('j')), Action::NavDown);
        self.bind(Feed, KeySpec::plain(Down), Action::NavDown);
        self.bind(Feed, KeySpec::plain(Char('k')), Action::NavUp);
        self.bind(Feed, KeySpec::plain(Up), Action::NavUp);
        self.bind(Feed, KeySpec::plain(Enter), Action::Select);
        self.bind(Feed, KeySpec::plain(Char('n')), Action::NextPage);
        self.bind(Feed, KeySpec::plain(Right), Action::NextPage);
        self.bind(Feed, KeySpec::plain(Char('p')), Action::PrevPage);
        self.bind(Feed, KeySpec::plain(Left), Action::PrevPage);
        self.bind(Feed, KeySpec::plain(Char('a')), Action::FilterAll);
        self.bind(Feed, KeySpec::plain(Char('m')), Action::FilterMine);
        self.bind(Feed, KeySpec::plain(Char('c')), Action::ComposePost);
        self.bind(Feed, KeySpec::plain(Char('r')), Action::Retry);

        // === Reader ===
        self.bind(Reader, KeySpec::plain(Char('j')), Action::ScrollDown);
        self.bind(Reader, KeySpec::plain(Down), Action::ScrollDown);
        self.bind(Reader, KeySpec::plain(Char('k')), Action::ScrollUp);
        self.bind(Reader, KeySpec::plain(Up), Action::ScrollUp);
        self.bind(Reader, KeySpec::ctrl('d'), Action::PageDown);
        self.bind(Reader, KeySpec::ctrl('u'), Action::PageUp);
        self.bind(Reader, KeySpec::plain(Char('b')), Action::ExitReader);
        self.bind(Reader, KeySpec::plain(Esc), Action::ExitReader);
        self.bind(Reader, KeySpec::plain(Char('r')), Action::Retry);

        // === Compose ===
        self.bind(Compose, KeySpec::ctrl('s'), Action::SubmitForm);
        self.bind(Compose, KeySpec::plain(Tab), Action::SwitchField);
        self.bind(Compose, KeySpec::plain(Esc), Action::CancelForm);

        // === Login ===
        self.bind(Login, KeySpec::plain(Enter), Action::SubmitForm);
        self.bind(Login, KeySpec::plain(Tab), Action::SwitchField);
        self.bind(Login, KeySpec::ctrl('t'), Action::ToggleLoginMethod);
    }

    /// Apply user overrides from the config `keybindings` map.
    ///
    /// Keys in the map are action names (e.g., "quit", "compose_post").
    /// Values are key strings (e.g., "q", "Ctrl+s", "F5"). The new key
    /// replaces the action's old keys in every context the action was bound.
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        // Deterministic order for duplicate-key conflicts.
        let mut entries: Vec<_> = overrides.iter().collect();
        entries.sort();

        for (action_name, key_str) in entries {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = Vec::new();
            for (ctx, _, a) in &self.bindings {
                if *a == action && !contexts.contains(ctx) {
                    contexts.push(*ctx);
                }
            }

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                if ctx.accepts_text() && key.is_printable() {
                    warnings.push(format!(
                        "Key '{}' for action '{}' would block typing, ignoring in that form",
                        key_str, action_name
                    ));
                    continue;
                }
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a key in a context.
    ///
    /// Tries the specific context first, then falls back to Global. In
    /// text-entry contexts printable keys never fall back.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        // Shift is implied by the character itself.
        let modifiers = if matches!(code, KeyCode::Char(_)) {
            modifiers - KeyModifiers::SHIFT
        } else {
            modifiers
        };
        let key = KeySpec::new(code, modifiers);

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context == Context::Global || (context.accepts_text() && key.is_printable()) {
            return None;
        }

        self.lookup.get(&(Context::Global, key)).copied()
    }

    /// Get all bindings for the help screen.
    ///
    /// Returns (context, key_display_string, action, description) tuples.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action enum.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "back" => Some(Action::Back),
        "show_help" | "help" => Some(Action::ShowHelp),
        "cycle_theme" | "toggle_theme" | "theme" => Some(Action::CycleTheme),
        "logout" | "sign_out" => Some(Action::Logout),
        "nav_down" | "down" => Some(Action::NavDown),
        "nav_up" | "up" => Some(Action::NavUp),
        "select" | "open" => Some(Action::Select),
        "next_page" => Some(Action::NextPage),
        "prev_page" | "previous_page" => Some(Action::PrevPage),
        "filter_all" | "all_posts" => Some(Action::FilterAll),
        "filter_mine" | "my_posts" => Some(Action::FilterMine),
        "compose_post" | "compose" | "new_post" => Some(Action::ComposePost),
        "retry" | "reload" | "refresh" => Some(Action::Retry),
        "scroll_down" => Some(Action::ScrollDown),
        "scroll_up" => Some(Action::ScrollUp),
        "page_down" => Some(Action::PageDown),
        "page_up" => Some(Action::PageUp),
        "exit_reader" => Some(Action::ExitReader),
        "submit_form" | "submit" => Some(Action::SubmitForm),
        "cancel_form" | "cancel" => Some(Action::CancelForm),
        "switch_field" => Some(Action::SwitchField),
        "toggle_login_method" => Some(Action::ToggleLoginMethod),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
