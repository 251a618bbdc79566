//! Input handling for the TUI.
//!
//! This module processes keyboard input and dispatches to the appropriate
//! handler based on current view and overlay. Text-entry surfaces (login,
//! compose) receive printable keys as text; everything else goes through the
//! keybinding registry.

use crate::app::{App, AppEvent, ReaderState, View};
use crate::feed::{FeedFilter, SubmitRejected};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::preferences::THEME_KEY;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{open_post, spawn_feed_fetch, spawn_login, spawn_publish, spawn_sign_out};
use super::reader::render_markdown;
use super::Action;

/// Main input dispatch function.
///
/// Routes input to the appropriate handler based on current mode and view.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // Handle help overlay input first (captures all keys when visible)
    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    // The compose modal captures all keys while open
    if app.compose.is_open() {
        return Ok(handle_compose_input(app, code, modifiers, event_tx));
    }

    match app.view {
        View::Connecting => handle_connecting_input(app, code, modifiers, event_tx).await,
        View::Login => handle_login_input(app, code, modifiers, event_tx).await,
        View::Feed => handle_feed_input(app, code, modifiers, event_tx).await,
        View::Post => handle_reader_input(app, code, modifiers, event_tx).await,
    }
}

/// Handle input while the help overlay is visible.
///
/// Captures all keys: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// A key that should be typed into a text field.
fn typed_char(code: KeyCode, modifiers: KeyModifiers) -> Option<char> {
    match code {
        KeyCode::Char(c) if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            Some(c)
        }
        _ => None,
    }
}

/// Actions available from every view. Returns `None` for actions that are
/// not global so the caller can ignore them.
async fn handle_global_action(
    app: &mut App,
    action: KbAction,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Option<Action> {
    match action {
        KbAction::Quit => Some(Action::Quit),
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
            Some(Action::Continue)
        }
        KbAction::CycleTheme => {
            cycle_theme(app).await;
            Some(Action::Continue)
        }
        KbAction::Logout => {
            if app.feed.session().is_some() {
                app.set_status("Signing out...");
                spawn_sign_out(app, event_tx);
            }
            Some(Action::Continue)
        }
        _ => None,
    }
}

/// Switch theme, re-style the open post and persist the choice.
async fn cycle_theme(app: &mut App) {
    let variant = app.cycle_theme();

    // Cached reader lines carry the old palette.
    if let ReaderState::Loaded {
        post,
        rendered_lines,
    } = &mut app.reader
    {
        *rendered_lines = render_markdown(&post.content, &app.theme);
    }

    match app.preferences.set(&app.db, THEME_KEY, variant.key()).await {
        Ok(()) => app.set_status(format!("Theme: {}", variant.name())),
        Err(e) => {
            tracing::warn!(error = %e, theme = variant.key(), "Failed to save theme preference");
            app.set_status(format!("Theme: {} (not saved)", variant.name()));
        }
    }
}

// ============================================================================
// Connecting / Login
// ============================================================================

async fn handle_connecting_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    match app.keybindings.action_for_key(code, modifiers, KbContext::Global) {
        Some(KbAction::Back) => Ok(Action::Quit),
        Some(action) => Ok(handle_global_action(app, action, event_tx)
            .await
            .unwrap_or(Action::Continue)),
        None => Ok(Action::Continue),
    }
}

async fn handle_login_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    match app.keybindings.action_for_key(code, modifiers, KbContext::Login) {
        Some(KbAction::SubmitForm) => {
            if let Some(request) = app.login.submit() {
                spawn_login(app, request, event_tx);
            }
        }
        Some(KbAction::SwitchField) => app.login.switch_field(),
        Some(KbAction::ToggleLoginMethod) => app.login.toggle_method(),
        // Nowhere to go back to from the login screen.
        Some(KbAction::Back) => return Ok(Action::Quit),
        Some(action) => {
            if let Some(result) = handle_global_action(app, action, event_tx).await {
                return Ok(result);
            }
        }
        None => {
            if let Some(c) = typed_char(code, modifiers) {
                app.login.insert_char(c);
            } else if code == KeyCode::Backspace {
                app.login.backspace();
            }
        }
    }
    Ok(Action::Continue)
}

// ============================================================================
// Compose
// ============================================================================

fn handle_compose_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Compose)
    {
        Some(KbAction::SubmitForm) => match app.compose.submit() {
            Ok(post) => spawn_publish(app, post, event_tx),
            Err(SubmitRejected::Invalid(errors)) => {
                tracing::debug!(?errors, "Compose validation failed");
            }
            Err(SubmitRejected::InFlight) => app.set_status("Already creating this post"),
            Err(SubmitRejected::NotOpen) => {}
        },
        Some(KbAction::SwitchField) => app.compose.switch_field(),
        Some(KbAction::CancelForm) | Some(KbAction::Back) => {
            // Closing the form reloads the page, as a fresh visit would.
            if app.compose.cancel() {
                if let Some(request) = app.feed.begin_fetch() {
                    spawn_feed_fetch(app, request, event_tx);
                }
            }
        }
        Some(KbAction::Quit) => return Action::Quit,
        Some(_) => {}
        None => {
            if let Some(c) = typed_char(code, modifiers) {
                app.compose.insert_char(c);
            } else {
                match code {
                    KeyCode::Enter => app.compose.insert_char('\n'),
                    KeyCode::Backspace => app.compose.backspace(),
                    _ => {}
                }
            }
        }
    }
    Action::Continue
}

// ============================================================================
// Feed
// ============================================================================

async fn handle_feed_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let Some(action) = app.keybindings.action_for_key(code, modifiers, KbContext::Feed) else {
        return Ok(Action::Continue);
    };

    match action {
        KbAction::NavDown => app.nav_down(),
        KbAction::NavUp => app.nav_up(),
        KbAction::Select => {
            if let Some(post_id) = app.selected_post().map(|p| p.id) {
                open_post(app, post_id, event_tx);
            }
        }
        KbAction::NextPage => {
            if app.feed.has_next_page() {
                let next = i64::from(app.feed.page()) + 1;
                go_to_page(app, next, event_tx);
            }
        }
        KbAction::PrevPage => {
            if app.feed.has_previous_page() {
                let previous = i64::from(app.feed.page()) - 1;
                go_to_page(app, previous, event_tx);
            }
        }
        KbAction::FilterAll => set_filter(app, FeedFilter::All, event_tx),
        KbAction::FilterMine => set_filter(app, FeedFilter::Mine, event_tx),
        KbAction::ComposePost => app.compose.open(),
        KbAction::Retry => {
            if let Some(request) = app.feed.begin_fetch() {
                spawn_feed_fetch(app, request, event_tx);
            }
        }
        other => {
            if let Some(result) = handle_global_action(app, other, event_tx).await {
                return Ok(result);
            }
        }
    }
    Ok(Action::Continue)
}

fn go_to_page(app: &mut App, page: i64, event_tx: &mpsc::Sender<AppEvent>) {
    if let Some(request) = app.feed.on_page_param_change(page) {
        tracing::debug!(location = %app.feed.location(), "Navigating");
        app.selected_post = 0;
        spawn_feed_fetch(app, request, event_tx);
    }
}

/// Filters apply to the page already loaded; switching away from page 1
/// navigates back to it.
fn set_filter(app: &mut App, filter: FeedFilter, event_tx: &mpsc::Sender<AppEvent>) {
    if app.feed.filter() == filter {
        return;
    }
    if let Some(page) = app.feed.on_filter_change(filter) {
        go_to_page(app, i64::from(page), event_tx);
    }
    app.selected_post = 0;
    app.clamp_selection();
}

// ============================================================================
// Reader
// ============================================================================

async fn handle_reader_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let Some(action) = app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Reader)
    else {
        return Ok(Action::Continue);
    };

    match action {
        KbAction::ScrollDown => {
            app.scroll_down(1);
            app.clamp_reader_scroll();
        }
        KbAction::ScrollUp => app.scroll_up(1),
        KbAction::PageDown => {
            app.scroll_down(app.reader_visible_lines.max(1));
            app.clamp_reader_scroll();
        }
        KbAction::PageUp => app.scroll_up(app.reader_visible_lines.max(1)),
        KbAction::ExitReader | KbAction::Back => app.exit_reader(),
        KbAction::Retry => {
            if let ReaderState::Failed { post_id, .. } = app.reader {
                open_post(app, post_id, event_tx);
            }
        }
        other => {
            if let Some(result) = handle_global_action(app, other, event_tx).await {
                return Ok(result);
            }
        }
    }
    Ok(Action::Continue)
}
