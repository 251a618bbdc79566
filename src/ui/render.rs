//! Render functions for the TUI.
//!
//! This module handles all rendering logic, dispatching to the appropriate
//! view based on application state. The feed layout lives here; the post
//! list, reader, forms and overlays have their own modules.

use crate::app::{App, View};
use crate::feed::{FeedFilter, FeedState};
use crate::util::initial;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{compose, help, login, posts, reader, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub(super) const SPINNER_FRAME_COUNT: usize = SPINNER_FRAMES.len();

pub(super) fn spinner(frame: usize) -> char {
    SPINNER_FRAMES[frame % SPINNER_FRAME_COUNT]
}

/// Centered overlay covering the middle 80% of `area` on both axes.
pub(super) fn overlay_area(area: Rect) -> Rect {
    let band = [
        Constraint::Percentage(10),
        Constraint::Percentage(80),
        Constraint::Percentage(10),
    ];
    let [_, middle, _] = Layout::vertical(band).areas(area);
    let [_, center, _] = Layout::horizontal(band).areas(middle);
    center
}

/// Main render dispatch function.
///
/// Routes to the appropriate view renderer based on current application state.
/// Handles terminal size validation before rendering.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        // For very small terminals (less than 3 lines), just show minimal message
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.view {
        View::Connecting => render_connecting(f, app, chunks[0]),
        View::Login => login::render(f, app, chunks[0]),
        View::Feed => render_feed(f, app, chunks[0]),
        View::Post => reader::render(f, app, chunks[0]),
    }
    status::render(f, app, chunks[1]);

    if app.compose.is_open() {
        compose::render(f, app);
    }

    // Render help overlay on top of any view when active
    if app.show_help {
        help::render(f, app);
    }
}

fn render_connecting(f: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            format!("{} Getting ready...", spinner(app.spinner_frame)),
            app.style("hero").add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Setting up your developer space",
            app.style("post_meta"),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        vertically_centered(area, 3),
    );
}

// ============================================================================
// Feed
// ============================================================================

/// Render the feed view: header, hero, tabs, posts and pagination.
fn render_feed(f: &mut Frame, app: &App, area: Rect) {
    let show_pagination = app.feed.has_previous_page() || app.feed.has_next_page();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_hero(f, app, chunks[1]);
    render_tabs(f, app, chunks[2]);

    match app.feed.state() {
        FeedState::Idle | FeedState::Loading => render_loading(f, app, chunks[3]),
        FeedState::Failed(msg) => render_error(f, app, chunks[3], msg),
        FeedState::Loaded(_) => match app.feed.empty_state() {
            Some(empty) => render_placeholder(
                f,
                app,
                chunks[3],
                [
                    Line::from(Span::styled(
                        empty.title(),
                        app.style("empty_state").add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(Span::styled(empty.message(), app.style("post_meta"))),
                    Line::from(""),
                    Line::from(Span::styled(
                        format!("[c] {}", empty.action()),
                        app.style("tab_active"),
                    )),
                ],
            ),
            None => posts::render(f, app, chunks[3]),
        },
    }

    render_footer(f, app, chunks[4], show_pagination);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut right = Vec::new();
    if let Some(session) = app.feed.session() {
        let name = session.display_name();
        right.push(Span::styled(
            format!(" {} ", initial(Some(name))),
            app.style("avatar"),
        ));
        right.push(Span::styled(format!(" {}", name), app.style("post_meta")));
    }

    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(32)])
        .split(area);

    f.render_widget(
        Paragraph::new(Span::styled(
            " devlog",
            app.style("post_title").add_modifier(Modifier::BOLD),
        )),
        row[0],
    );
    f.render_widget(
        Paragraph::new(Line::from(right)).alignment(Alignment::Right),
        row[1],
    );
}

fn render_hero(f: &mut Frame, app: &App, area: Rect) {
    let subtitle = match app.feed.filter() {
        FeedFilter::All => {
            "Discover insights, tutorials, and experiences from developers around the world"
        }
        FeedFilter::Mine => "Your personal collection of thoughts and technical insights",
    };
    let lines = vec![
        Line::from(Span::styled(
            "Developer Stories",
            app.style("hero").add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(subtitle, app.style("post_meta"))),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .border_style(app.style("panel_border")),
            ),
        area,
    );
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let loaded = matches!(app.feed.state(), FeedState::Loaded(_));
    let tab = |filter: FeedFilter, count: Option<String>| {
        let style = if app.feed.filter() == filter {
            app.style("tab_active")
        } else {
            app.style("tab_inactive")
        };
        let text = match count {
            Some(count) => format!(" {} ({}) ", filter.label(), count),
            None => format!(" {} ", filter.label()),
        };
        Span::styled(text, style)
    };

    let all = loaded.then(|| app.feed.all_count().to_string());
    let mine = loaded.then(|| format!("{} on this page", app.feed.mine_count()));

    let line = Line::from(vec![
        Span::raw(" "),
        tab(FeedFilter::All, all),
        Span::raw(" "),
        tab(FeedFilter::Mine, mine),
        Span::raw("   "),
        Span::styled("[c] Write a post", app.style("post_meta")),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_loading(f: &mut Frame, app: &App, area: Rect) {
    render_placeholder(
        f,
        app,
        area,
        [
            Line::from(Span::styled(
                format!("{} Loading posts...", spinner(app.spinner_frame)),
                app.style("empty_state"),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Getting your content ready",
                app.style("post_meta"),
            )),
            Line::from(""),
            Line::from(""),
        ],
    );
}

fn render_error(f: &mut Frame, app: &App, area: Rect, msg: &str) {
    render_placeholder(
        f,
        app,
        area,
        [
            Line::from(Span::styled(
                "Something went wrong",
                app.style("reader_error").add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Error: {}", msg),
                app.style("reader_error"),
            )),
            Line::from(""),
            Line::from(Span::styled("[r] Try Again", app.style("tab_active"))),
        ],
    );
}

/// A bordered panel with five centered lines.
fn render_placeholder(f: &mut Frame, app: &App, area: Rect, lines: [Line<'_>; 5]) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border"));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(Vec::from(lines))
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true }),
        vertically_centered(inner, 5),
    );
}

/// Pagination controls (when there is anywhere to go) and the location line.
fn render_footer(f: &mut Frame, app: &App, area: Rect, show_pagination: bool) {
    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(24)])
        .split(area);

    if show_pagination {
        let enabled = app.style("tab_active");
        let disabled = app.style("tab_inactive");
        let line = Line::from(vec![
            Span::raw(" "),
            Span::styled(
                "[p] Previous",
                if app.feed.has_previous_page() {
                    enabled
                } else {
                    disabled
                },
            ),
            Span::styled(format!("  {}  ", app.feed.page()), app.style("post_title")),
            Span::styled(
                "Next [n]",
                if app.feed.has_next_page() {
                    enabled
                } else {
                    disabled
                },
            ),
        ]);
        f.render_widget(Paragraph::new(line), row[0]);
    }

    f.render_widget(
        Paragraph::new(Span::styled(app.feed.location(), app.style("location")))
            .alignment(Alignment::Right),
        row[1],
    );
}

fn vertically_centered(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        y: area.y + area.height.saturating_sub(height) / 2,
        height,
        ..area
    }
}
