use crate::app::App;
use crate::feed::{ComposeField, ComposeState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::render::overlay_area;

/// Render the compose modal on top of the feed
pub fn render(f: &mut Frame, app: &App) {
    let overlay = overlay_area(f.area());
    if overlay.width < 30 || overlay.height < 14 {
        return;
    }

    f.render_widget(Clear, overlay);

    let compose = &app.compose;
    let submitting = compose.state() == ComposeState::Submitting;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(" Create New Post ");
    let inner = block.inner(overlay);
    f.render_widget(block, overlay);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // subtitle
            Constraint::Length(1), // title label
            Constraint::Length(3), // title input
            Constraint::Length(1), // title error
            Constraint::Length(1), // content label + counter
            Constraint::Min(3),    // content input
            Constraint::Length(1), // content error / submit error
            Constraint::Length(1), // hints
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled(
            "Share your thoughts with the community",
            app.style("hero"),
        )),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(Span::styled("Title", app.style("form_label"))),
        chunks[1],
    );
    render_input(
        f,
        app,
        chunks[2],
        compose.title(),
        compose.focus() == ComposeField::Title && !submitting,
    );
    if let Some(err) = &compose.errors().title {
        f.render_widget(
            Paragraph::new(Span::styled(err.as_str(), app.style("form_error"))),
            chunks[3],
        );
    }

    let counter_style = if compose.near_limit() {
        app.style("form_warning")
    } else {
        app.style("post_meta")
    };
    let label_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(12)])
        .split(chunks[4]);
    f.render_widget(
        Paragraph::new(Span::styled("Content", app.style("form_label"))),
        label_row[0],
    );
    f.render_widget(
        Paragraph::new(Span::styled(compose.counter_label(), counter_style))
            .alignment(ratatui::layout::Alignment::Right),
        label_row[1],
    );
    render_input(
        f,
        app,
        chunks[5],
        compose.content(),
        compose.focus() == ComposeField::Content && !submitting,
    );

    let footer_error = compose
        .errors()
        .content
        .as_deref()
        .or(compose.submit_error());
    if let Some(err) = footer_error {
        f.render_widget(
            Paragraph::new(Span::styled(err, app.style("form_error"))),
            chunks[6],
        );
    }

    let hints = if submitting {
        Line::from(Span::styled(
            "Creating...",
            app.style("empty_state").add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            "[Ctrl+S] Create Post  [Tab] Next field  [Esc] Cancel",
            app.style("post_meta"),
        ))
    };
    f.render_widget(Paragraph::new(hints), chunks[7]);
}

/// A bordered text field. The focused field shows a trailing cursor and
/// keeps its last lines in view.
fn render_input(f: &mut Frame, app: &App, area: Rect, value: &str, focused: bool) {
    let (border, text_style) = if focused {
        (app.style("panel_border_focused"), app.style("form_input_focused"))
    } else {
        (app.style("panel_border"), app.style("form_input"))
    };

    let mut lines: Vec<Line> = value.split('\n').map(Line::from).collect();
    if focused {
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::raw("_"));
        }
    }

    // Follow the cursor: keep the tail visible once the text outgrows the box.
    let visible = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(2).max(1) as usize;
    let wrapped: usize = lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(width))
        .sum();
    let scroll = wrapped.saturating_sub(visible).min(u16::MAX as usize) as u16;

    let paragraph = Paragraph::new(lines)
        .style(text_style)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).border_style(border));
    f.render_widget(paragraph, area);
}
