//! Help overlay.
//!
//! Opens on the section for whatever takes input right now, with a line of
//! live state (page, filter, sign-in method), followed by the other flows.
//! Keys bound to the same action share a row.

use crate::app::App;
use crate::feed::{ComposeState, FeedFilter};
use crate::keybindings::{Action, Context};
use ratatui::{
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::render::overlay_area;

const KEY_COLUMN_MAX: usize = 20;

/// One flow's worth of bindings.
#[derive(Debug)]
struct HelpSection {
    title: &'static str,
    state: Option<String>,
    /// Joined key names and what they do.
    rows: Vec<(String, &'static str)>,
}

fn section_title(ctx: Context) -> &'static str {
    match ctx {
        Context::Global => "Anywhere",
        Context::Feed => "Browsing the feed",
        Context::Reader => "Reading a post",
        Context::Compose => "Writing a post",
        Context::Login => "Signing in",
    }
}

fn section_state(ctx: Context, app: &App) -> Option<String> {
    match ctx {
        Context::Feed => {
            let feed = &app.feed;
            let scope = match feed.filter() {
                FeedFilter::All => format!("{} on this page", feed.all_count()),
                FeedFilter::Mine => format!(
                    "{} of {} on this page are yours",
                    feed.mine_count(),
                    feed.all_count()
                ),
            };
            Some(format!(
                "Page {} · {} · {}",
                feed.page(),
                feed.filter().label(),
                scope
            ))
        }
        Context::Compose => Some(match app.compose.state() {
            ComposeState::Submitting => "Publishing, keys are locked until it finishes".into(),
            _ => "Unsaved drafts are discarded on cancel".into(),
        }),
        Context::Login => Some(format!("Method: {}", app.login.method.label())),
        Context::Reader | Context::Global => None,
    }
}

fn sections(app: &App) -> Vec<HelpSection> {
    let active = app.input_context();
    let mut order = vec![active];
    order.extend(
        [
            Context::Global,
            Context::Feed,
            Context::Reader,
            Context::Compose,
            Context::Login,
        ]
        .into_iter()
        .filter(|c| *c != active),
    );

    let bindings = app.keybindings.all_bindings();
    order
        .into_iter()
        .filter_map(|ctx| {
            let mut grouped: Vec<(Action, Vec<&str>, &'static str)> = Vec::new();
            for (_, key, action, describe) in bindings.iter().filter(|(c, ..)| *c == ctx) {
                match grouped.iter_mut().find(|(a, ..)| *a == *action) {
                    Some((_, keys, _)) => keys.push(key.as_str()),
                    None => grouped.push((*action, vec![key.as_str()], *describe)),
                }
            }
            if grouped.is_empty() {
                return None;
            }
            Some(HelpSection {
                title: section_title(ctx),
                state: section_state(ctx, app),
                rows: grouped
                    .into_iter()
                    .map(|(_, keys, describe)| (keys.join(" / "), describe))
                    .collect(),
            })
        })
        .collect()
}

fn help_lines(app: &App) -> Vec<Line<'static>> {
    let sections = sections(app);
    let key_width = sections
        .iter()
        .flat_map(|s| s.rows.iter().map(|(keys, _)| keys.len()))
        .max()
        .unwrap_or(0)
        .min(KEY_COLUMN_MAX);

    let heading = app.style("reader_heading").add_modifier(Modifier::BOLD);
    let meta = app.style("reader_metadata");
    let keys_style = app.style("reader_link");

    let mut lines = Vec::new();
    for (i, section) in sections.into_iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(section.title, heading)));
        if let Some(state) = section.state {
            lines.push(Line::from(Span::styled(format!("  {}", state), meta)));
        }
        for (keys, describe) in section.rows {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<width$}  ", keys, width = key_width), keys_style),
                Span::raw(describe),
            ]));
        }
    }
    lines
}

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame, app: &App) {
    let overlay = overlay_area(f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let lines = help_lines(app);
    let visible = overlay.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible);
    let scroll = app.help_scroll_offset.min(max_scroll);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(" Help ");
    block = if max_scroll > 0 {
        block.title_bottom(Line::from(format!(
            " {}/{} · j/k scroll · ? or Esc close ",
            scroll + 1,
            max_scroll + 1
        )))
    } else {
        block.title_bottom(Line::from(" ? or Esc close "))
    };

    let scroll_rows = u16::try_from(scroll).unwrap_or(u16::MAX);
    let body = Paragraph::new(lines)
        .block(block)
        .style(app.style("reader_body"))
        .scroll((scroll_rows, 0));
    f.render_widget(body, overlay);
}
