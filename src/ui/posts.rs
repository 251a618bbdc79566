//! Post list widget for the feed view.
//!
//! Each post is a three-line card: avatar initial, title and an optional
//! "Your Post" badge; author, date and read time; then the excerpt.

use crate::app::App;
use crate::backend::Post;
use crate::util::{excerpt, initial, truncate_to_width, EXCERPT_MAX_CHARS};
use chrono::{DateTime, Local, TimeZone, Utc};
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

const LIST_DATE_FORMAT: &str = "%b %d, %Y";

/// Characters read per minute for the read-time estimate.
const CHARS_PER_MINUTE: usize = 200;

/// Format `ts` in `tz`, `"Unknown date"` when absent.
pub(super) fn format_date_in<Tz: TimeZone>(
    ts: Option<DateTime<Utc>>,
    tz: &Tz,
    fmt: &str,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts {
        Some(ts) => ts.with_timezone(tz).format(fmt).to_string(),
        None => "Unknown date".to_string(),
    }
}

/// List date: `"Mar 05, 2024"` in local time.
pub(super) fn format_list_date(ts: Option<DateTime<Utc>>) -> String {
    format_date_in(ts, &Local, LIST_DATE_FORMAT)
}

/// `"N min read"` at 200 characters a minute, rounded up to at least 1.
pub(super) fn read_time(content: &str) -> String {
    format!("{} min read", content.chars().count() / CHARS_PER_MINUTE + 1)
}

/// Render the post list panel
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let me = app.feed.session().map(|s| s.user_id);
    let posts = app.visible_posts();
    let inner_width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = posts
        .iter()
        .map(|post| card(app, post, me == Some(post.author_id), inner_width))
        .collect();

    let title = format!(
        " {} · page {} ",
        app.feed.filter().label(),
        app.feed.page()
    );

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        )
        .highlight_style(app.style("post_selected"))
        .highlight_symbol("▌");

    let mut state = ListState::default();
    if !posts.is_empty() {
        state.select(Some(app.selected_post));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn card<'a>(app: &App, post: &'a Post, own: bool, width: usize) -> ListItem<'a> {
    let author = post.author_name();

    let mut heading = vec![
        Span::styled(
            format!(" {} ", initial(Some(author))),
            app.style("avatar"),
        ),
        Span::raw(" "),
    ];
    let badge_width = if own { 12 } else { 0 };
    heading.push(Span::styled(
        truncate_to_width(&post.title, width.saturating_sub(4 + badge_width)),
        app.style("post_title").add_modifier(Modifier::BOLD),
    ));
    if own {
        heading.push(Span::raw("  "));
        heading.push(Span::styled("Your Post", app.style("tab_active")));
    }

    let meta = Line::from(Span::styled(
        format!(
            "    {} · {} · {}",
            author,
            format_list_date(post.created_at),
            read_time(&post.content)
        ),
        app.style("post_meta"),
    ));

    let body = excerpt(&post.content, EXCERPT_MAX_CHARS);
    let body = Line::from(Span::styled(
        format!(
            "    {}",
            truncate_to_width(&body, width.saturating_sub(4))
        ),
        app.style("post_excerpt"),
    ));

    ListItem::new(vec![Line::from(heading), meta, body, Line::from("")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_time_rounds_up() {
        assert_eq!(read_time(""), "1 min read");
        assert_eq!(read_time(&"a".repeat(199)), "1 min read");
        assert_eq!(read_time(&"a".repeat(200)), "2 min read");
        assert_eq!(read_time(&"é".repeat(450)), "3 min read");
    }

    #[test]
    fn test_list_date_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).single();
        assert_eq!(format_date_in(ts, &Utc, LIST_DATE_FORMAT), "Mar 05, 2024");
    }

    #[test]
    fn test_missing_date() {
        assert_eq!(format_list_date(None), "Unknown date");
    }
}
