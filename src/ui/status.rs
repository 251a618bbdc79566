use crate::app::{App, View};
use crate::feed::FeedState;
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let mut style = app.style("status_bar");

    // Use Cow to avoid allocations for static hints and borrowed messages
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.compose.is_open() {
        Cow::Borrowed("[Ctrl+S] create  [Tab] next field  [Esc] cancel")
    } else {
        match app.view {
            View::Connecting => Cow::Borrowed("Connecting...  [q] quit"),
            View::Login => Cow::Borrowed(
                "[Enter] submit  [Tab] next field  [Ctrl+T] switch method  [Esc] quit",
            ),
            View::Feed => match app.feed.state() {
                FeedState::Failed(_) => {
                    style = app.style("status_error");
                    Cow::Borrowed("[r] try again  [L] sign out  [q] quit")
                }
                _ => Cow::Borrowed(
                    "[j/k] move [Enter] open [n/p] page [a/m] filter [c] write [r] reload [L] sign out [?] help [q] quit",
                ),
            },
            View::Post => Cow::Borrowed("[b] back [j/k] scroll [Ctrl+d/u] page [T] theme [?] help [q] quit"),
        }
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}
