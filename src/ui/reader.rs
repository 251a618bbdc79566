use crate::app::{App, ReaderState, MAX_SCROLL};
use crate::theme::StyleMap;
use chrono::{DateTime, Local, Utc};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::borrow::Cow;

use super::posts::format_date_in;
use super::render::spinner;

const READER_DATE_FORMAT: &str = "%B %d, %Y at %H:%M";

/// Reader byline date: `"March 05, 2024 at 14:07"` in local time.
pub fn format_reader_date(ts: Option<DateTime<Utc>>) -> String {
    format_date_in(ts, &Local, READER_DATE_FORMAT)
}

/// Render the post reader view
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    // Borders excluded
    app.reader_visible_lines = area.height.saturating_sub(2) as usize;
    app.reader_viewport_width = area.width.saturating_sub(2) as usize;

    // Clamp before drawing so a resize never renders one frame past the end.
    app.clamp_reader_scroll();

    let meta = app.style("reader_metadata");
    let error = app.style("reader_error");

    // Header and body line counts must stay in step with
    // `App::reader_content_lines`.
    let (header, body): ([Line<'_>; 3], Cow<'_, [Line<'static>]>) = match &app.reader {
        ReaderState::Idle => (
            [Line::from("No post selected"), Line::from(""), Line::from("")],
            Cow::Owned(vec![Line::from("")]),
        ),
        ReaderState::Loading { .. } => (
            [
                Line::from(Span::styled(
                    format!("{} Loading post...", spinner(app.spinner_frame)),
                    app.style("empty_state"),
                )),
                Line::from(Span::styled("Getting your content ready", meta)),
                Line::from(""),
            ],
            Cow::Owned(vec![Line::from("")]),
        ),
        ReaderState::Loaded {
            post,
            rendered_lines,
        } => (
            [
                Line::from(Span::styled(
                    post.title.as_str(),
                    app.style("post_title").add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!(
                        "By {} • {}",
                        post.author_name(),
                        format_reader_date(post.created_at)
                    ),
                    meta,
                )),
                Line::from(""),
            ],
            Cow::Borrowed(rendered_lines.as_slice()),
        ),
        ReaderState::NotFound => (
            [
                Line::from(Span::styled(
                    "Post not found",
                    app.style("empty_state").add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "It may have been removed, or the link is wrong.",
                    meta,
                )),
                Line::from(""),
            ],
            Cow::Owned(vec![Line::from(Span::styled("[b] Back to Posts", meta))]),
        ),
        ReaderState::Failed { error: msg, .. } => (
            [
                Line::from(Span::styled(
                    "Something went wrong",
                    error.add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(""),
            ],
            Cow::Owned(vec![
                Line::from(Span::styled(format!("Error: {}", msg), error)),
                Line::from(Span::styled("[r] Try Again  [b] Back to Posts", meta)),
            ]),
        ),
    };

    let text = Text::from_iter(header.into_iter().chain(body.iter().cloned()));

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(" Post "),
        )
        .style(app.style("reader_body"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset.min(MAX_SCROLL) as u16, 0));

    f.render_widget(paragraph, area);
}

// ============================================================================
// Markdown
// ============================================================================

/// Convert Markdown to styled ratatui Lines.
///
/// Rendered once when a post arrives (and again on theme change); the reader
/// clones from the cached lines on each frame.
pub fn render_markdown(md: &str, theme: &StyleMap) -> Vec<Line<'static>> {
    let mut renderer = MarkdownRenderer::new(theme, md.lines().count());
    for event in Parser::new_ext(md, Options::ENABLE_STRIKETHROUGH) {
        renderer.handle(event);
    }
    renderer.finish()
}

struct MarkdownRenderer<'t> {
    theme: &'t StyleMap,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    in_heading: bool,
    in_code_block: bool,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    quote_depth: usize,
    /// Destinations of the links being rendered, innermost last.
    links: Vec<String>,
    /// Open lists; `Some(n)` is an ordered list whose next item is `n`.
    lists: Vec<Option<u64>>,
}

impl<'t> MarkdownRenderer<'t> {
    fn new(theme: &'t StyleMap, estimated_lines: usize) -> Self {
        Self {
            theme,
            lines: Vec::with_capacity(estimated_lines),
            spans: Vec::with_capacity(4),
            in_heading: false,
            in_code_block: false,
            strong: 0,
            emphasis: 0,
            strikethrough: 0,
            quote_depth: 0,
            links: Vec::new(),
            lists: Vec::new(),
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                self.flush();
                self.in_heading = true;
            }
            Event::End(TagEnd::Heading { .. }) => {
                self.flush();
                self.in_heading = false;
                self.blank();
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                self.flush();
                // Items in loose lists wrap their text in paragraphs.
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::BlockQuote { .. }) => {
                self.flush();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote { .. }) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            Event::Start(Tag::CodeBlock { .. }) => {
                self.flush();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock { .. }) => {
                self.flush();
                self.in_code_block = false;
                self.blank();
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List { .. }) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::styled(
                    format!("{}{}", indent, marker),
                    self.theme.resolve("reader_metadata"),
                ));
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::Emphasis) => self.emphasis += 1,
            Event::End(TagEnd::Emphasis) => self.emphasis = self.emphasis.saturating_sub(1),
            Event::Start(Tag::Strong) => self.strong += 1,
            Event::End(TagEnd::Strong) => self.strong = self.strong.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => self.strikethrough += 1,
            Event::End(TagEnd::Strikethrough) => {
                self.strikethrough = self.strikethrough.saturating_sub(1)
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.links.push(dest_url.into_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = self.links.pop() {
                    if !url.is_empty() {
                        self.spans.push(Span::styled(
                            format!(" ({})", url),
                            self.theme.resolve("reader_metadata"),
                        ));
                    }
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                self.spans.push(Span::styled(
                    format!("[Image: {}]", dest_url),
                    self.theme.resolve("reader_link"),
                ));
            }
            Event::Text(text) => {
                if self.in_code_block {
                    self.push_code(&text);
                } else {
                    let style = self.text_style();
                    self.spans.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(code) => {
                self.spans.push(Span::styled(
                    format!("`{}`", code),
                    self.theme.resolve("reader_inline_code"),
                ));
            }
            Event::SoftBreak => self.spans.push(Span::raw(" ")),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    self.theme.resolve("reader_metadata"),
                )));
                self.blank();
            }
            _ => {}
        }
    }

    fn text_style(&self) -> Style {
        let mut style = if self.in_heading {
            self.theme.resolve("reader_heading")
        } else if self.quote_depth > 0 {
            self.theme.resolve("reader_quote")
        } else {
            self.theme.resolve("reader_body")
        };
        if self.strong > 0 {
            style = style.patch(self.theme.resolve("reader_strong"));
        }
        if self.emphasis > 0 {
            style = style.patch(self.theme.resolve("reader_emphasis"));
        }
        if self.strikethrough > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if !self.links.is_empty() {
            style = style.patch(self.theme.resolve("reader_link"));
        }
        style
    }

    /// Code block text arrives with embedded newlines; one output line each.
    fn push_code(&mut self, text: &str) {
        let style = self.theme.resolve("reader_code_block");
        for line in text.lines() {
            self.spans.push(Span::styled(format!("  {}", line), style));
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut line: Vec<Span<'static>> = Vec::with_capacity(self.spans.len() + 1);
        if self.quote_depth > 0 {
            line.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                self.theme.resolve("reader_quote"),
            ));
        }
        line.append(&mut self.spans);
        self.lines.push(Line::from(line));
    }

    /// Separator line, never doubled and never leading.
    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !is_blank(l)) {
            self.lines.push(Line::from(""));
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(is_blank) {
            self.lines.pop();
        }
        self.lines
    }
}

fn is_blank(line: &Line<'_>) -> bool {
    line.spans.iter().all(|s| s.content.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeVariant;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn theme() -> StyleMap {
        StyleMap::from_palette(&ThemeVariant::Dark.palette())
    }

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn plain_lines(md: &str) -> Vec<String> {
        render_markdown(md, &theme()).iter().map(plain).collect()
    }

    #[test]
    fn test_render_plain_text() {
        assert_eq!(plain_lines("Hello world"), vec!["Hello world"]);
    }

    #[test]
    fn test_render_heading_uses_heading_style() {
        let t = theme();
        let lines = render_markdown("# Heading 1\n\nBody", &t);
        assert_eq!(plain(&lines[0]), "Heading 1");
        assert_eq!(lines[0].spans[0].style, t.resolve("reader_heading"));
        assert_eq!(plain(&lines[1]), "");
        assert_eq!(plain(&lines[2]), "Body");
    }

    #[test]
    fn test_render_bold_and_italic() {
        let t = theme();
        let lines = render_markdown("This is **bold** and *it*", &t);
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "bold")
            .unwrap();
        assert_eq!(
            bold.style,
            t.resolve("reader_body").patch(t.resolve("reader_strong"))
        );
        let italic = lines[0].spans.iter().find(|s| s.content == "it").unwrap();
        assert_eq!(
            italic.style,
            t.resolve("reader_body").patch(t.resolve("reader_emphasis"))
        );
    }

    #[test]
    fn test_render_code_block_one_line_each() {
        let lines = plain_lines("```\nfn main() {}\nlet x = 1;\n```");
        assert_eq!(lines, vec!["  fn main() {}", "  let x = 1;"]);
    }

    #[test]
    fn test_render_link_appends_url() {
        assert_eq!(
            plain_lines("[docs](https://example.com)"),
            vec!["docs (https://example.com)"]
        );
    }

    #[test]
    fn test_render_lists() {
        assert_eq!(
            plain_lines("- one\n- two\n\n1. first\n2. second"),
            vec!["• one", "• two", "", "1. first", "2. second"]
        );
    }

    #[test]
    fn test_render_blockquote_prefix() {
        assert_eq!(plain_lines("> quoted"), vec!["│ quoted"]);
    }

    #[test]
    fn test_render_empty() {
        assert!(render_markdown("", &theme()).is_empty());
    }

    #[test]
    fn test_render_unicode() {
        assert_eq!(plain_lines("Hello 世界 🌍"), vec!["Hello 世界 🌍"]);
    }

    #[test]
    fn test_format_reader_date() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).single();
        assert_eq!(
            format_date_in(ts, &Utc, READER_DATE_FORMAT),
            "March 05, 2024 at 14:07"
        );
        assert_eq!(format_reader_date(None), "Unknown date");
    }
}
