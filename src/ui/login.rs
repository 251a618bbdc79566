use crate::app::{App, LoginField, LoginMethod};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the sign-in view
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let width = 56u16.min(area.width.saturating_sub(4));
    let height = 20u16.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let panel = Rect::new(x, y, width, height);
    if panel.width < 20 || panel.height < 12 {
        return;
    }

    let form = &app.login;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(" devlog ");
    let inner = block.inner(panel);
    f.render_widget(block, panel);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // heading
            Constraint::Length(2), // subtitle
            Constraint::Length(2), // method tabs
            Constraint::Length(1), // email label
            Constraint::Length(3), // email input
            Constraint::Length(1), // secret label
            Constraint::Length(3), // secret input
            Constraint::Length(1), // error / notice
            Constraint::Min(1),    // button
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled(
            "Welcome back",
            app.style("hero").add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(Span::styled(
            "Continue your writing journey",
            app.style("post_meta"),
        ))
        .alignment(Alignment::Center),
        chunks[1],
    );

    let tab = |method: LoginMethod| {
        let style = if form.method == method {
            app.style("tab_active")
        } else {
            app.style("tab_inactive")
        };
        Span::styled(format!(" {} ", method.label()), style)
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            tab(LoginMethod::Password),
            Span::raw(" "),
            tab(LoginMethod::EmailCode),
        ]))
        .alignment(Alignment::Center),
        chunks[2],
    );

    f.render_widget(
        Paragraph::new(Span::styled("Your Email", app.style("form_label"))),
        chunks[3],
    );
    render_field(
        f,
        app,
        chunks[4],
        &form.email,
        form.focus == LoginField::Email && !form.submitting,
    );

    if form.has_secret_field() {
        let (label, shown) = match form.method {
            LoginMethod::Password => ("Your Password", "•".repeat(form.password.chars().count())),
            LoginMethod::EmailCode => ("Sign-in Code", form.code.clone()),
        };
        f.render_widget(
            Paragraph::new(Span::styled(label, app.style("form_label"))),
            chunks[5],
        );
        render_field(
            f,
            app,
            chunks[6],
            &shown,
            form.focus == LoginField::Secret && !form.submitting,
        );
    }

    if let Some(err) = &form.error {
        f.render_widget(
            Paragraph::new(Span::styled(err.as_str(), app.style("form_error"))),
            chunks[7],
        );
    } else if let Some(notice) = &form.notice {
        f.render_widget(
            Paragraph::new(Span::styled(notice.as_str(), app.style("empty_state"))),
            chunks[7],
        );
    }

    let button = match (form.method, form.has_secret_field(), form.submitting) {
        (LoginMethod::EmailCode, false, true) => "Sending code...",
        (LoginMethod::EmailCode, false, false) => "[Enter] Send sign-in code",
        (_, _, true) => "Signing in...",
        (_, _, false) => "[Enter] Sign in",
    };
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                button,
                app.style("tab_active").add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "[Tab] Next field  [Ctrl+T] Switch method  [Esc] Quit",
                app.style("post_meta"),
            )),
        ])
        .alignment(Alignment::Center),
        chunks[8],
    );
}

fn render_field(f: &mut Frame, app: &App, area: Rect, value: &str, focused: bool) {
    let (border, style) = if focused {
        (app.style("panel_border_focused"), app.style("form_input_focused"))
    } else {
        (app.style("panel_border"), app.style("form_input"))
    };
    let text = if focused {
        format!("{}_", value)
    } else {
        value.to_string()
    };
    // Keep the end of long input in view.
    let room = area.width.saturating_sub(2) as usize;
    let skip = text.chars().count().saturating_sub(room);
    let text: String = text.chars().skip(skip).collect();

    f.render_widget(
        Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(border)),
        area,
    );
}
