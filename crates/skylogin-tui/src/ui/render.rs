use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use skylogin_core::auth::{Field, LoginStep, Resolved};

use crate::app::{App, AppState, LoginFocus};

use super::styles;

/// Interior width of input fields, in characters.
const FIELD_WIDTH: usize = 30;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Page
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    match &app.page {
        Resolved::Login => render_login(frame, app, chunks[1]),
        Resolved::Home(session) => render_home(frame, app, &session.handle, chunks[1]),
        Resolved::NotFound(_) => render_not_found(frame, chunks[1]),
    }
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    render_notification(frame, app, chunks[1]);

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  skylogin";
    let path = format!("{}  ", app.path);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + path.len()),
        )),
        Span::styled(path, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match (&app.page, app.login_step()) {
        (Resolved::Login, LoginStep::AwaitingCredentials) => {
            "[Tab] next field | [Enter] sign in | [Esc] quit"
        }
        (Resolved::Login, LoginStep::AwaitingSecondFactor) => "[Enter] verify | [Esc] back",
        (Resolved::Home(_), _) => "[Enter] click | [l]ogout | [q]uit",
        (Resolved::NotFound(_), _) => "[Enter] home | [q]uit",
    };

    let left_text = format!(" {} ", app.service_url());
    let right_text = format!(" {} ", shortcuts);
    let padding_len = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// Keep the tail of `value` visible inside a fixed-width field.
fn field_text(value: &str, focused: bool) -> String {
    let visible = FIELD_WIDTH - 1;
    let count = value.chars().count();
    let shown: String = value.chars().skip(count.saturating_sub(visible)).collect();
    let cursor = if focused { "▌" } else { "" };
    format!("{:<width$}", format!("{}{}", shown, cursor), width = FIELD_WIDTH)
}

fn push_field(
    lines: &mut Vec<Line<'static>>,
    label: &'static str,
    value: String,
    focused: bool,
    error: Option<&'static str>,
) {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::input_style()
    };
    lines.push(Line::from(Span::styled(format!("  {}", label), styles::muted_style())));
    lines.push(Line::from(vec![
        Span::styled("  [", styles::muted_style()),
        Span::styled(field_text(&value, focused), style),
        Span::styled("]", styles::muted_style()),
    ]));
    if let Some(error) = error {
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }
}

fn push_button(lines: &mut Vec<Line<'static>>, label: &str, busy_label: &str, focused: bool, busy: bool) {
    let text = if busy { busy_label } else { label };
    let style = if busy {
        styles::muted_style()
    } else if focused {
        styles::selected_style()
    } else {
        styles::input_style()
    };
    let text = if focused && !busy {
        format!(" ▶ {} ◀ ", text)
    } else {
        format!("   {}   ", text)
    };
    let pad = (FIELD_WIDTH + 4).saturating_sub(text.chars().count() + 2) / 2;
    lines.push(Line::from(vec![
        Span::raw(" ".repeat(pad)),
        Span::raw("["),
        Span::styled(text, style),
        Span::raw("]"),
    ]));
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.form;
    let busy = app.is_submitting();
    let mut lines: Vec<Line<'static>> = vec![
        Line::from(Span::styled("  Sign in with Bluesky", styles::title_style())),
        Line::from(""),
    ];

    match app.login_step() {
        LoginStep::AwaitingCredentials => {
            push_field(
                &mut lines,
                "Username or Email",
                form.identifier.clone(),
                form.focus == LoginFocus::Identifier,
                form.error_for(Field::Identifier),
            );
            push_field(
                &mut lines,
                "Password",
                "*".repeat(form.password.chars().count()),
                form.focus == LoginFocus::Password,
                form.error_for(Field::Password),
            );
            lines.push(Line::from(""));
            push_button(&mut lines, "Sign In", "Signing in…", form.focus == LoginFocus::Button, busy);
        }
        LoginStep::AwaitingSecondFactor => {
            push_field(
                &mut lines,
                "Verification Code",
                form.code.clone(),
                form.focus == LoginFocus::Code,
                form.error_for(Field::Code),
            );
            lines.push(Line::from(Span::styled(
                "  Please check your email for the verification code.",
                styles::muted_style(),
            )));
            lines.push(Line::from(""));
            push_button(&mut lines, "Verify", "Verifying…", form.focus == LoginFocus::Button, busy);
        }
    }

    let height = lines.len() as u16 + 2;
    let card = centered_rect_fixed(58, height, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), card);
}

fn render_home(frame: &mut Frame, app: &App, handle: &str, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "  Hello World",
            styles::title_style().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Signed in as ", styles::muted_style()),
            Span::styled(format!("@{}", handle), styles::highlight_style()),
        ]),
        Line::from(Span::styled(
            "  Welcome to this terminal application built with ratatui.",
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("                 ["),
            Span::styled(" ▶ Click Me! ◀ ", styles::selected_style()),
            Span::raw("]"),
        ]),
    ];

    if app.clicks > 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  You've clicked {} times", app.clicks),
            styles::success_style(),
        )));
    }
    if app.is_logging_out() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("  Signing out…", styles::muted_style())));
    }

    let height = lines.len() as u16 + 2;
    let card = centered_rect_fixed(62, height, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), card);
}

fn render_not_found(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled("  404 Page Not Found", styles::error_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("Enter", styles::help_key_style()),
            Span::styled(" to go home", styles::muted_style()),
        ]),
    ];
    let card = centered_rect_fixed(40, 5, area);
    frame.render_widget(Paragraph::new(lines), card);
}

fn render_notification(frame: &mut Frame, app: &App, area: Rect) {
    let Some(notification) = app.notifications.current() else {
        return;
    };

    let width = 44.min(area.width);
    let text_width = width.saturating_sub(2).max(1) as usize;
    let wrapped_rows = notification.description.chars().count().div_ceil(text_width);
    let height = (wrapped_rows as u16 + 3).min(area.height);
    let rect = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y,
        width,
        height,
    );

    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::notification_border_style(notification.variant))
        .title(Span::styled(
            format!(" {} ", notification.title),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let paragraph = Paragraph::new(notification.description.clone())
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, rect);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 6, frame.area());

    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
