use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use ragchat_core::{Message, Role};
use crate::app::{App, BackendStatus, NoticeKind};

const INPUT_HEIGHT: u16 = 5;

/// Style `**bold**` and `` `code` `` runs in an answer line. Unclosed markers stay literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold_at = rest.find("**");
        let code_at = rest.find('`');

        let (start, marker, style) = match (bold_at, code_at) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(Color::Green)),
            (Some(b), _) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(Color::Green)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        let Some(len) = after.find(marker).filter(|&len| len > 0) else {
            // No closing marker: emit through the opening marker as plain text
            spans.push(Span::raw(rest[..start + marker.len()].to_string()));
            rest = after;
            continue;
        };

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(after[..len].to_string(), style));
        rest = &after[len + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

fn role_style(role: Role) -> Style {
    let color = match role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Yellow,
        Role::Error => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn message_lines(msg: &Message) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{}:", msg.role().label()), role_style(msg.role())),
        Span::styled(format!(" {}", msg.display_time()), Style::default().fg(Color::DarkGray)),
    ])];

    match msg.role() {
        Role::Assistant => lines.extend(msg.content().lines().map(parse_markdown_line)),
        Role::User => lines.extend(msg.content().lines().map(|l| Line::from(l.to_string()))),
        Role::Error => lines.extend(
            msg.content()
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Red)))),
        ),
    }
    if msg.content().is_empty() {
        lines.push(Line::default());
    }

    lines.push(Line::default());
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_clear_confirm {
        render_clear_confirm(frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = match &app.backend {
        BackendStatus::Checking => Span::styled(" … checking ", Style::default().fg(Color::Gray)),
        BackendStatus::Online { version } => Span::styled(
            match version {
                Some(v) => format!(" ● online v{} ", v),
                None => " ● online ".to_string(),
            },
            Style::default().fg(Color::Green),
        ),
        BackendStatus::Offline => Span::styled(" ○ offline ", Style::default().fg(Color::Red)),
    };

    let title = Line::from(vec![
        Span::styled(" RAG Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.api_url.clone(), Style::default().fg(Color::Gray)),
        status,
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    app.follow_tail();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Conversation ({}) ", app.store.len()));

    let chat_text = if app.store.is_empty() && !app.is_awaiting() {
        Text::from(Span::styled(
            "Ask your question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = app.store.messages().iter().flat_map(message_lines).collect();

        if app.is_awaiting() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Bot is typing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, border_color) = if app.is_awaiting() {
        (" Waiting for answer... ", Color::DarkGray)
    } else {
        (" Ask ", Color::Yellow)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Cursor row/column within the (possibly multi-line) buffer
    let before_cursor: String = app.input.chars().take(app.cursor).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0);

    // Scroll to keep the cursor visible
    let row_offset = if inner_height == 0 {
        0
    } else {
        (cursor_row + 1).saturating_sub(inner_height)
    };
    let col_offset = if inner_width == 0 {
        0
    } else {
        (cursor_col + 1).saturating_sub(inner_width)
    };

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            "Type a question, Enter to send",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        // Use cyan text to match the "You:" style
        Paragraph::new(app.input.as_str())
            .style(Style::default().fg(Color::Cyan))
            .scroll((row_offset as u16, col_offset as u16))
    };

    frame.render_widget(input.block(block), area);

    if !app.show_clear_confirm {
        let x = (cursor_col - col_offset) as u16;
        let y = (cursor_row - row_offset) as u16;
        frame.set_cursor_position((area.x + 1 + x, area.y + 1 + y));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(notice) = &app.notice {
        let style = match notice.kind {
            NoticeKind::Info => Style::default().bg(Color::Blue).fg(Color::White),
            NoticeKind::Error => Style::default().bg(Color::Red).fg(Color::White),
        };
        let footer = Paragraph::new(Line::from(Span::styled(format!(" {} ", notice.text), style)))
            .style(Style::default().bg(Color::Black));
        frame.render_widget(footer, area);
        return;
    }

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let has_messages = app.store.can_clear();
    let action_style = if has_messages { label_style } else { disabled_style };

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" S-Enter ", key_style),
        Span::styled(" newline ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" ^E ", key_style),
        Span::styled(" export ", action_style),
        Span::styled(" ^L ", key_style),
        Span::styled(" clear ", action_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_clear_confirm(frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Clear conversation ");

    let text = Text::from(vec![
        Line::from("Are you sure you want to clear the conversation?"),
        Line::default(),
        Line::from(vec![
            Span::styled(" y ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" clear  "),
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" keep"),
        ]),
    ]);

    let popup = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}
