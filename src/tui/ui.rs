use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::llm::{ChatMessage, Role};
use crate::notify::Variant;
use crate::tui::app::ChatApp;

const HELP: &str =
    "Enter send | Esc normal mode, q quit | [ ] pick reply | Ctrl+R voice | Ctrl+S read aloud | Ctrl+E export";

/// Render the main UI
pub fn render_ui(f: &mut Frame, app: &ChatApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Status bar
            Constraint::Min(5),    // Messages
            Constraint::Length(3), // Input box
        ])
        .split(f.size());

    render_status_bar(f, app, chunks[0]);
    render_messages(f, app, chunks[1]);
    render_input_box(f, app, chunks[2]);
}

/// Render the status bar
fn render_status_bar(f: &mut Frame, app: &ChatApp, area: Rect) {
    let flag = |on: bool| {
        if on {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let status_text = Line::from(vec![
        Span::styled("Model: ", Style::default().fg(Color::Gray)),
        Span::styled(app.model_name().to_string(), Style::default().fg(Color::Green)),
        Span::styled(" | Voice: ", Style::default().fg(Color::Gray)),
        Span::styled(
            if app.is_listening() { "listening" } else { "off" },
            flag(app.is_listening()),
        ),
        Span::styled(" | Speech: ", Style::default().fg(Color::Gray)),
        Span::styled(
            if app.is_speaking() { "speaking" } else { "idle" },
            flag(app.is_speaking()),
        ),
    ]);

    // Loading beats notifications, which beat the key help.
    let detail_line = if app.conversation().is_loading() {
        Line::from(Span::styled(
            "Generating response...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(notification) = app.notifications().latest() {
        let color = match notification.variant {
            Variant::Default => Color::Cyan,
            Variant::Destructive => Color::Red,
        };
        Line::from(vec![
            Span::styled(
                format!("{}: ", notification.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(notification.description.clone(), Style::default().fg(color)),
        ])
    } else {
        Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray)))
    };

    let status_bar = Paragraph::new(Text::from(vec![status_text, detail_line]))
        .block(Block::default().borders(Borders::ALL).title("Gemini Chat"));

    f.render_widget(status_bar, area);
}

/// Render the messages area
fn render_messages(f: &mut Frame, app: &ChatApp, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Conversation");
    let messages = app.conversation().messages();

    if messages.is_empty() {
        let welcome = Paragraph::new(Text::from(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Welcome to Gemini Chat",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Start a conversation with the AI assistant. Type your message below or press Ctrl+R for voice input.",
                Style::default().fg(Color::Gray),
            )),
        ]))
        .block(block)
        .alignment(ratatui::layout::Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(welcome, area);
        return;
    }

    let width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2) as usize;
    let lines = message_lines(messages, width, app.reply_to_read());

    // Keep the newest message in view unless the user scrolled back.
    let max_top = lines.len().saturating_sub(height);
    let top = max_top.saturating_sub(app.conversation().scroll_back());

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((top.min(u16::MAX as usize) as u16, 0));
    f.render_widget(paragraph, area);
}

/// Lays out every message as pre-wrapped lines. The reply that would be
/// read aloud gets a marker next to its label.
fn message_lines(messages: &[ChatMessage], width: usize, to_read: Option<usize>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (idx, msg) in messages.iter().enumerate() {
        let (label, color) = match msg.role {
            Role::User => ("You", Color::Cyan),
            Role::Model => ("Gemini AI", Color::Green),
        };
        let mut header = vec![Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];
        if to_read == Some(idx) {
            header.push(Span::styled(" [read aloud]", Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));

        let mut in_code = false;
        for raw in msg.content.lines() {
            let fence = raw.trim_start().starts_with("```");
            if fence {
                in_code = !in_code;
            }
            let style = if msg.role == Role::Model && (in_code || fence) {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            for chunk in wrap_text(raw, width) {
                lines.push(Line::from(Span::styled(chunk, style)));
            }
        }

        lines.push(Line::from(""));
    }

    lines
}

/// Splits a line into chunks no wider than `width` terminal columns.
///
/// Breaks at character boundaries so code keeps its whitespace. Wide
/// characters (CJK, emoji) count as two columns.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if current_width + ch_width > width && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push(ch);
        current_width += ch_width;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// The longest suffix of `input` that fits in `width` columns.
fn visible_tail(input: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = input.len();
    for (idx, ch) in input.char_indices().rev() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        start = idx;
    }
    &input[start..]
}

/// Render the input box
fn render_input_box(f: &mut Frame, app: &ChatApp, area: Rect) {
    let input = app.conversation().input();
    let title = if app.conversation().is_loading() {
        "Input (waiting for reply)"
    } else {
        "Input"
    };

    // Only the tail of long input fits on the line.
    let shown = visible_tail(input, area.width.saturating_sub(3) as usize);

    let paragraph = Paragraph::new(shown).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().fg(if app.conversation().is_loading() {
                Color::DarkGray
            } else {
                Color::White
            })),
    );

    f.render_widget(paragraph, area);
    f.set_cursor(area.x + shown.width() as u16 + 1, area.y + 1);
}
