//! UI rendering for the TUI

use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::{App, Pane};
use crate::models::Delivery;

const SIDEBAR_WIDTH: u16 = 28;
const COMPOSE_HEIGHT: u16 = 3;

/// Status indicator symbol and color for a connection/presence state.
fn status_indicator(online: bool) -> (&'static str, Color) {
    if online {
        ("*", Color::Green)
    } else {
        ("o", Color::Red)
    }
}

fn pane_border(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area, app);

    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
            .areas(main_area);

    render_sidebar(frame, sidebar_area, app);

    let [messages_area, compose_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(COMPOSE_HEIGHT)])
            .areas(content_area);

    render_messages(frame, messages_area, app);
    render_compose(frame, compose_area, app);
    render_status(frame, status_area, app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let (symbol, color) = status_indicator(app.store.is_connected());
    let title = match app.store.active_chat() {
        Some(chat) => chat.label(app.store.current_user_id()).to_string(),
        None => "no chat selected".to_string(),
    };

    let line = Line::from(vec![
        Span::styled(" lokal ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(symbol, Style::default().fg(color)),
        Span::raw("  "),
        Span::styled(title, Style::default().fg(Color::White)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title("Chats")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(pane_border(app.active_pane == Pane::Sidebar));
    let inner_width = area.width.saturating_sub(2) as usize;

    let me = app.store.current_user_id();
    let mut lines = Vec::new();
    for (i, chat) in app.store.chats().iter().enumerate() {
        let selected = i == app.selected;
        let active = app.store.active_chat_id() == Some(chat.id.as_str());

        let mut spans = Vec::new();
        spans.push(Span::raw(if selected { "> " } else { "  " }));

        // Presence dot for the other member of a 1:1 chat.
        if !chat.is_group {
            let online = chat
                .members
                .iter()
                .find(|m| m.id != me)
                .map(|m| m.is_online)
                .unwrap_or(false);
            let (symbol, color) = status_indicator(online);
            spans.push(Span::styled(symbol, Style::default().fg(color)));
            spans.push(Span::raw(" "));
        } else {
            spans.push(Span::raw("# "));
        }

        let mut label = chat.label(me).to_string();
        while label.width() > inner_width.saturating_sub(8) && !label.is_empty() {
            label.pop();
        }
        let label_style = if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(label, label_style));

        if chat.unread_count > 0 {
            spans.push(Span::styled(
                format!(" ({})", chat.unread_count),
                Style::default().fg(Color::Yellow),
            ));
        }

        let line = if selected {
            Line::from(spans).style(Style::default().bg(Color::Rgb(40, 40, 40)))
        } else {
            Line::from(spans)
        };
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(Line::from("  (no chats)"));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_messages(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title("Messages")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(pane_border(app.active_pane == Pane::Messages));

    let me = app.store.current_user_id();
    let visible_rows = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.store.messages() {
        let own = msg.user_id == me;
        let sender = if own {
            "me".to_string()
        } else {
            msg.author
                .as_ref()
                .map(|a| a.label().to_string())
                .unwrap_or_else(|| msg.user_id.clone())
        };
        let sender_style = if own {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Green)
        };

        let mut spans = vec![
            Span::styled(
                format!("{} ", msg.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(format!("{}: ", sender), sender_style),
            Span::raw(msg.content.clone()),
        ];
        if msg.status == Delivery::Pending {
            spans.push(Span::styled(
                " (sending)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }

    // Typing indicator below the history.
    let typists = app.store.typists(Instant::now());
    if !typists.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} typing...", typists.join(", ")),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    // Keep the newest lines in view.
    let skip = lines.len().saturating_sub(visible_rows);
    let lines: Vec<Line> = lines.into_iter().skip(skip).collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_compose(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title("Compose")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(pane_border(app.active_pane == Pane::Compose));

    let content = if app.compose.input.is_empty() && app.active_pane != Pane::Compose {
        Line::from(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(app.compose.input.as_str())
    };

    frame.render_widget(Paragraph::new(content).block(block), area);

    if app.active_pane == Pane::Compose {
        let prefix: String = app
            .compose
            .input
            .chars()
            .take(app.compose.cursor_pos)
            .collect();
        let x = area.x + 1 + prefix.width() as u16;
        frame.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let text = if let Some(ref status) = app.status_line {
        Span::styled(status.clone(), Style::default().fg(Color::Red))
    } else if app.store.is_loading() {
        Span::styled("Loading...", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            "Tab: panes | Enter: open/send | PgUp: history | r: refresh | q: quit",
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(text)), area);
}
