use chrono::{ DateTime, Local };
use ratatui::layout::{ Alignment, Constraint, Layout, Rect };
use ratatui::style::{ Color, Modifier, Style };
use ratatui::text::{ Line, Span };
use ratatui::widgets::{ Block, Clear, Paragraph, Wrap };
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::ChatScreen;
use crate::client::notice::ToastLevel;
use crate::client::ChatSession;
use crate::models::chat::{ Role, Turn };

const ACCENT: Color = Color::LightMagenta;
const HELP: &str = "Enter send · Shift+Enter newline · ↑/↓/PgUp/PgDn scroll · End bottom · Ctrl+T tip · Ctrl+C quit";

pub(super) fn draw(frame: &mut Frame, screen: &mut ChatScreen) {
    let [header, transcript, status, input, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(2),
    ]).areas(frame.area());

    draw_header(frame, &screen.session, header);
    draw_transcript(frame, screen, transcript);
    draw_status(frame, &screen.session, status);
    draw_input(frame, &screen.session, input);
    draw_footer(frame, &screen.session, footer);
    draw_toasts(frame, screen, input);

    if screen.tip_open {
        draw_tip_dialog(frame, &screen.session);
    }
}

fn draw_header(frame: &mut Frame, session: &ChatSession, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            session.persona().name.clone(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        ),
        Span::raw("  💖"),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn turn_time(turn: &Turn) -> String {
    DateTime::from_timestamp(turn.timestamp, 0)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn transcript_lines(session: &ChatSession) -> Vec<Line<'static>> {
    let name = session.persona().name.clone();
    let mut lines = Vec::new();

    for turn in session.turns() {
        let (speaker, alignment, body_style) = match turn.role {
            Role::User => ("You".to_string(), Alignment::Right, Style::default().fg(ACCENT)),
            Role::Assistant => (name.clone(), Alignment::Left, Style::default()),
            Role::System => {
                continue;
            }
        };

        lines.push(
            Line::from(
                vec![
                    Span::styled(speaker, Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" · {}", turn_time(turn)), Style::default().fg(Color::DarkGray))
                ]
            ).alignment(alignment)
        );
        for content_line in turn.content.split('\n') {
            lines.push(
                Line::from(Span::styled(content_line.to_string(), body_style)).alignment(alignment)
            );
        }
        lines.push(Line::from(""));
    }

    lines
}

fn draw_transcript(frame: &mut Frame, screen: &mut ChatScreen, area: Rect) {
    let block = Block::bordered().border_style(Style::default().fg(ACCENT));
    let inner = block.inner(area);
    let lines = transcript_lines(&screen.session);

    let content_height = Paragraph::new(lines.clone()).wrap(Wrap { trim: false }).line_count(inner.width);
    screen.scroll.update_layout(
        u16::try_from(content_height).unwrap_or(u16::MAX),
        inner.height
    );

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((screen.scroll.offset(), 0));
    frame.render_widget(paragraph, area);

    if screen.scroll.is_detached() && inner.width > 12 && inner.height > 0 {
        let label = " ↓ End ";
        let width = label.width() as u16;
        let jump = Rect::new(inner.right() - width, inner.bottom() - 1, width, 1);
        frame.render_widget(
            Paragraph::new(label).style(Style::default().fg(Color::White).bg(ACCENT)),
            jump
        );
    }
}

fn draw_status(frame: &mut Frame, session: &ChatSession, area: Rect) {
    let line = if let Some(notice) = session.error_notice() {
        Line::from(vec![
            Span::styled(notice.to_string(), Style::default().fg(Color::Red)),
            Span::styled("  (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
        ])
    } else if session.is_loading() {
        Line::from(
            Span::styled(
                format!("{} is typing • • •", session.persona().name),
                Style::default().fg(ACCENT).add_modifier(Modifier::ITALIC)
            )
        )
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_input(frame: &mut Frame, session: &ChatSession, area: Rect) {
    let title = if session.is_loading() { " Waiting for reply... " } else { " Type your message... " };
    let block = Block::bordered().title(title).border_style(Style::default().fg(ACCENT));
    let inner = block.inner(area);

    let last_line = session.input().rsplit('\n').next().unwrap_or("");
    let hidden_rows = session.input().matches('\n').count() as u16;
    frame.render_widget(
        Paragraph::new(session.input().to_string()).block(block).scroll((hidden_rows, 0)),
        area
    );

    if inner.width > 0 {
        let cursor_x = (last_line.width() as u16).min(inner.width - 1);
        frame.set_cursor_position((inner.x + cursor_x, inner.y));
    }
}

fn draw_footer(frame: &mut Frame, session: &ChatSession, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(session.persona().disclaimer.clone(), Style::default().fg(ACCENT))),
        Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_toasts(frame: &mut Frame, screen: &ChatScreen, anchor: Rect) {
    let mut bottom = anchor.y;
    for toast in screen.toasts.visible() {
        if bottom < 3 {
            break;
        }
        let color = match toast.level {
            ToastLevel::Success => Color::Green,
            ToastLevel::Error => Color::Red,
        };
        let width = ((toast.message.width() as u16) + 4).min(anchor.width);
        let area = Rect::new(anchor.x + (anchor.width - width) / 2, bottom - 3, width, 3);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(toast.message.clone())
                .alignment(Alignment::Center)
                .block(Block::bordered().border_style(Style::default().fg(color))),
            area
        );
        bottom -= 3;
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height
    )
}

fn draw_tip_dialog(frame: &mut Frame, session: &ChatSession) {
    let persona = session.persona();
    let area = centered(frame.area(), 64, 10);
    let lines = vec![
        Line::from(""),
        Line::from(
            Span::styled(persona.tip_address.clone(), Style::default().add_modifier(Modifier::BOLD))
        ),
        Line::from(""),
        Line::from(persona.tip_note.clone()),
        Line::from(""),
        Line::from(Span::styled("[c] copy address    [Esc] close", Style::default().fg(Color::DarkGray))),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(format!(" Tip {} 💖 ", persona.name))
                    .border_style(Style::default().fg(ACCENT))
            ),
        area
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::persona::PersonaConfig;
    use crate::client::StreamEvent;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn renders_greeting_and_reply() {
        let mut screen = ChatScreen::new(Arc::new(PersonaConfig::default()));
        screen.session.set_input("hi");
        screen.session.submit();
        screen.session.apply(StreamEvent::Fragment("Hey there!".to_string()));

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw(frame, &mut screen)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("Nadiya"));
        assert!(text.contains("Hey there!"));
        assert!(text.contains("is typing"));
    }

    #[test]
    fn system_turns_are_not_rendered() {
        let session = ChatSession::new(Arc::new(PersonaConfig::default()));
        let lines = transcript_lines(&session);
        // speaker header, greeting body, spacer
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn tip_dialog_shows_address() {
        let mut screen = ChatScreen::new(Arc::new(PersonaConfig::default()));
        screen.tip_open = true;

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw(frame, &mut screen)).unwrap();

        assert!(buffer_text(&terminal).contains(&PersonaConfig::default().tip_address));
    }
}
