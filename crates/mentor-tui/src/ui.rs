use mentor_core::{Activity, ChatRole, Operation, MAX_RATING};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next(); // consume second *
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    // Message box grows with explicit line breaks, up to four lines
    let input_lines = app.message_input.split('\n').count().clamp(1, 4) as u16;
    let [chat_area, input_area, feedback_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_lines + 2),
        Constraint::Length(3),
    ])
    .areas(body_area);

    render_transcript(app, frame, chat_area);
    render_message_input(app, frame, input_area);
    render_feedback(app, frame, feedback_area);
    render_footer(app, frame, footer_area);

    if app.session.notice().is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Tech Mentor AI ", Style::default().fg(Color::Magenta).bold()),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().fg(Color::Black).bg(Color::Cyan),
        InputMode::Editing => Style::default().fg(Color::Black).bg(Color::Yellow),
    };
    let mode = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDITING ",
    };

    let hints = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::Input) => "Enter send  Alt+Enter newline  Tab next  Esc normal",
        (InputMode::Editing, _) => "Enter submit feedback  Tab next  Esc normal",
        (InputMode::Normal, FocusPane::Stars) => "←/→ stars  1-5 rate  Enter submit  Tab next  q quit",
        (InputMode::Normal, _) => "i edit  j/k scroll  1-5 rate  s submit feedback  Tab next  q quit",
    };

    let status = match app.session.activity() {
        Activity::Idle => Span::raw(""),
        Activity::Busy(Operation::Chat) => {
            Span::styled(" receiving reply ", Style::default().fg(Color::Yellow))
        }
        Activity::Busy(Operation::Feedback) => {
            Span::styled(" sending feedback ", Style::default().fg(Color::Yellow))
        }
    };

    let footer = Line::from(vec![
        Span::styled(mode, mode_style),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
        status,
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Transcript;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let awaiting = app.session.awaiting_first_chunk();
    let message_count = app.session.messages().len();
    let mut lines: Vec<Line> = Vec::new();

    for (i, msg) in app.session.messages().iter().enumerate() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Mentor:",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                )));
                if awaiting && i + 1 == message_count {
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("Thinking{}", dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                } else {
                    // Split response into lines and parse markdown
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_message_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let editing = focused && app.input_mode == InputMode::Editing;
    let busy = app.session.is_busy();

    let border_color = if busy {
        Color::DarkGray
    } else if editing || focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if busy {
        " Waiting for the mentor... "
    } else {
        " Message (Enter to send) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Cursor position as (line, column) within the typed text
    let before_cursor: String = app.message_input.chars().take(app.message_cursor).collect();
    let cursor_line = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0);

    // Keep the cursor visible: scroll vertically by lines, horizontally by chars
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let line_offset = if inner_height == 0 {
        0
    } else {
        (cursor_line + 1).saturating_sub(inner_height)
    };
    let col_offset = if inner_width == 0 || cursor_col < inner_width {
        0
    } else {
        cursor_col - inner_width + 1
    };

    let visible: Vec<Line> = app
        .message_input
        .split('\n')
        .skip(line_offset)
        .take(inner_height.max(1))
        .map(|l| Line::from(l.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let text_color = if busy { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible)
        .style(Style::default().fg(text_color))
        .block(block);
    frame.render_widget(input, area);

    // Show cursor when editing
    if editing && !busy {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            area.y + 1 + (cursor_line - line_offset) as u16,
        ));
    }
}

fn render_feedback(app: &mut App, frame: &mut Frame, area: Rect) {
    let [stars_area, text_area] = Layout::horizontal([
        Constraint::Length(MAX_RATING as u16 * 2 + 3),
        Constraint::Min(0),
    ])
    .areas(area);
    app.stars_area = Some(stars_area);

    // Star row
    let stars_focused = app.focus == FocusPane::Stars;
    let submitting = app.feedback_in_flight();
    let rating = app.session.draft().rating();
    let filled = if submitting { Color::DarkGray } else { Color::Yellow };
    let stars: Vec<Span> = (1..=MAX_RATING)
        .map(|n| {
            if n <= rating {
                Span::styled("★ ", Style::default().fg(filled))
            } else {
                Span::styled("☆ ", Style::default().fg(Color::DarkGray))
            }
        })
        .collect();
    let stars_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if stars_focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Rate ");
    frame.render_widget(Paragraph::new(Line::from(stars)).block(stars_block), stars_area);

    // Feedback text
    let text_focused = app.focus == FocusPane::Feedback;
    let locked = app.inputs_locked();
    let editing = text_focused && app.input_mode == InputMode::Editing;
    let text_border = if text_focused && !locked {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let text_title = if submitting {
        " Sending feedback... "
    } else {
        " Feedback (Enter to submit) "
    };
    let text_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(text_border))
        .title(text_title);

    let inner_width = text_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.feedback_cursor;
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };
    let draft_text = &app.session.draft().text;
    let visible_text: String = if draft_text.is_empty() && !editing {
        String::new()
    } else {
        draft_text.chars().skip(scroll_offset).take(inner_width).collect()
    };

    let paragraph = if visible_text.is_empty() && !editing {
        Paragraph::new(Span::styled(
            "How was your experience?",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let text_color = if locked { Color::DarkGray } else { Color::Cyan };
        Paragraph::new(visible_text).style(Style::default().fg(text_color))
    };
    frame.render_widget(paragraph.block(text_block), text_area);

    if editing && !locked {
        frame.set_cursor_position((
            text_area.x + 1 + (cursor_pos - scroll_offset) as u16,
            text_area.y + 1,
        ));
    }
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = app.session.notice() else {
        return;
    };

    let message = notice.message();
    let width = (message.chars().count() as u16 + 6).min(area.width);
    let height = 5u16.min(area.height);
    let popup = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    let color = if notice.is_error() { Color::Red } else { Color::Green };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(" Feedback ");

    let text = Text::from(vec![
        Line::from(Span::styled(message, Style::default().fg(color).bold())),
        Line::default(),
        Line::from(Span::styled("press any key", Style::default().fg(Color::DarkGray))),
    ]);

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(block).alignment(ratatui::layout::Alignment::Center),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{test_app, CannedTransport};
    use mentor_core::IngestStep;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("Focus on **projects** first");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "projects");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("5 ** 2");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "5 ** 2");
    }

    #[tokio::test]
    async fn test_render_shows_greeting_and_thinking() {
        let (mut app, _rx) = test_app(CannedTransport::default());
        let screen = screen_text(&mut app);
        assert!(screen.contains("Tech Mentor AI"));
        assert!(screen.contains("Hi!"));
        assert!(!screen.contains("Thinking"));

        app.message_input = "intern advice?".to_string();
        app.send_message();
        let screen = screen_text(&mut app);
        assert!(screen.contains("intern advice?"));
        assert!(screen.contains("Thinking."));
        assert!(screen.contains("Waiting for the mentor"));

        app.apply_reply(IngestStep::Chunk("Sure".to_string()));
        let screen = screen_text(&mut app);
        assert!(screen.contains("Sure"));
        assert!(!screen.contains("Thinking"));
    }

    #[tokio::test]
    async fn test_render_feedback_box_while_submitting() {
        let (mut app, _rx) = test_app(CannedTransport::default());
        app.session.draft_mut().text = "great".to_string();
        app.submit_feedback();

        let screen = screen_text(&mut app);
        assert!(screen.contains("Sending feedback..."));
        assert!(screen.contains("great"));
    }

    #[test]
    fn test_render_stars_reflect_rating() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = App::new(
            &mentor_core::Config::new(),
            std::sync::Arc::new(CannedTransport::default()),
            tx,
        );
        app.session.draft_mut().set_rating(3);
        let screen = screen_text(&mut app);
        assert_eq!(screen.matches('★').count(), 3);
        assert_eq!(screen.matches('☆').count(), 2);
    }
}
