use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(step) => app.apply_reply(step),
        AppEvent::FeedbackDone(result) => app.finish_feedback(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Any key dismisses the feedback notice
    if app.session.dismiss_notice().is_some() {
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Focus
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.prev(),

        // Start typing in the focused box, or submit from the stars
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.focus.is_text_input() {
                app.input_mode = InputMode::Editing;
            } else if app.focus == FocusPane::Stars && key.code == KeyCode::Enter {
                app.submit_feedback();
            }
        }
        KeyCode::Char('s') => app.submit_feedback(),

        // Rating
        KeyCode::Char(c @ '0'..='5') => {
            let rating = c.to_digit(10).unwrap_or(0) as u8;
            app.set_rating(rating);
        }
        KeyCode::Char('h') | KeyCode::Left if app.focus == FocusPane::Stars => {
            app.star_down();
        }
        KeyCode::Char('l') | KeyCode::Right if app.focus == FocusPane::Stars => {
            app.star_up();
        }

        // Transcript scrolling
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }
    if key.code == KeyCode::Tab {
        app.focus = app.focus.next();
        if !app.focus.is_text_input() {
            app.input_mode = InputMode::Normal;
        }
        return;
    }

    // Read-only until the in-flight request settles
    if app.inputs_locked() {
        return;
    }

    match app.focus {
        FocusPane::Input => handle_message_editing(app, key),
        FocusPane::Feedback => handle_feedback_editing(app, key),
        FocusPane::Stars | FocusPane::Transcript => app.input_mode = InputMode::Normal,
    }
}

fn handle_message_editing(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        // Shift/Alt+Enter starts a new line, plain Enter sends
        if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
            insert_char(&mut app.message_input, &mut app.message_cursor, '\n');
        } else {
            app.send_message();
        }
        return;
    }
    edit_text(&mut app.message_input, &mut app.message_cursor, key);
}

fn handle_feedback_editing(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.submit_feedback();
        app.input_mode = InputMode::Normal;
        return;
    }
    let mut cursor = app.feedback_cursor;
    edit_text(&mut app.session.draft_mut().text, &mut cursor, key);
    app.feedback_cursor = cursor;
}

fn insert_char(text: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert(byte_pos, c);
    *cursor += 1;
}

/// Cursor movement and character editing shared by both text boxes
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    let char_count = text.chars().count();
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) => insert_char(text, cursor, c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let over_chat = app.chat_area.is_some_and(|area| point_in_rect(x, y, area));

    match mouse.kind {
        MouseEventKind::ScrollDown if over_chat => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp if over_chat => {
            app.chat_scroll = app.chat_scroll.saturating_sub(3);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if app.stars_area.is_some_and(|area| point_in_rect(x, y, area)) {
                app.focus = FocusPane::Stars;
                app.input_mode = InputMode::Normal;
                app.set_rating_from_click(x);
            }
        }
        _ => {}
    }
}
