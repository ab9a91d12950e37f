use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_STEP: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply a line-editing key to `text` with a character cursor. Returns
/// `false` for keys that are not editing keys.
fn edit_text(text: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match code {
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
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
        _ => return false,
    }
    true
}

/// Insert pasted text at the cursor, flattening newlines to spaces.
fn paste_text(text: &mut String, cursor: &mut usize, pasted: &str) {
    *cursor = (*cursor).min(text.chars().count());
    let flattened: String = pasted
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert_str(byte_pos, &flattened);
    *cursor += flattened.chars().count();
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }

    app.poll_reply().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any pane
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Store => handle_store_key(app, key),
        FocusPane::Question => handle_question_key(app, key),
        FocusPane::Log => handle_log_key(app, key),
    }
}

fn handle_store_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.focus = FocusPane::Log,
        KeyCode::Enter => app.focus = FocusPane::Question,
        code => {
            let cursor = &mut app.store_cursor;
            app.session.edit_store_url(|url| {
                edit_text(url, cursor, code);
            });
        }
    }
}

fn handle_question_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.focus = FocusPane::Log,
        KeyCode::Enter => {
            if !app.submit() {
                debug!(busy = app.session.is_busy(), "submit ignored");
            }
        }
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::PageDown => app.scroll_half_page_down(),
        code => {
            let cursor = &mut app.draft_cursor;
            // Rejected while a request is outstanding
            app.session.edit_draft(|draft| {
                edit_text(draft, cursor, code);
            });
        }
    }
}

fn handle_log_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down()
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up()
        }
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('i') | KeyCode::Enter => app.focus = FocusPane::Question,
        KeyCode::Char('s') => app.focus = FocusPane::Store,
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match app.focus {
        FocusPane::Store => {
            let cursor = &mut app.store_cursor;
            app.session.edit_store_url(|url| paste_text(url, cursor, text));
        }
        FocusPane::Question => {
            let cursor = &mut app.draft_cursor;
            app.session.edit_draft(|draft| paste_text(draft, cursor, text));
        }
        FocusPane::Log => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    match mouse.kind {
        // The log is the only scrollable pane
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_STEP),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_STEP),
        MouseEventKind::Down(MouseButton::Left) => {
            let hit = |area: Option<Rect>| area.is_some_and(|r| point_in_rect(x, y, r));
            if hit(app.store_area) {
                app.focus = FocusPane::Store;
            } else if hit(app.question_area) {
                app.focus = FocusPane::Question;
            } else if hit(app.log_area) {
                app.focus = FocusPane::Log;
            }
        }
        _ => {}
    }
}
