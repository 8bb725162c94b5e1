use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::warn;
use crate::app::{App, FocusPane, InputMode};
use crate::config::Config;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
            app.poll_query_task().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_attach_prompt {
        handle_attach_prompt(app, key);
        return;
    }

    // Quick questions are one keystroke away from anywhere: F1..F4
    if let KeyCode::F(n @ 1..=4) = key.code {
        app.submit_quick(usize::from(n - 1));
        return;
    }

    if key.code == KeyCode::Char('o') && key.modifiers.contains(KeyModifiers::CONTROL) {
        if !app.is_busy() {
            app.open_attach_prompt();
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Tab cycles: Input -> QuickQuestions -> Transcript -> Input
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Input => FocusPane::QuickQuestions,
                FocusPane::QuickQuestions => FocusPane::Transcript,
                FocusPane::Transcript => FocusPane::Input,
            };
            if app.focus == FocusPane::Input && !app.is_busy() {
                app.input_mode = InputMode::Editing;
                app.input_cursor = app.exchange.draft().chars().count();
            }
        }

        KeyCode::Char('i') | KeyCode::Char('a') => {
            if !app.is_busy() {
                app.focus = FocusPane::Input;
                app.input_mode = InputMode::Editing;
                app.input_cursor = app.exchange.draft().chars().count();
            }
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::QuickQuestions => app.quick_nav_down(),
            _ => app.scroll_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::QuickQuestions => app.quick_nav_up(),
            _ => app.scroll_up(1),
        },
        KeyCode::Char('g') => app.transcript_scroll = 0,
        KeyCode::Char('G') => app.scroll_transcript_to_bottom(),
        KeyCode::PageDown => app.scroll_down(app.transcript_height.max(2) / 2),
        KeyCode::PageUp => app.scroll_up(app.transcript_height.max(2) / 2),

        KeyCode::Enter => {
            if app.focus == FocusPane::QuickQuestions {
                if let Some(i) = app.quick_state.selected() {
                    app.submit_quick(i);
                }
            }
        }

        // Drop the pending attachment
        KeyCode::Char('x') => {
            if !app.is_busy() {
                if let Some(doc) = app.exchange.detach() {
                    app.exchange.notices_mut().info(format!("Removed {}", doc.name()));
                }
            }
        }

        // Toggle Hindi labels and remember the choice
        KeyCode::Char('h') => {
            app.show_hindi = !app.show_hindi;
            let show_hindi = app.show_hindi;
            if let Err(err) = Config::update(|config| config.show_hindi = show_hindi) {
                warn!(error = %err, "could not save config");
            }
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // The input is disabled while a request is in flight
    if app.is_busy() {
        if key.code == KeyCode::Esc {
            app.input_mode = InputMode::Normal;
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_draft();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let draft = app.exchange.draft_mut();
                let byte_pos = char_to_byte_index(draft, app.input_cursor);
                draft.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let draft = app.exchange.draft_mut();
            if app.input_cursor < draft.chars().count() {
                let byte_pos = char_to_byte_index(draft, app.input_cursor);
                draft.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.exchange.draft().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.exchange.draft().chars().count();
        }
        KeyCode::Char(c) => {
            let draft = app.exchange.draft_mut();
            let byte_pos = char_to_byte_index(draft, app.input_cursor);
            draft.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_attach_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_attach_prompt(),
        KeyCode::Enter => app.confirm_attach_prompt(),
        KeyCode::Backspace => {
            if app.attach_cursor > 0 {
                app.attach_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
                app.attach_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.attach_cursor = app.attach_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.attach_input.chars().count();
            app.attach_cursor = (app.attach_cursor + 1).min(char_count);
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
            app.attach_input.insert(byte_pos, c);
            app.attach_cursor += 1;
        }
        _ => {}
    }
}

/// Pasted text lands in whichever field has the cursor. Dragging a file onto
/// most terminals pastes its path.
fn handle_paste(app: &mut App, text: &str) {
    let text = text.trim_end_matches(['\r', '\n']);
    if app.show_attach_prompt {
        let byte_pos = char_to_byte_index(&app.attach_input, app.attach_cursor);
        app.attach_input.insert_str(byte_pos, text);
        app.attach_cursor += text.chars().count();
    } else if app.input_mode == InputMode::Editing && !app.is_busy() {
        let draft = app.exchange.draft_mut();
        let byte_pos = char_to_byte_index(draft, app.input_cursor);
        draft.insert_str(byte_pos, text);
        app.input_cursor += text.chars().count();
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_sidebar = app.sidebar_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_transcript = app.transcript_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.quick_nav_down();
            } else if in_transcript {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.quick_nav_up();
            } else if in_transcript {
                app.scroll_up(3);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn app() -> App {
        App::new(&Config::new(), "http://127.0.0.1:1")
    }

    #[test]
    fn test_typing_edits_draft_at_cursor() {
        let mut app = app();
        for c in "fevr".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Char('e')));
        assert_eq!(app.exchange.draft(), "fever");
    }

    #[test]
    fn test_utf8_backspace() {
        let mut app = app();
        for c in "बुखार".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.exchange.draft(), "बुखा");
    }

    #[test]
    fn test_enter_on_empty_draft_does_nothing() {
        let mut app = app();
        let before = app.exchange.transcript().len();
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.exchange.transcript().len(), before);
        assert!(app.query_task.is_none());
    }

    #[tokio::test]
    async fn test_input_ignored_while_busy() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::F(2)));
        assert!(app.is_busy());

        app.input_mode = InputMode::Editing;
        handle_key(&mut app, key(KeyCode::Char('z')));
        handle_key(&mut app, key(KeyCode::F(1)));

        assert!(app.exchange.draft().is_empty());
        app.shutdown();
    }

    #[test]
    fn test_paste_into_attach_prompt() {
        let mut app = app();
        app.open_attach_prompt();
        handle_paste(&mut app, "/home/me/report.pdf\n");
        assert_eq!(app.attach_input, "/home/me/report.pdf");
    }
}
