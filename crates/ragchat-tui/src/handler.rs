use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

const SCROLL_STEP: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => {
            if !app.show_clear_confirm {
                app.insert_str(&text);
            }
        }
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_clear_confirm {
        handle_clear_confirm(app, key);
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            if app.notice.is_some() {
                app.notice = None;
            } else {
                app.should_quit = true;
            }
        }

        // Enter submits; a held modifier means a line break instead
        KeyCode::Enter => {
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                app.insert_char('\n');
            } else {
                app.submit();
            }
        }

        KeyCode::Char('l') if ctrl => app.request_clear(),
        KeyCode::Char('e') if ctrl => app.export(),
        KeyCode::Char('u') if ctrl => app.scroll_up(app.chat_height / 2),
        KeyCode::Char('d') if ctrl => app.scroll_down(app.chat_height / 2),

        // Chat scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),

        // Input editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) if !ctrl => app.insert_char(c),

        _ => {}
    }
}

fn handle_clear_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_clear(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_clear(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(SCROLL_STEP),
        MouseEventKind::ScrollUp => app.scroll_up(SCROLL_STEP),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use std::path::PathBuf;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, modifiers))
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_shift_enter_inserts_newline() {
        let mut app = test_app(PathBuf::from("."));
        type_text(&mut app, "line one").await;
        handle_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::SHIFT)).await.unwrap();
        type_text(&mut app, "line two").await;

        assert_eq!(app.input, "line one\nline two");
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_enter_submits() {
        let mut app = test_app(PathBuf::from("."));
        type_text(&mut app, "question").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert!(app.input.is_empty());
        assert_eq!(app.store.len(), 1);
        assert!(app.is_awaiting());
    }

    #[tokio::test]
    async fn test_enter_on_blank_input_does_nothing() {
        let mut app = test_app(PathBuf::from("."));
        type_text(&mut app, "   ").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.input, "   ");
        assert!(app.store.is_empty());
        assert!(!app.is_awaiting());
    }

    #[tokio::test]
    async fn test_clear_popup_swallows_keys() {
        let mut app = test_app(PathBuf::from("."));
        app.store.append_message(ragchat_core::Role::User, "kept?");

        handle_event(&mut app, key_with(KeyCode::Char('l'), KeyModifiers::CONTROL)).await.unwrap();
        assert!(app.show_clear_confirm);

        type_text(&mut app, "x").await;
        assert!(app.input.is_empty());
        assert!(app.show_clear_confirm);

        handle_event(&mut app, key(KeyCode::Char('n'))).await.unwrap();
        assert!(!app.show_clear_confirm);
        assert_eq!(app.store.len(), 1);

        handle_event(&mut app, key_with(KeyCode::Char('l'), KeyModifiers::CONTROL)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('y'))).await.unwrap();
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = test_app(PathBuf::from("."));
        handle_event(&mut app, key_with(KeyCode::Char('c'), KeyModifiers::CONTROL)).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_esc_dismisses_notice_before_quitting() {
        let mut app = test_app(PathBuf::from("."));
        app.set_notice("hi", crate::app::NoticeKind::Info);

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(app.notice.is_none());
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(app.should_quit);
    }
}
