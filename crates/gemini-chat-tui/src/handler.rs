use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, Screen};
use crate::tui::AppEvent;

const PAGE: u16 = 10;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on every screen
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    if key.code == KeyCode::Esc {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::ApiKey => handle_api_key(app, key),
        Screen::Chat => handle_chat(app, key),
    }
}

fn handle_api_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if !app.api_key_input.is_empty() {
                app.submit_api_key();
            }
        }
        KeyCode::Backspace => {
            app.api_key_input.pop();
        }
        KeyCode::Char(c) => app.api_key_input.push(c),
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit(),

        // Line editing
        KeyCode::Char(c) => app.session.insert_char(c),
        KeyCode::Backspace => app.session.backspace(),
        KeyCode::Delete => app.session.delete(),
        KeyCode::Left => app.session.cursor_left(),
        KeyCode::Right => app.session.cursor_right(),
        KeyCode::Home => app.session.cursor_home(),
        KeyCode::End => app.session.cursor_end(),

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(PAGE),
        KeyCode::PageDown => app.scroll_down(PAGE),

        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemini_chat_core::Config;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = App::new(Config::new(), None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_event(&mut app, AppEvent::Key(ctrl_c));
        assert!(app.should_quit);
    }

    #[test]
    fn test_esc_quits_from_key_prompt() {
        let mut app = App::new(Config::new(), None);
        handle_event(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn test_api_key_typing() {
        let mut app = App::new(Config::new(), None);
        type_text(&mut app, "abcd");
        handle_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.api_key_input, "abc");
    }

    #[test]
    fn test_enter_with_empty_key_does_nothing() {
        let mut app = App::new(Config::new(), None);
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::ApiKey);
        assert!(app.api_key_error.is_none());
    }

    #[test]
    fn test_chat_editing_keys() {
        let mut app = App::new(Config::new(), None);
        app.screen = Screen::Chat;
        type_text(&mut app, "helo");
        handle_event(&mut app, key(KeyCode::Left));
        type_text(&mut app, "l");
        assert_eq!(app.session.input(), "hello");

        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        assert_eq!(app.session.input(), "ello");
    }

    #[test]
    fn test_enter_without_relay_keeps_input() {
        let mut app = App::new(Config::new(), None);
        app.screen = Screen::Chat;
        type_text(&mut app, "hi");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.input(), "hi");
        assert!(app.session.transcript().is_empty());
    }

    #[test]
    fn test_tick_only_animates_while_pending() {
        let mut app = App::new(Config::new(), None);
        handle_event(&mut app, AppEvent::Tick);
        assert_eq!(app.animation_frame, 0);
    }
}
