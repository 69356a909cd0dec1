//! Input handling for the TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::Action;

/// Convert a crossterm key event to an Action.
pub fn handle_key_event(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Exit),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Esc | KeyCode::Backspace => Some(Action::Back),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Reload),
        KeyCode::Char('v') => Some(Action::CycleVersion),
        KeyCode::Char('s') => Some(Action::CycleState),
        KeyCode::Char('o') => Some(Action::CycleSort),
        KeyCode::Char('c') => Some(Action::ClearFilters),
        _ => None,
    }
}

/// Convert a crossterm Event to an Action.
pub fn handle_event(event: Event) -> Option<Action> {
    match event {
        Event::Key(key) => handle_key_event(key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn bindings() {
        assert_eq!(handle_event(key(KeyCode::Char('v'))), Some(Action::CycleVersion));
        assert_eq!(handle_event(key(KeyCode::Char('s'))), Some(Action::CycleState));
        assert_eq!(handle_event(key(KeyCode::Char('o'))), Some(Action::CycleSort));
        assert_eq!(handle_event(key(KeyCode::Char('c'))), Some(Action::ClearFilters));
        assert_eq!(handle_event(key(KeyCode::Char('r'))), Some(Action::Reload));
        assert_eq!(handle_event(key(KeyCode::Enter)), Some(Action::Select));
        assert_eq!(handle_event(key(KeyCode::Esc)), Some(Action::Back));
        assert_eq!(handle_event(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn ctrl_c_exits() {
        let event = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(handle_event(event), Some(Action::Exit));
    }
}
