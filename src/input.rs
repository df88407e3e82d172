//! Key bindings: arrows and vim-style cursor movement.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Pick the cell under the cursor, or confirm in menus.
    Select,
    /// Drop the current pick, or back out of a menu.
    Cancel,
    Restart,
    Next,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') => Action::Quit,
        KeyCode::Esc | KeyCode::Backspace => Action::Cancel,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Char('n' | 'N') => Action::Next,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_and_vim_agree() {
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::Left);
        assert_eq!(key_to_action(key(KeyCode::Char('h'))), Action::Left);
        assert_eq!(key_to_action(key(KeyCode::Down)), Action::Down);
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Action::Down);
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::ALT)),
            Action::None
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Action::Restart
        );
    }
}
