use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    SelectShow,
    RefreshShows,
    ToggleList,
    ToggleEmptyState,
    OpenImage,
    WriteReview,
    ShowHelp,
    HideHelp,
    // Profile popup actions
    ShowProfile,
    HideProfile,
    ChangeAvatar,
    Logout,
    ConfirmLogout,
    CancelLogout,
    // Text input actions (avatar path, review)
    InputChar(char),
    InputBackspace,
    InputConfirm,
    InputCancel,
}

/// Which overlay currently owns the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyContext {
    #[default]
    Normal,
    Help,
    Input,
    Profile,
    ConfirmLogout,
}

pub fn handle_key_event(key: KeyEvent, context: KeyContext) -> Option<AppAction> {
    match context {
        // If help is showing, any key closes it
        KeyContext::Help => Some(AppAction::HideHelp),

        KeyContext::Input => match key.code {
            KeyCode::Enter => Some(AppAction::InputConfirm),
            KeyCode::Esc => Some(AppAction::InputCancel),
            KeyCode::Backspace => Some(AppAction::InputBackspace),
            KeyCode::Char(c) => Some(AppAction::InputChar(c)),
            _ => None,
        },

        KeyContext::ConfirmLogout => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(AppAction::ConfirmLogout),
            KeyCode::Char('n') | KeyCode::Esc => Some(AppAction::CancelLogout),
            _ => None,
        },

        KeyContext::Profile => match key.code {
            KeyCode::Char('a') => Some(AppAction::ChangeAvatar),
            KeyCode::Char('l') => Some(AppAction::Logout),
            KeyCode::Char('p') | KeyCode::Esc => Some(AppAction::HideProfile),
            _ => None,
        },

        KeyContext::Normal => match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(AppAction::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
            (KeyCode::Char('<'), _) => Some(AppAction::MoveToTop),
            (KeyCode::Char('>'), _) => Some(AppAction::MoveToBottom),

            (KeyCode::Enter, _) => Some(AppAction::SelectShow),

            (KeyCode::Char('r'), _) => Some(AppAction::RefreshShows),
            (KeyCode::Char('t'), _) => Some(AppAction::ToggleList),
            (KeyCode::Char('e'), _) => Some(AppAction::ToggleEmptyState),
            (KeyCode::Char('o'), _) => Some(AppAction::OpenImage),
            (KeyCode::Char('w'), _) => Some(AppAction::WriteReview),
            (KeyCode::Char('p'), _) => Some(AppAction::ShowProfile),

            (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn help_swallows_any_key() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), KeyContext::Help),
            Some(AppAction::HideHelp)
        );
    }

    #[test]
    fn input_mode_captures_characters() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), KeyContext::Input),
            Some(AppAction::InputChar('q'))
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Enter), KeyContext::Input),
            Some(AppAction::InputConfirm)
        );
    }

    #[test]
    fn normal_mode_bindings() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('t')), KeyContext::Normal),
            Some(AppAction::ToggleList)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Down), KeyContext::Normal),
            Some(AppAction::MoveDown)
        );
        assert_eq!(
            handle_key_event(
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
                KeyContext::Normal
            ),
            Some(AppAction::Quit)
        );
        assert_eq!(handle_key_event(key(KeyCode::Char('z')), KeyContext::Normal), None);
    }

    #[test]
    fn logout_needs_confirmation() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('l')), KeyContext::Profile),
            Some(AppAction::Logout)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('y')), KeyContext::ConfirmLogout),
            Some(AppAction::ConfirmLogout)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Esc), KeyContext::ConfirmLogout),
            Some(AppAction::CancelLogout)
        );
    }
}
