// SPDX-License-Identifier: MIT
use crossterm::event::KeyCode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    PanelUp,
    PanelDown,
    ToggleCollapse,
    TogglePause,
    StepForward,
    StepBackward,
    SpeedUp,
    SpeedDown,
    JumpStart,
    JumpEnd,
    JumpFirstSpectral,
    Export,
    Reload,
    NextField,
    EditField,
    AddField,
    DeleteField,
    Input(char),
    Backspace,
    Commit,
    Cancel,
    None,
}

/// Maps a key press to an action. While a metadata field is being edited,
/// printable keys go to the edit buffer instead of the viewer.
#[must_use]
pub fn handle_key(key: KeyCode, editing: bool) -> Action {
    if editing {
        return match key {
            KeyCode::Enter => Action::Commit,
            KeyCode::Esc => Action::Cancel,
            KeyCode::Backspace => Action::Backspace,
            KeyCode::Char(c) => Action::Input(c),
            _ => Action::None,
        };
    }

    match key {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Up => Action::PanelUp,
        KeyCode::Down => Action::PanelDown,
        KeyCode::Enter => Action::ToggleCollapse,
        KeyCode::Right | KeyCode::Char('.') => Action::StepForward,
        KeyCode::Left | KeyCode::Char(',') => Action::StepBackward,
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char(']') => Action::SpeedUp,
        KeyCode::Char('[') => Action::SpeedDown,
        KeyCode::Home => Action::JumpStart,
        KeyCode::End => Action::JumpEnd,
        KeyCode::Char('f') => Action::JumpFirstSpectral,
        KeyCode::Char('s') => Action::Export,
        KeyCode::Char('r') => Action::Reload,
        KeyCode::Tab => Action::NextField,
        KeyCode::Char('e') => Action::EditField,
        KeyCode::Char('a') => Action::AddField,
        KeyCode::Char('d') => Action::DeleteField,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_keys() {
        assert_eq!(handle_key(KeyCode::Char('q'), false), Action::Quit);
        assert_eq!(handle_key(KeyCode::Right, false), Action::StepForward);
        assert_eq!(handle_key(KeyCode::Char(','), false), Action::StepBackward);
        assert_eq!(handle_key(KeyCode::Enter, false), Action::ToggleCollapse);
        assert_eq!(handle_key(KeyCode::Char('f'), false), Action::JumpFirstSpectral);
        assert_eq!(handle_key(KeyCode::Char('x'), false), Action::None);
    }

    #[test]
    fn editing_captures_text() {
        assert_eq!(handle_key(KeyCode::Char('q'), true), Action::Input('q'));
        assert_eq!(handle_key(KeyCode::Enter, true), Action::Commit);
        assert_eq!(handle_key(KeyCode::Esc, true), Action::Cancel);
        assert_eq!(handle_key(KeyCode::Backspace, true), Action::Backspace);
        assert_eq!(handle_key(KeyCode::Right, true), Action::None);
    }
}
