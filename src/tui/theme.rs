// SPDX-License-Identifier: MIT
use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub border_normal: Style,
    pub border_selected: Style,
    pub title: Style,
    pub status_bar: Style,
    pub status_info: Style,
    pub status_error: Style,
    pub spectrum_line: Style,
    pub axis: Style,
    pub field_default: Style,
    pub field_selected: Style,
    pub editing: Style,
    pub delta_far: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_normal: Style::default().fg(Color::White),
            border_selected: Style::default().fg(Color::Cyan),
            title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            status_bar: Style::default().fg(Color::Black).bg(Color::White),
            status_info: Style::default().fg(Color::Green),
            status_error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            spectrum_line: Style::default().fg(Color::Magenta),
            axis: Style::default().fg(Color::Gray),
            field_default: Style::default().fg(Color::DarkGray),
            field_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            editing: Style::default().fg(Color::Yellow),
            delta_far: Style::default().fg(Color::Yellow),
        }
    }
}

pub const SELECTED_MARKER: [char; 2] = ['\u{2610}', '\u{2611}'];
pub const COLLAPSED_MARKER: [char; 2] = ['\u{25BC}', '\u{25BA}'];
