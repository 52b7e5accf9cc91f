// SPDX-License-Identifier: MIT
use num_format::{Locale, ToFormattedString};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;

pub struct HeaderInfo<'a> {
    pub dataset: &'a str,
    pub current_frame: usize,
    pub total_frames: usize,
    pub spectra: usize,
    pub dark_corrected: bool,
}

pub fn render(frame: &mut ratatui::Frame, area: Rect, info: &HeaderInfo<'_>, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let version = env!("CARGO_PKG_VERSION");
    let dark = if info.dark_corrected { " | DARK" } else { "" };
    let text = format!(
        "spectraview v{version} | {} | Frame {}/{} | Spectra: {}{dark}",
        info.dataset,
        (info.current_frame + 1).to_formatted_string(&Locale::en),
        info.total_frames.to_formatted_string(&Locale::en),
        info.spectra.to_formatted_string(&Locale::en),
    );

    let line = Line::from(vec![Span::styled(
        format!("{text:<width$}", width = area.width as usize),
        theme.status_bar,
    )]);

    frame.render_widget(Paragraph::new(line), area);
}
