// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use super::theme::Theme;

const SPEED_STEPS: [f64; 7] = [0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0];
const DEFAULT_SPEED_INDEX: usize = 2; // 1.0x

/// Position and transport state shown in the playback bar. The frame pacer
/// follows these values each tick.
pub struct PlaybackControls {
    pub speed: f64,
    pub paused: bool,
    pub current_frame: usize,
    pub total_frames: usize,
    speed_index: usize,
}

impl PlaybackControls {
    #[must_use]
    pub fn new(total_frames: usize) -> Self {
        Self {
            speed: SPEED_STEPS[DEFAULT_SPEED_INDEX],
            paused: true,
            current_frame: 0,
            total_frames,
            speed_index: DEFAULT_SPEED_INDEX,
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn speed_up(&mut self) {
        if self.speed_index + 1 < SPEED_STEPS.len() {
            self.speed_index += 1;
            self.speed = SPEED_STEPS[self.speed_index];
        }
    }

    pub fn speed_down(&mut self) {
        if self.speed_index > 0 {
            self.speed_index -= 1;
            self.speed = SPEED_STEPS[self.speed_index];
        }
    }

    pub fn step_forward(&mut self) {
        self.jump_to(self.current_frame + 1);
    }

    pub fn step_backward(&mut self) {
        self.current_frame = self.current_frame.saturating_sub(1);
    }

    pub fn jump_start(&mut self) {
        self.current_frame = 0;
    }

    pub fn jump_end(&mut self) {
        self.current_frame = self.total_frames.saturating_sub(1);
    }

    /// Moves to `index`, clamped to the last frame.
    pub fn jump_to(&mut self, index: usize) {
        self.current_frame = index.min(self.total_frames.saturating_sub(1));
    }

    pub fn update_position(&mut self, index: usize) {
        self.current_frame = index;
    }

    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        if self.total_frames <= 1 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.current_frame as f64 / (self.total_frames - 1) as f64;
        fraction
    }
}

/// `mm:ss.mmm`; negative offsets clamp to zero.
fn format_time(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_millis / 60_000;
    let secs = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;
    format!("{minutes:02}:{secs:02}.{millis:03}")
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    controls: &PlaybackControls,
    current_time: f64,
    total_time: f64,
    theme: &Theme,
) {
    if area.height < 4 || area.width < 20 {
        return;
    }

    let block = Block::default()
        .title(" Playback ")
        .borders(Borders::ALL)
        .border_style(theme.border_normal)
        .title_style(theme.title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 || inner.width < 10 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let status_icon = if controls.paused {
        "\u{23F8}"
    } else {
        "\u{25B6}"
    };

    let gauge_label = format!(
        " {status_icon} {:.2}x  {} / {}",
        controls.speed,
        format_time(current_time),
        format_time(total_time)
    );
    let gauge = Gauge::default()
        .ratio(controls.progress_fraction().clamp(0.0, 1.0))
        .label(gauge_label)
        .gauge_style(theme.border_selected);

    frame.render_widget(gauge, rows[0]);

    let help = Line::from(vec![
        Span::styled("[Space]", theme.title),
        Span::raw(" Play  "),
        Span::styled("[\u{2190}/\u{2192}]", theme.title),
        Span::raw(" Step  "),
        Span::styled("[[/]]", theme.title),
        Span::raw(" Speed  "),
        Span::styled("[f]", theme.title),
        Span::raw(" First spectrum  "),
        Span::styled("[e/a/d]", theme.title),
        Span::raw(" Edit  "),
        Span::styled("[s]", theme.title),
        Span::raw(" Export  "),
        Span::styled("[r]", theme.title),
        Span::raw(" Reload"),
    ]);
    frame.render_widget(Paragraph::new(help), rows[1]);
}
