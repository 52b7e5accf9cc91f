// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::session::{FrameRecord, SpectralSample};
use crate::sync::SyncError;
use crate::tui::theme::Theme;

/// Offsets beyond this are highlighted as a loose match.
const FAR_DELTA_SECONDS: f64 = 0.1;

fn delta_line<'a>(frame: &FrameRecord, sample: &SpectralSample, theme: &Theme) -> Line<'a> {
    let delta = sample.timestamp - frame.timestamp;
    let text = format!("{:+.3} ms", delta * 1000.0);
    let span = if delta.abs() > FAR_DELTA_SECONDS {
        Span::styled(text, theme.delta_far)
    } else {
        Span::raw(text)
    };
    Line::from(vec![Span::raw("          Delta: "), span])
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    record: &FrameRecord,
    total_frames: usize,
    nearest: &Result<&SpectralSample, SyncError>,
    dark_applied: bool,
    theme: &Theme,
) {
    if area.height < 1 || area.width < 10 {
        return;
    }

    let mut lines = vec![
        Line::from(format!(
            "          Frame: {} of {total_frames}",
            record.frame_index
        )),
        Line::from(format!("     Frame time: {}", record.label)),
        Line::from(format!("     Video time: {:.6} s", record.timestamp)),
    ];

    match nearest {
        Ok(sample) => {
            lines.push(Line::from(format!(
                "Nearest spectrum: {} ({:.6} s)",
                sample.label, sample.timestamp
            )));
            lines.push(delta_line(record, sample, theme));
            let integration = sample
                .integration_time
                .map_or_else(|| "-".to_string(), |t| t.to_string());
            let dark = if dark_applied { " (dark subtracted)" } else { "" };
            lines.push(Line::from(format!(
                "    Integration: {integration}{dark}"
            )));
        }
        Err(err) => lines.push(Line::from(Span::styled(err.to_string(), theme.status_error))),
    }

    frame.render_widget(Paragraph::new(lines), area);
}
