// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};

use crate::session::WavelengthAxis;
use crate::tui::theme::Theme;

/// Lower and upper bound of the finite values, widened when flat.
fn bounds(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return None;
    }
    if hi - lo < f64::EPSILON {
        return Some([lo - 1.0, hi + 1.0]);
    }
    Some([lo, hi])
}

fn axis_labels<'a>(bounds: [f64; 2], precision: usize) -> Vec<Span<'a>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .into_iter()
        .map(|v| Span::raw(format!("{v:.precision$}")))
        .collect()
}

/// Pairs each wavelength with its intensity, skipping missing readings.
#[must_use]
pub fn points(axis: &WavelengthAxis, values: &[f64]) -> Vec<(f64, f64)> {
    axis.values
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(&w, &v)| (w, v))
        .collect()
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    axis: &WavelengthAxis,
    values: &[f64],
    theme: &Theme,
) {
    if area.height < 3 || area.width < 20 {
        return;
    }

    if axis.is_empty() {
        frame.render_widget(Paragraph::new("No wavelength columns in spectral data"), area);
        return;
    }

    let data = points(axis, values);
    let (Some(x_bounds), Some(y_bounds)) = (
        bounds(data.iter().map(|p| p.0)),
        bounds(data.iter().map(|p| p.1)),
    ) else {
        frame.render_widget(Paragraph::new("No spectral values to plot"), area);
        return;
    };

    let dataset = Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(theme.spectrum_line)
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .title("wavelength")
                .style(theme.axis)
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds, 1)),
        )
        .y_axis(
            Axis::default()
                .title("intensity")
                .style(theme.axis)
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds, 0)),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::two_band_axis;

    #[test]
    fn points_skip_missing_values() {
        let pts = points(&two_band_axis(), &[f64::NAN, 3.0]);
        assert_eq!(pts, vec![(600.0, 3.0)]);
    }

    #[test]
    fn bounds_widen_flat_series() {
        assert_eq!(bounds([2.0, 2.0].into_iter()), Some([1.0, 3.0]));
        assert_eq!(bounds([3.0, f64::NAN, -1.0].into_iter()), Some([-1.0, 3.0]));
        assert_eq!(bounds([f64::NAN].into_iter()), None);
    }

    #[test]
    fn labels_span_bounds() {
        let labels: Vec<String> = axis_labels([400.0, 700.0], 1)
            .into_iter()
            .map(|s| s.content.into_owned())
            .collect();
        assert_eq!(labels, ["400.0", "550.0", "700.0"]);
    }
}
