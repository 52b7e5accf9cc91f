// SPDX-License-Identifier: MIT
use crate::session::SpectralSample;

const INTEGRATION_TOLERANCE: f64 = 1e-9;

/// Dark-frame intensities keyed by integration time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DarkReference {
    rows: Vec<(f64, Vec<f64>)>,
}

impl DarkReference {
    /// Adds or replaces the row for an integration time.
    pub fn insert(&mut self, integration_time: f64, intensities: Vec<f64>) {
        if let Some(row) = self
            .rows
            .iter_mut()
            .find(|(t, _)| (t - integration_time).abs() < INTEGRATION_TOLERANCE)
        {
            row.1 = intensities;
        } else {
            self.rows.push((integration_time, intensities));
        }
    }

    #[must_use]
    pub fn lookup(&self, integration_time: f64) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(t, _)| (t - integration_time).abs() < INTEGRATION_TOLERANCE)
            .map(|(_, v)| v.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Dark row for the sample's integration time, if one of the same length
/// exists.
#[must_use]
pub fn matching_dark<'a>(sample: &SpectralSample, dark: &'a DarkReference) -> Option<&'a [f64]> {
    sample
        .integration_time
        .and_then(|t| dark.lookup(t))
        .filter(|row| row.len() == sample.values.len())
}

/// Subtracts the matching dark row. Samples without one are returned
/// unchanged.
#[must_use]
pub fn subtract_dark(sample: &SpectralSample, dark: &DarkReference) -> Vec<f64> {
    match matching_dark(sample, dark) {
        Some(row) => sample
            .values
            .iter()
            .zip(row)
            .map(|(value, d)| value - d)
            .collect(),
        None => sample.values.clone(),
    }
}

/// Moving-average FIR filter with `taps` equal coefficients. Edges are
/// padded with the first and last value.
#[must_use]
pub fn smooth(values: &[f64], taps: usize) -> Vec<f64> {
    if taps <= 1 || values.is_empty() {
        return values.to_vec();
    }

    let padding = taps / 2;
    let first = values[0];
    let last = values[values.len() - 1];

    let mut padded = Vec::with_capacity(values.len() + 2 * padding);
    padded.extend(std::iter::repeat_n(first, padding));
    padded.extend_from_slice(values);
    padded.extend(std::iter::repeat_n(last, padding));

    #[allow(clippy::cast_precision_loss)]
    let coefficient = 1.0 / taps as f64;
    padded
        .windows(taps)
        .take(values.len())
        .map(|window| window.iter().map(|x| x * coefficient).sum())
        .collect()
}

/// Intensities as shown in the viewer: dark-corrected, then smoothed.
#[must_use]
pub fn display_values(sample: &SpectralSample, dark: &DarkReference, taps: usize) -> Vec<f64> {
    smooth(&subtract_dark(sample, dark), taps)
}
