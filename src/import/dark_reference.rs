// SPDX-License-Identifier: MIT
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::normalized_name;
use crate::spectrum::DarkReference;

const INTEGRATION_ALIASES: [&str; 2] = ["integrationtime", "integration"];

/// Reads a dark reference log.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_dark_reference(path: &Path) -> Result<DarkReference> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dark reference: {}", path.display()))?;
    parse_dark_reference(&text)
        .with_context(|| format!("failed to parse dark reference: {}", path.display()))
}

/// Parses dark reference CSV: an integration-time column plus one column per
/// wavelength. Rows without a numeric integration time are skipped.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read.
pub fn parse_dark_reference(text: &str) -> Result<DarkReference> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .context("failed to read dark reference header")?
        .clone();

    let mut integration = None;
    let mut wavelengths: Vec<(usize, f64)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if INTEGRATION_ALIASES.contains(&normalized_name(name).as_str()) {
            integration = Some(idx);
        } else if let Ok(w) = name.parse::<f64>()
            && w.is_finite()
        {
            wavelengths.push((idx, w));
        }
    }
    wavelengths.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut dark = DarkReference::default();
    let Some(integration) = integration else {
        warn!("dark reference has no integration time column; ignoring it");
        return Ok(dark);
    };

    for (number, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read dark row {}", number + 1))?;
        let Some(time) = record
            .get(integration)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
        else {
            debug!(row = number + 1, "skipping dark row without integration time");
            continue;
        };

        let intensities = wavelengths
            .iter()
            .map(|&(idx, _)| {
                record
                    .get(idx)
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(f64::NAN)
            })
            .collect();
        dark.insert(time, intensities);
    }

    debug!(rows = dark.len(), "parsed dark reference");
    Ok(dark)
}
