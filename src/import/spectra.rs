// SPDX-License-Identifier: MIT
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::normalized_name;
use super::timestamp::RawTimestamp;
use crate::session::WavelengthAxis;
use crate::sync::SyncError;

const TIMESTAMP_ALIASES: [&str; 2] = ["timestamp", "kecmtimestamp"];
const INTEGRATION_ALIASES: [&str; 2] = ["integrationtime", "integration"];

/// One spectral row before time alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSpectralRow {
    pub label: String,
    pub timestamp: RawTimestamp,
    pub values: Vec<f64>,
    pub integration_time: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpectralTable {
    pub wavelengths: WavelengthAxis,
    pub rows: Vec<RawSpectralRow>,
}

struct Columns {
    timestamp: usize,
    integration: Option<usize>,
    /// (column index, wavelength), ascending by wavelength.
    wavelengths: Vec<(usize, f64)>,
}

/// Reads a spectral data file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no valid rows.
pub fn read_spectra(path: &Path) -> Result<SpectralTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spectral file: {}", path.display()))?;
    parse_spectra(&text)
        .with_context(|| format!("failed to parse spectral file: {}", path.display()))
}

/// Parses spectral CSV text.
///
/// An optional `FILE_START` line precedes the header. Numeric column names
/// are wavelengths; rows whose timestamp does not parse are dropped.
///
/// # Errors
///
/// Returns an error if the header has no timestamp column, a row cannot be
/// read, or no valid rows remain.
pub fn parse_spectra(text: &str) -> Result<SpectralTable> {
    let body = skip_file_start(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .context("failed to read spectral header")?
        .clone();
    let columns = locate_columns(&headers)?;

    let labels = columns
        .wavelengths
        .iter()
        .map(|&(idx, _)| headers.get(idx).unwrap_or_default().to_string())
        .collect();
    let wavelengths = WavelengthAxis {
        labels,
        values: columns.wavelengths.iter().map(|&(_, w)| w).collect(),
    };

    let mut rows = Vec::new();
    for (number, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read spectral row {}", number + 1))?;
        let cell = record.get(columns.timestamp).unwrap_or_default();

        let Some(timestamp) = RawTimestamp::parse(cell) else {
            debug!(row = number + 1, cell, "dropping spectral row without valid timestamp");
            continue;
        };

        let values = columns
            .wavelengths
            .iter()
            .map(|&(idx, _)| parse_value(record.get(idx)))
            .collect();
        let integration_time = columns
            .integration
            .and_then(|idx| record.get(idx))
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());

        rows.push(RawSpectralRow {
            label: cell.to_string(),
            timestamp,
            values,
            integration_time,
        });
    }

    if rows.is_empty() {
        return Err(SyncError::Validation("spectral data is empty".to_string()).into());
    }

    debug!(
        rows = rows.len(),
        wavelengths = wavelengths.len(),
        "parsed spectral data"
    );
    Ok(SpectralTable { wavelengths, rows })
}

fn skip_file_start(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.split_once('\n') {
        Some((first, rest)) if first.trim() == "FILE_START" => rest,
        _ => trimmed,
    }
}

fn locate_columns(headers: &csv::StringRecord) -> Result<Columns> {
    let mut timestamp = None;
    let mut integration = None;
    let mut wavelengths = Vec::new();

    for (idx, name) in headers.iter().enumerate() {
        let normalized = normalized_name(name);
        if timestamp.is_none() && TIMESTAMP_ALIASES.contains(&normalized.as_str()) {
            timestamp = Some(idx);
        } else if INTEGRATION_ALIASES.contains(&normalized.as_str()) {
            integration = Some(idx);
        } else if let Ok(w) = name.parse::<f64>()
            && w.is_finite()
        {
            wavelengths.push((idx, w));
        } else {
            debug!(column = name, "ignoring non-wavelength spectral column");
        }
    }

    // Unnamed first column holds the timestamps in some exports.
    if timestamp.is_none() && headers.get(0).is_some_and(str::is_empty) {
        timestamp = Some(0);
    }

    let timestamp = timestamp.ok_or_else(|| {
        SyncError::Validation("spectral data missing timestamp column".to_string())
    })?;
    wavelengths.sort_by(|a, b| a.1.total_cmp(&b.1));

    Ok(Columns {
        timestamp,
        integration,
        wavelengths,
    })
}

fn parse_value(cell: Option<&str>) -> f64 {
    cell.and_then(|v| v.parse::<f64>().ok()).unwrap_or(f64::NAN)
}
