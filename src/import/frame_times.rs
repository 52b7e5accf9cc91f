// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::timestamp::RawTimestamp;
use crate::sync::SyncError;

/// One line of a frame-time file.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrameTime {
    pub label: String,
    pub timestamp: RawTimestamp,
}

/// Reads a frame-time mapping file, one timestamp per decodable frame.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a line holds an invalid
/// timestamp, or no timestamps are found.
pub fn read_frame_times(path: &Path) -> Result<Vec<RawFrameTime>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open frame-time file: {}", path.display()))?;
    parse_frame_times(file)
        .with_context(|| format!("failed to parse frame-time file: {}", path.display()))
}

/// Parses frame-time lines.
///
/// Accepts bare timestamps or `frame,timestamp` rows; blank lines, a
/// `FILE_START`/`FILE_END` marker and `timestamp` headers are skipped.
///
/// # Errors
///
/// Returns an error on I/O failure, on the first malformed line, or when no
/// timestamps are present.
pub fn parse_frame_times(reader: impl Read) -> Result<Vec<RawFrameTime>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut times = Vec::new();

    for record in reader.records() {
        let record = record.context("failed to read frame-time row")?;
        let line = record.position().map_or(0, csv::Position::line);
        let Some(cell) = timestamp_cell(&record) else {
            continue;
        };

        let timestamp = RawTimestamp::parse(&cell).ok_or_else(|| {
            SyncError::Validation(format!("invalid timestamp {cell:?} on line {line}"))
        })?;
        times.push(RawFrameTime {
            label: cell,
            timestamp,
        });
    }

    if times.is_empty() {
        return Err(SyncError::Validation("no frame times found".to_string()).into());
    }

    debug!(frames = times.len(), "parsed frame times");
    Ok(times)
}

/// Picks the timestamp cell of a row. `frame,timestamp` rows use their last
/// cell; any other multi-cell row is kept whole so it fails to parse.
fn timestamp_cell(record: &csv::StringRecord) -> Option<String> {
    let first = record.get(0)?;
    let indexed = first.to_ascii_lowercase().starts_with("frame")
        || (!first.is_empty() && first.chars().all(|c| c.is_ascii_digit()));

    let cell = match record.len() {
        0 => return None,
        1 => first.to_string(),
        n if indexed => record.get(n - 1)?.to_string(),
        _ => record.iter().collect::<Vec<_>>().join(","),
    };

    if cell.is_empty()
        || cell.to_ascii_lowercase().starts_with("timestamp")
        || matches!(cell.as_str(), "FILE_START" | "FILE_END")
    {
        return None;
    }
    Some(cell)
}
