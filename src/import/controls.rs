// SPDX-License-Identifier: MIT
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::normalized_name;
use super::timestamp::RawTimestamp;
use crate::session::Fields;

/// One data row of a CSV control log.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlRow {
    /// Parsed timestamp cell, when the log has one and it is readable.
    pub timestamp: Option<RawTimestamp>,
    pub fields: Fields,
}

/// A parsed control-input log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlLog {
    /// Field names with the defaults offered for every frame.
    pub template: Fields,
    /// Per-frame values, in file order.
    pub rows: Vec<ControlRow>,
}

/// Reads a control-input log.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its CSV form is malformed.
pub fn read_controls(path: &Path) -> Result<ControlLog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read control log: {}", path.display()))?;
    parse_controls(&text).with_context(|| format!("failed to parse control log: {}", path.display()))
}

/// Parses either a `key=value,key=value` line, which only supplies the
/// template, or a CSV table. In the CSV form every data row becomes a
/// [`ControlRow`] and the first one also supplies the template defaults.
/// Timestamp columns are not fields.
///
/// # Errors
///
/// Returns an error if the CSV form cannot be read.
pub fn parse_controls(text: &str) -> Result<ControlLog> {
    let Some(first_line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(ControlLog::default());
    };

    if first_line.contains('=') {
        return Ok(ControlLog {
            template: parse_pairs(first_line),
            rows: Vec::new(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim_start().as_bytes());
    let headers = reader
        .headers()
        .context("failed to read control log header")?
        .clone();
    let timestamp_column = headers
        .iter()
        .position(|name| normalized_name(name) == "timestamp");

    let mut rows = Vec::new();
    for (number, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read control log row {}", number + 1))?;
        let fields: Fields = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|&(column, (name, _))| !name.is_empty() && Some(column) != timestamp_column)
            .map(|(_, (name, value))| (name.to_string(), value.to_string()))
            .collect();
        let timestamp = timestamp_column
            .and_then(|column| record.get(column))
            .and_then(RawTimestamp::parse);
        rows.push(ControlRow { timestamp, fields });
    }

    let template = match rows.first() {
        Some(row) => row.fields.clone(),
        None => headers
            .iter()
            .enumerate()
            .filter(|&(column, name)| !name.is_empty() && Some(column) != timestamp_column)
            .map(|(_, name)| (name.to_string(), String::new()))
            .collect(),
    };
    debug!(rows = rows.len(), fields = template.len(), "parsed control log");
    Ok(ControlLog { template, rows })
}

fn parse_pairs(line: &str) -> Fields {
    line.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::fields;

    #[test]
    fn key_value_line() {
        let log = parse_controls("laser=on, gain = 2.5,junk,=x\nignored=1\n").unwrap();
        assert_eq!(log.template, fields(&[("laser", "on"), ("gain", "2.5")]));
        assert!(log.rows.is_empty());
    }

    #[test]
    fn csv_keeps_every_row() {
        let log = parse_controls("timestamp,laser\n0.0,off\n0.033,on\n0.066,on\n").unwrap();
        assert_eq!(log.template, fields(&[("laser", "off")]));
        assert_eq!(log.rows.len(), 3);
        assert_eq!(log.rows[1].timestamp, Some(RawTimestamp::Seconds(0.033)));
        assert_eq!(log.rows[1].fields, fields(&[("laser", "on")]));
        assert_eq!(log.rows[2].fields, fields(&[("laser", "on")]));
    }

    #[test]
    fn csv_without_timestamps() {
        let log = parse_controls("laser,gain\noff,1\non,2\n").unwrap();
        assert_eq!(log.template, fields(&[("laser", "off"), ("gain", "1")]));
        assert!(log.rows.iter().all(|r| r.timestamp.is_none()));
        assert_eq!(log.rows[1].fields, fields(&[("laser", "on"), ("gain", "2")]));
    }

    #[test]
    fn csv_header_only() {
        let log = parse_controls("Timestamp,note\n").unwrap();
        assert_eq!(log.template, fields(&[("note", "")]));
        assert!(log.rows.is_empty());
    }

    #[test]
    fn empty_log() {
        assert_eq!(parse_controls("\n\n").unwrap(), ControlLog::default());
    }
}
