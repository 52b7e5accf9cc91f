// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::sync::{ExportRow, Synchronizer};

/// Streams joined frame rows into CSV.
pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
    metadata_columns: Vec<String>,
    rows: usize,
}

impl<W: Write> CsvExporter<W> {
    /// Wraps `inner` and writes the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(
        inner: W,
        wavelength_labels: &[String],
        metadata_columns: Vec<String>,
    ) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);

        let header = ["frame_index", "timestamp"]
            .into_iter()
            .chain(wavelength_labels.iter().map(String::as_str))
            .chain(metadata_columns.iter().map(String::as_str));
        writer
            .write_record(header)
            .context("failed to write export header")?;

        Ok(Self {
            writer,
            metadata_columns,
            rows: 0,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub fn write_row(&mut self, row: &ExportRow<'_>) -> Result<()> {
        let mut record =
            Vec::with_capacity(2 + row.spectrum.values.len() + self.metadata_columns.len());
        record.push(row.frame_index.to_string());
        record.push(format_seconds(row.timestamp));
        record.extend(row.spectrum.values.iter().map(|&v| format_value(v)));
        record.extend(
            self.metadata_columns
                .iter()
                .map(|name| row.fields.get(name).cloned().unwrap_or_default()),
        );

        self.writer
            .write_record(&record)
            .with_context(|| format!("failed to write export row for frame {}", row.frame_index))?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes buffered output and returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().context("failed to flush export")?;
        Ok(self.rows)
    }
}

/// Writes every export row of `sync` as CSV into `out`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(sync: &Synchronizer, out: W) -> Result<usize> {
    let mut exporter = CsvExporter::new(
        out,
        &sync.session().wavelengths().labels,
        sync.metadata_columns(),
    )?;
    for row in sync.export_rows() {
        exporter.write_row(&row)?;
    }
    exporter.finish()
}

/// Exports to a file, replacing any existing one.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_to_path(sync: &Synchronizer, path: &Path) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("failed to create export file: {}", path.display()))?;
    let rows = write_csv(sync, BufWriter::new(file))
        .with_context(|| format!("failed to export to {}", path.display()))?;
    info!(path = %path.display(), rows, "exported dataset");
    Ok(rows)
}

/// Up to six decimals with trailing zeros dropped, keeping at least one.
#[must_use]
pub fn format_seconds(seconds: f64) -> String {
    let text = format!("{seconds:.6}");
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
