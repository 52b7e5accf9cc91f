// SPDX-License-Identifier: MIT
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::Config;

/// Routes `tracing` events to the configured log file. The terminal belongs
/// to the viewer, so nothing is written to stdout or stderr. `RUST_LOG`
/// overrides the configured level.
///
/// # Errors
///
/// Returns an error if the level is invalid, the log file cannot be opened,
/// or a global subscriber is already installed.
pub fn init(config: &Config) -> Result<()> {
    let level = config.level_filter()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    init_with_filter(&config.log_file, filter)
}

fn init_with_filter(path: &Path, filter: EnvFilter) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("failed to install log subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("spectraview.log");

        let err = init_with_filter(&path, EnvFilter::new("info")).unwrap_err();
        assert!(err.to_string().contains("failed to open log file"));
    }
}
