// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

pub const DEFAULT_CONFIG_FILE: &str = "spectraview.toml";
pub const ENV_PREFIX: &str = "SPECTRAVIEW_";

/// Settings layered from defaults, `spectraview.toml` and `SPECTRAVIEW_*`
/// environment variables, later sources winning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CSV written by the viewer's export key when `--output` is absent.
    pub output_path: PathBuf,
    /// Moving-average length applied to displayed spectra; 0 or 1 disables.
    pub smoothing_taps: usize,
    pub ffprobe: String,
    pub log_file: PathBuf,
    pub log_level: String,
    /// Used when frame times are derived and the video reports no rate.
    pub fallback_fps: f64,
    pub dark_reference: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output.csv"),
            smoothing_taps: 101,
            ffprobe: "ffprobe".to_string(),
            log_file: PathBuf::from("spectraview.log"),
            log_level: "info".to_string(),
            fallback_fps: 30.0,
            dark_reference: None,
        }
    }
}

impl Config {
    /// Loads the layered configuration. An explicitly named file must
    /// exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, a source cannot be
    /// parsed, or a value fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let toml = match explicit {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                Toml::file(path)
            }
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(toml)
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the fallback rate is not a positive number or
    /// the log level is unknown.
    pub fn validate(&self) -> Result<()> {
        if !(self.fallback_fps.is_finite() && self.fallback_fps > 0.0) {
            bail!("fallback_fps must be positive, got {}", self.fallback_fps);
        }
        self.level_filter()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `log_level` is not a tracing level name.
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .with_context(|| format!("invalid log_level {:?}", self.log_level))
    }
}
