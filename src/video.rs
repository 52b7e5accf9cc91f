// SPDX-License-Identifier: MIT
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub frame_count: usize,
    /// Frames per second; zero when the container does not report a rate.
    pub fps: f64,
}

/// Source of frame counts and rates for a video file. Pixel decoding is left
/// to external players.
pub trait VideoProbe {
    /// # Errors
    ///
    /// Returns an error if the video cannot be inspected.
    fn probe(&self, path: &Path) -> Result<VideoInfo>;
}

pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl VideoProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-show_entries",
                "stream=r_frame_rate,nb_read_packets",
                "-of",
                "csv=p=0",
            ])
            .arg(path)
            .output()
            .with_context(|| format!("failed to run {}", self.binary))?;

        if !output.status.success() {
            bail!(
                "{} failed on {} with status {}: {}",
                self.binary,
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let info = parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("unexpected {} output for {}", self.binary, path.display()))?;
        debug!(
            path = %path.display(),
            frames = info.frame_count,
            fps = info.fps,
            "probed video"
        );
        Ok(info)
    }
}

/// Parses `r_frame_rate,nb_read_packets` as printed with `-of csv=p=0`,
/// e.g. `30000/1001,1800`.
///
/// # Errors
///
/// Returns an error if the line is missing or either field is malformed.
pub fn parse_ffprobe_output(text: &str) -> Result<VideoInfo> {
    let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        bail!("no video stream reported");
    };

    let Some((rate, count)) = line.split_once(',') else {
        bail!("expected `rate,frames`, got {line:?}");
    };

    let frame_count = count
        .trim()
        .trim_end_matches(',')
        .parse::<usize>()
        .with_context(|| format!("invalid frame count {count:?}"))?;

    Ok(VideoInfo {
        frame_count,
        fps: parse_rate(rate.trim())?,
    })
}

fn parse_rate(rate: &str) -> Result<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().with_context(|| format!("invalid frame rate {rate:?}"))?;
            let den: f64 = den.parse().with_context(|| format!("invalid frame rate {rate:?}"))?;
            if den.abs() < f64::EPSILON { 0.0 } else { num / den }
        }
        None => rate
            .parse()
            .with_context(|| format!("invalid frame rate {rate:?}"))?,
    };
    Ok(if fps.is_finite() && fps > 0.0 { fps } else { 0.0 })
}
