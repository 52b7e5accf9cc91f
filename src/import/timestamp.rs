// SPDX-License-Identifier: MIT
use chrono::NaiveDateTime;

use crate::sync::SyncError;

/// Wall-clock labels written by the capture rig, e.g. `20200101_000001.500000`.
pub const WALL_CLOCK_FORMAT: &str = "%Y%m%d_%H%M%S%.f";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawTimestamp {
    Seconds(f64),
    WallClock(NaiveDateTime),
}

impl RawTimestamp {
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, WALL_CLOCK_FORMAT) {
            return Some(Self::WallClock(dt));
        }
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self::Seconds)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Seconds(_) => "seconds",
            Self::WallClock(_) => "wall-clock",
        }
    }
}

/// Common time origin of a dataset: timestamp zero is the first video frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeOrigin {
    /// Timestamps are already seconds from the first frame.
    Seconds,
    WallClock(NaiveDateTime),
}

impl TimeOrigin {
    #[must_use]
    pub fn from_first_frame(first: &RawTimestamp) -> Self {
        match *first {
            RawTimestamp::Seconds(_) => Self::Seconds,
            RawTimestamp::WallClock(dt) => Self::WallClock(dt),
        }
    }

    /// Converts a raw timestamp into seconds relative to this origin.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] when the timestamp kind differs from
    /// the origin's kind or the offset does not fit in microseconds.
    pub fn seconds(&self, raw: &RawTimestamp) -> Result<f64, SyncError> {
        match (self, raw) {
            (Self::Seconds, RawTimestamp::Seconds(s)) => Ok(*s),
            (Self::WallClock(origin), RawTimestamp::WallClock(dt)) => {
                let micros = (*dt - *origin).num_microseconds().ok_or_else(|| {
                    SyncError::Validation(format!("timestamp {dt} is too far from {origin}"))
                })?;
                #[allow(clippy::cast_precision_loss)]
                let seconds = micros as f64 / 1_000_000.0;
                Ok(seconds)
            }
            _ => Err(SyncError::Validation(format!(
                "{} timestamp cannot be aligned with {} frame times",
                raw.kind(),
                self.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::WallClock(_) => "wall-clock",
        }
    }
}
