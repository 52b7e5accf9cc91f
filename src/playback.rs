// SPDX-License-Identifier: MIT
use std::time::{Duration, Instant};

/// Advances through frames in real time, paced by the gaps between frame
/// timestamps divided by the playback speed.
pub struct FramePacer {
    timestamps: Vec<f64>,
    current_index: usize,
    playback_speed: f64,
    last_emitted: Instant,
    paused: bool,
}

impl FramePacer {
    #[must_use]
    pub fn new(timestamps: Vec<f64>) -> Self {
        Self {
            timestamps,
            current_index: 0,
            playback_speed: 1.0,
            last_emitted: Instant::now(),
            paused: true,
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed > 0.0 {
            self.playback_speed = speed;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if !self.paused {
            self.last_emitted = Instant::now();
        }
    }

    pub fn seek_to(&mut self, index: usize) {
        self.current_index = index.min(self.timestamps.len().saturating_sub(1));
        self.last_emitted = Instant::now();
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_index + 1 >= self.timestamps.len()
    }

    /// Returns the next frame index once its display time at `now` has
    /// come.
    pub fn next_frame_at(&mut self, now: Instant) -> Option<usize> {
        if self.paused || self.is_finished() {
            return None;
        }

        let gap = self.timestamps[self.current_index + 1] - self.timestamps[self.current_index];
        let required = Duration::try_from_secs_f64((gap / self.playback_speed).max(0.0))
            .unwrap_or(Duration::MAX);
        if now.saturating_duration_since(self.last_emitted) < required {
            return None;
        }

        self.current_index += 1;
        self.last_emitted = now;
        Some(self.current_index)
    }
}
