// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Monotonic stopwatch used for fault timeouts and soak duration.
//!
//! Built on `tokio::time::Instant` so paused-clock tests can drive it.

use std::time::Duration;

use tokio::time::Instant;

/// Stopwatch with an optional start timestamp.
///
/// An idle timer reports zero elapsed time.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started_at: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self { started_at: None }
    }

    /// Start the timer. A running timer keeps its original start time.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop the timer and return the time it ran for.
    pub fn stop(&mut self) -> Duration {
        match self.started_at.take() {
            Some(started) => started.elapsed(),
            None => Duration::ZERO,
        }
    }

    /// Restart the timer from now, returning the time elapsed before the restart.
    pub fn reset(&mut self) -> Duration {
        let elapsed = self.check_time();
        self.started_at = Some(Instant::now());
        elapsed
    }

    /// Elapsed time since start, or zero when idle. Does not stop the timer.
    pub fn check_time(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}
