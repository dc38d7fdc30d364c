// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;
use std::time::Duration;

/// Runtime parameters consumed by the winch control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WinchSettings {
    pub name: String,
    pub main_loop_period: Duration,
    /// A live command not refreshed within this period expires.
    pub client_period: Duration,
    /// Continuous slack longer than this is a fault.
    pub slack_timeout: Duration,
    /// Minimum time per driven drum rotation.
    pub rotation_too_fast: Duration,
    /// Maximum time per driven drum rotation (stall detection).
    pub rotation_too_slow: Duration,
    pub default_soak_depth_m: f64,
    pub default_soak_time: Duration,
    pub maximum_depth_m: f64,
    /// Allowed dock position error, in rotations.
    pub calibration_tolerance: f64,
    pub calibration_file: Option<PathBuf>,
}

impl Default for WinchSettings {
    fn default() -> Self {
        Self {
            name: "ctd-winch".to_string(),
            main_loop_period: Duration::from_millis(100),
            client_period: Duration::from_millis(500),
            slack_timeout: Duration::from_millis(5000),
            rotation_too_fast: Duration::from_millis(500),
            rotation_too_slow: Duration::from_millis(5000),
            default_soak_depth_m: 1.1,
            default_soak_time: Duration::from_secs(60),
            maximum_depth_m: 100.0,
            calibration_tolerance: 1.0,
            calibration_file: None,
        }
    }
}
