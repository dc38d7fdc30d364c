// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for winch-server.
//!
//! The `[winch-server]` section of `ctd-winch.toml` is searched in:
//! 1. Path given with `--config`
//! 2. `./ctd-winch.toml`
//! 3. `$XDG_CONFIG_HOME/ctd-winch/ctd-winch.toml`
//! 4. `/etc/ctd-winch/ctd-winch.toml`
//!
//! Missing files and keys fall back to defaults.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use winch_app::ConfigFile;
use winch_backend::{ControllerAccess, GpioPins};
use winch_core::WinchSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub general: GeneralConfig,
    /// UDP command channel
    pub listen: ListenConfig,
    /// Control loop and liveness periods
    pub timing: TimingConfig,
    /// Drum rotation speed limits
    pub speed: SpeedConfig,
    /// CAST defaults and limits
    pub cast: CastConfig,
    pub calibration: CalibrationConfig,
    /// Drum controller backend
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Winch name used in logs
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: "ctd-winch".to_string(),
            log_level: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub listen: IpAddr,
    pub port: u16,
    /// Replies stop going to a peer silent for this long
    pub peer_timeout_ms: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5008,
            peer_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub main_loop_period_ms: u64,
    /// A live command expires when not refreshed within this period
    pub client_period_ms: u64,
    /// Continuous slack longer than this is a fault
    pub slack_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            main_loop_period_ms: 100,
            client_period_ms: 500,
            slack_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Minimum time per driven rotation
    pub too_fast_ms: u64,
    /// Maximum time per driven rotation
    pub too_slow_ms: u64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            too_fast_ms: 500,
            too_slow_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CastConfig {
    pub default_soak_depth_m: f64,
    pub default_soak_time_s: f64,
    pub maximum_depth_m: f64,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            default_soak_depth_m: 1.1,
            default_soak_time_s: 60.0,
            maximum_depth_m: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Rotation/meter table; unset means 1 m per rotation
    pub file: Option<PathBuf>,
    /// Allowed dock position error, in rotations
    pub tolerance: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("cal_data.txt")),
            tolerance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Backend name ("simulated" or "gpio")
    pub kind: String,
    /// Simulated drum: time per rotation while driven, 0 disables the drum thread
    pub rotation_period_ms: u64,
    /// Simulated drum: rotations of line on the drum
    pub line_length: i64,
    /// GPIO: sysfs class directory
    pub sysfs_root: PathBuf,
    /// GPIO: BCM pin numbers
    pub pins: GpioPins,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kind: "simulated".to_string(),
            rotation_period_ms: 1000,
            line_length: 2000,
            sysfs_root: PathBuf::from("/sys/class/gpio"),
            pins: GpioPins::default(),
        }
    }
}

impl ControllerConfig {
    /// Backend parameters for the configured kind.
    pub fn access(&self) -> ControllerAccess {
        match winch_app::normalize_name(&self.kind).as_str() {
            "gpio" => ControllerAccess::Gpio {
                sysfs_root: self.sysfs_root.clone(),
                pins: self.pins,
            },
            _ => ControllerAccess::Simulated {
                rotation_period: Duration::from_millis(self.rotation_period_ms),
                line_length: self.line_length,
            },
        }
    }
}

impl ServerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if self.general.name.trim().is_empty() {
            return Err("[general].name must not be empty".to_string());
        }
        if self.listen.port == 0 {
            return Err("[listen].port must be > 0".to_string());
        }
        if self.listen.peer_timeout_ms == 0 {
            return Err("[listen].peer_timeout_ms must be > 0".to_string());
        }
        if self.timing.main_loop_period_ms == 0 {
            return Err("[timing].main_loop_period_ms must be > 0".to_string());
        }
        if self.timing.client_period_ms == 0 {
            return Err("[timing].client_period_ms must be > 0".to_string());
        }
        if self.timing.slack_timeout_ms == 0 {
            return Err("[timing].slack_timeout_ms must be > 0".to_string());
        }
        if self.speed.too_fast_ms == 0 {
            return Err("[speed].too_fast_ms must be > 0".to_string());
        }
        if self.speed.too_fast_ms >= self.speed.too_slow_ms {
            return Err(format!(
                "[speed].too_fast_ms ({}) must be less than [speed].too_slow_ms ({})",
                self.speed.too_fast_ms, self.speed.too_slow_ms
            ));
        }

        validate_non_negative("[cast].default_soak_depth_m", self.cast.default_soak_depth_m)?;
        validate_non_negative("[cast].default_soak_time_s", self.cast.default_soak_time_s)?;
        if !self.cast.maximum_depth_m.is_finite() || self.cast.maximum_depth_m <= 0.0 {
            return Err("[cast].maximum_depth_m must be > 0".to_string());
        }
        if self.cast.default_soak_depth_m > self.cast.maximum_depth_m {
            return Err(
                "[cast].default_soak_depth_m must not exceed [cast].maximum_depth_m".to_string(),
            );
        }
        validate_non_negative("[calibration].tolerance", self.calibration.tolerance)?;

        if self.controller.kind.trim().is_empty() {
            return Err("[controller].kind must not be empty".to_string());
        }
        if self.controller.line_length <= 0 {
            return Err("[controller].line_length must be > 0".to_string());
        }

        Ok(())
    }

    /// Runtime settings for the control loop.
    pub fn winch_settings(&self) -> WinchSettings {
        WinchSettings {
            name: self.general.name.clone(),
            main_loop_period: Duration::from_millis(self.timing.main_loop_period_ms),
            client_period: Duration::from_millis(self.timing.client_period_ms),
            slack_timeout: Duration::from_millis(self.timing.slack_timeout_ms),
            rotation_too_fast: Duration::from_millis(self.speed.too_fast_ms),
            rotation_too_slow: Duration::from_millis(self.speed.too_slow_ms),
            default_soak_depth_m: self.cast.default_soak_depth_m,
            default_soak_time: Duration::try_from_secs_f64(self.cast.default_soak_time_s)
                .unwrap_or_default(),
            maximum_depth_m: self.cast.maximum_depth_m,
            calibration_tolerance: self.calibration.tolerance,
            calibration_file: self.calibration.file.clone(),
        }
    }

    /// Example `ctd-winch.toml` with the `[winch-server]` section.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "winch-server")]
            inner: ServerConfig,
        }
        let example = ServerConfig {
            general: GeneralConfig {
                name: "ctd-winch".to_string(),
                log_level: Some("info".to_string()),
            },
            controller: ControllerConfig {
                kind: "gpio".to_string(),
                ..ControllerConfig::default()
            },
            ..ServerConfig::default()
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

fn validate_non_negative(path: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{path} must be >= 0"));
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "winch-server"
    }
}
