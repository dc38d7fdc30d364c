// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! CAST command parsing and conversion into drum units.

use std::time::Duration;

use thiserror::Error;

use crate::calibration::CalibrationTable;
use crate::settings::WinchSettings;

pub const CAST_TOKEN: &str = "CAST";

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("malformed command '{0}': expected 'CAST <meters> <soak_depth_m> <soak_time_s>'")]
    Malformed(String),

    #[error("cast depth {depth} m outside 0..={max} m")]
    DepthOutOfRange { depth: f64, max: f64 },

    #[error("soak depth {0} m is negative")]
    NegativeSoakDepth(f64),

    #[error("soak time {0} s is not a usable duration")]
    SoakTime(f64),
}

/// CAST request as typed by the operator, in meters and seconds.
/// Negative soak values select the configured defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastRequest {
    pub depth_m: f64,
    pub soak_depth_m: f64,
    pub soak_time_s: f64,
}

/// CAST converted to drum rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastPlan {
    pub target: i64,
    pub soak_depth: i64,
    pub soak_time: Duration,
}

impl CastRequest {
    /// Parse `"CAST <meters> <soak_depth_m> <soak_time_s>"`.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let malformed = || CommandError::Malformed(line.to_string());
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 4 || tokens[0] != CAST_TOKEN {
            return Err(malformed());
        }

        let mut values = [0.0f64; 3];
        for (slot, token) in values.iter_mut().zip(&tokens[1..]) {
            let value: f64 = token.parse().map_err(|_| malformed())?;
            if !value.is_finite() {
                return Err(malformed());
            }
            *slot = value;
        }

        Ok(Self {
            depth_m: values[0],
            soak_depth_m: values[1],
            soak_time_s: values[2],
        })
    }

    /// Apply defaults, range-check in rotations and convert.
    pub fn resolve(
        &self,
        calibration: &CalibrationTable,
        settings: &WinchSettings,
    ) -> Result<CastPlan, CommandError> {
        let soak_depth_m = if self.soak_depth_m < 0.0 {
            settings.default_soak_depth_m
        } else {
            self.soak_depth_m
        };
        let soak_time = if self.soak_time_s < 0.0 {
            settings.default_soak_time
        } else {
            Duration::try_from_secs_f64(self.soak_time_s)
                .map_err(|_| CommandError::SoakTime(self.soak_time_s))?
        };

        let max = to_rotations(calibration, settings.maximum_depth_m);
        let target = to_rotations(calibration, self.depth_m);
        if self.depth_m < 0.0 || target < 0 || target > max {
            return Err(CommandError::DepthOutOfRange {
                depth: self.depth_m,
                max: settings.maximum_depth_m,
            });
        }

        // Only the cast target is bounded by the maximum depth.
        let soak_depth = to_rotations(calibration, soak_depth_m);
        if soak_depth_m < 0.0 || soak_depth < 0 {
            return Err(CommandError::NegativeSoakDepth(soak_depth_m));
        }

        Ok(CastPlan {
            target,
            soak_depth,
            soak_time,
        })
    }
}

impl CastPlan {
    /// Positional arguments for the CAST state: target, soak depth, soak seconds.
    pub fn to_args(&self) -> Vec<f64> {
        vec![
            self.target as f64,
            self.soak_depth as f64,
            self.soak_time.as_secs_f64(),
        ]
    }
}

pub(crate) fn to_rotations(calibration: &CalibrationTable, meters: f64) -> i64 {
    calibration.meters_to_rotations(meters).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CalibrationTable {
        CalibrationTable::linear(0.1).unwrap()
    }

    #[test]
    fn test_parse_valid_cast() {
        let req = CastRequest::parse("CAST 10 1.1 60").unwrap();
        assert_eq!(req.depth_m, 10.0);
        assert_eq!(req.soak_depth_m, 1.1);
        assert_eq!(req.soak_time_s, 60.0);
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(CastRequest::parse("CAST abc").is_err());
        assert!(CastRequest::parse("CAST 10 1 x").is_err());
        assert!(CastRequest::parse("CAST 10 1 60 5").is_err());
        assert!(CastRequest::parse("DROP 10 1 60").is_err());
        assert!(CastRequest::parse("CAST NaN 1 60").is_err());
    }

    #[test]
    fn test_resolve_converts_to_rotations() {
        let plan = CastRequest::parse("CAST 10 1.1 60")
            .unwrap()
            .resolve(&table(), &WinchSettings::default())
            .unwrap();
        assert_eq!(plan.target, 100);
        assert_eq!(plan.soak_depth, 11);
        assert_eq!(plan.soak_time, Duration::from_secs(60));
        assert_eq!(plan.to_args(), vec![100.0, 11.0, 60.0]);
    }

    #[test]
    fn test_resolve_defaults_negative_soak_values() {
        let settings = WinchSettings {
            default_soak_depth_m: 2.0,
            default_soak_time: Duration::from_secs(30),
            ..WinchSettings::default()
        };
        let plan = CastRequest::parse("CAST 5 -1 -1")
            .unwrap()
            .resolve(&table(), &settings)
            .unwrap();
        assert_eq!(plan.target, 50);
        assert_eq!(plan.soak_depth, 20);
        assert_eq!(plan.soak_time, Duration::from_secs(30));
    }

    #[test]
    fn test_resolve_range_checks() {
        let settings = WinchSettings {
            maximum_depth_m: 20.0,
            ..WinchSettings::default()
        };
        let too_deep = CastRequest::parse("CAST 25 1 10").unwrap();
        assert!(matches!(
            too_deep.resolve(&table(), &settings),
            Err(CommandError::DepthOutOfRange { .. })
        ));

        let negative = CastRequest::parse("CAST -1 1 10").unwrap();
        assert!(negative.resolve(&table(), &settings).is_err());

        let at_limit = CastRequest::parse("CAST 20 0 0").unwrap();
        let plan = at_limit.resolve(&table(), &settings).unwrap();
        assert_eq!(plan.target, 200);
        assert_eq!(plan.soak_depth, 0);
        assert_eq!(plan.soak_time, Duration::ZERO);
    }

    #[test]
    fn test_soak_below_maximum_depth_is_accepted() {
        let settings = WinchSettings {
            maximum_depth_m: 20.0,
            ..WinchSettings::default()
        };
        let plan = CastRequest::parse("CAST 5 25 10")
            .unwrap()
            .resolve(&table(), &settings)
            .unwrap();
        assert_eq!(plan.target, 50);
        assert_eq!(plan.soak_depth, 250);
        assert_eq!(plan.soak_time, Duration::from_secs(10));
    }

    #[test]
    fn test_negative_default_soak_depth_is_rejected() {
        let settings = WinchSettings {
            default_soak_depth_m: -3.0,
            ..WinchSettings::default()
        };
        let request = CastRequest::parse("CAST 5 -1 10").unwrap();
        assert_eq!(
            request.resolve(&table(), &settings),
            Err(CommandError::NegativeSoakDepth(-3.0))
        );
    }
}
