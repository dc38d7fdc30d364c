// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Drum calibration: conversion between drum rotations and meters of line.
//!
//! The table holds two parallel, strictly increasing sequences sampled from
//! a calibration run. Values between samples are linearly interpolated and
//! values outside the sampled range are extrapolated from the nearest segment.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("failed to read calibration file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("calibration line {line}: expected '<rotations> <meters>', got '{content}'")]
    Parse { line: usize, content: String },

    #[error("invalid calibration table: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    rotations: Vec<f64>,
    meters: Vec<f64>,
}

impl CalibrationTable {
    /// Build a table from parallel samples.
    pub fn new(rotations: Vec<f64>, meters: Vec<f64>) -> Result<Self, CalibrationError> {
        if rotations.len() != meters.len() {
            return Err(CalibrationError::Shape(format!(
                "{} rotation samples but {} meter samples",
                rotations.len(),
                meters.len()
            )));
        }
        if rotations.len() < 2 {
            return Err(CalibrationError::Shape(
                "at least two samples are required".to_string(),
            ));
        }
        if !strictly_increasing(&rotations) {
            return Err(CalibrationError::Shape(
                "rotations must be strictly increasing".to_string(),
            ));
        }
        if !strictly_increasing(&meters) {
            return Err(CalibrationError::Shape(
                "meters must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { rotations, meters })
    }

    /// Two-point table for a drum paying out a fixed length per rotation.
    pub fn linear(meters_per_rotation: f64) -> Result<Self, CalibrationError> {
        Self::new(vec![0.0, 1.0], vec![0.0, meters_per_rotation])
    }

    /// Parse whitespace-separated `<rotations> <meters>` pairs, one per line.
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse(content: &str) -> Result<Self, CalibrationError> {
        let mut rotations = Vec::new();
        let mut meters = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse_err = || CalibrationError::Parse {
                line: idx + 1,
                content: line.to_string(),
            };
            let mut fields = line.split_whitespace();
            let (Some(rot), Some(m), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(parse_err());
            };
            let rot: f64 = rot.parse().map_err(|_| parse_err())?;
            let m: f64 = m.parse().map_err(|_| parse_err())?;
            if !rot.is_finite() || !m.is_finite() {
                return Err(parse_err());
            }
            rotations.push(rot);
            meters.push(m);
        }

        Self::new(rotations, meters)
    }

    /// Load a calibration file from disk.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CalibrationError::Read(path.to_path_buf(), e))?;
        Self::parse(&content)
    }

    /// Number of samples; never below two.
    pub fn sample_count(&self) -> usize {
        self.rotations.len()
    }

    /// Sampled rotation range `(first, last)`.
    pub fn rotation_domain(&self) -> (f64, f64) {
        match self.rotations.as_slice() {
            [first, .., last] => (*first, *last),
            _ => (0.0, 0.0),
        }
    }

    pub fn rotations_to_meters(&self, rotations: f64) -> f64 {
        interpolate(rotations, &self.rotations, &self.meters)
    }

    pub fn meters_to_rotations(&self, meters: f64) -> f64 {
        interpolate(meters, &self.meters, &self.rotations)
    }
}

impl Default for CalibrationTable {
    /// One meter per rotation.
    fn default() -> Self {
        Self {
            rotations: vec![0.0, 1.0],
            meters: vec![0.0, 1.0],
        }
    }
}

fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Piecewise-linear lookup of `x` in `xs`, mapped onto `ys`.
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    // Index of the segment start; clamps to the outer segments for extrapolation.
    let seg = match xs.iter().position(|&sample| sample > x) {
        Some(0) => 0,
        Some(i) => i - 1,
        None => last - 1,
    };
    let (x0, x1) = (xs[seg], xs[seg + 1]);
    let (y0, y1) = (ys[seg], ys[seg + 1]);
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> CalibrationTable {
        CalibrationTable::parse(
            "# rotations meters\n\
             0 0.0\n\
             10 1.0\n\
             50 4.5\n\
             \n\
             200 17.0\n",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let table = sample_table();
        assert_eq!(table.sample_count(), 4);
        assert_eq!(table.rotation_domain(), (0.0, 200.0));
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let err = CalibrationTable::parse("0 0\n10 abc\n").unwrap_err();
        assert!(matches!(err, CalibrationError::Parse { line: 2, .. }));

        let err = CalibrationTable::parse("0 0 0\n").unwrap_err();
        assert!(matches!(err, CalibrationError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_rejects_non_monotonic_and_short_tables() {
        assert!(CalibrationTable::parse("0 0\n").is_err());
        assert!(CalibrationTable::parse("0 0\n10 1\n5 2\n").is_err());
        assert!(CalibrationTable::new(vec![0.0, 1.0], vec![0.0]).is_err());
    }

    #[test]
    fn test_interpolates_inside_segments() {
        let table = sample_table();
        assert!((table.rotations_to_meters(5.0) - 0.5).abs() < 1e-9);
        assert!((table.rotations_to_meters(30.0) - 2.75).abs() < 1e-9);
        assert!((table.meters_to_rotations(4.5) - 50.0).abs() < 1e-9);
        assert!((table.meters_to_rotations(10.75) - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolates_outside_samples() {
        let table = sample_table();
        assert!((table.rotations_to_meters(-10.0) + 1.0).abs() < 1e-9);
        assert!((table.rotations_to_meters(260.0) - 22.0).abs() < 1e-9);
        assert!((table.meters_to_rotations(22.0) - 260.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let table = sample_table();
        let tolerance = 1.0;
        let (lo, hi) = table.rotation_domain();
        let mut r = lo;
        while r <= hi {
            let back = table.meters_to_rotations(table.rotations_to_meters(r));
            assert!((back - r).abs() <= tolerance, "r={} came back as {}", r, back);
            r += 7.0;
        }
    }

    #[test]
    fn test_linear_table() {
        let table = CalibrationTable::linear(0.1).unwrap();
        assert!((table.meters_to_rotations(10.0) - 100.0).abs() < 1e-9);
        assert!((table.meters_to_rotations(1.1) - 11.0).abs() < 1e-9);
        assert!((table.rotations_to_meters(100.0) - 10.0).abs() < 1e-9);
        assert_eq!(table.sample_count(), 2);
        assert_eq!(table.rotation_domain(), (0.0, 1.0));
    }

    #[test]
    fn test_single_sample_table_is_rejected() {
        assert!(matches!(
            CalibrationTable::new(vec![0.0], vec![0.0]),
            Err(CalibrationError::Shape(_))
        ));
        assert_eq!(CalibrationTable::default().rotation_domain(), (0.0, 1.0));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = CalibrationTable::load(Path::new("/nonexistent/cal_data.txt")).unwrap_err();
        assert!(matches!(err, CalibrationError::Read(..)));
    }
}
