// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

/// Sensor whose guard can be toggled by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Slack,
    Dock,
    Line,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Slack => "slack",
            SensorKind::Dock => "dock",
            SensorKind::Line => "line",
        };
        f.write_str(name)
    }
}

/// Decoded operator command.
///
/// Immediate-effect tokens are applied as soon as the control loop drains
/// them. Everything else becomes the live command and has to be refreshed
/// by the client to stay valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Stop,
    SetSensor { sensor: SensorKind, enabled: bool },
    ClearError,
    Live(String),
}
