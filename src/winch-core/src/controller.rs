// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Hardware abstraction for the winch drum.

use std::fmt;
use std::sync::Arc;

/// Level-change notification for a binary sensor.
pub type SensorCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Fired once per detected drum rotation.
pub type RotationCallback = Arc<dyn Fn() + Send + Sync>;

/// Drum drive direction. `Down` pays line out, `Up` reels it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::None => "none",
        };
        f.write_str(name)
    }
}

/// Static info describing a controller backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    pub name: String,
    pub description: String,
}

/// Capability interface implemented by hardware and simulated drums.
///
/// `up`, `down` and `off` are unguarded primitives; safety checks are the
/// caller's job. Callbacks may be invoked from any thread.
pub trait Controller: Send {
    fn info(&self) -> &ControllerInfo;

    fn up(&mut self);
    fn down(&mut self);
    fn off(&mut self);

    fn has_slack(&self) -> bool;
    fn is_docked(&self) -> bool;
    fn is_out_of_line(&self) -> bool;

    fn set_slack_callback(&mut self, callback: SensorCallback);
    fn set_dock_callback(&mut self, callback: SensorCallback);
    fn set_line_callback(&mut self, callback: SensorCallback);
    fn set_rotation_callback(&mut self, callback: RotationCallback);
}
