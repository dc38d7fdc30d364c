// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod calibration;
pub mod client;
pub mod command;
pub mod controller;
pub mod machine;
pub mod settings;
pub mod timer;
pub mod winch;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use calibration::{CalibrationError, CalibrationTable};
pub use client::{ClientCommand, SensorKind};
pub use command::{CastPlan, CastRequest, CommandError};
pub use controller::{Controller, ControllerInfo, Direction, RotationCallback, SensorCallback};
pub use machine::{
    CommandSource, Context, Dispatch, SensorEvent, StateId, StateSequence, Step, WinchEvent,
};
pub use settings::WinchSettings;
pub use timer::Timer;
pub use winch::{Readings, SensorFlags, Winch};
