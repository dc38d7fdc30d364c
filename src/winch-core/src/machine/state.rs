// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

/// Identity of a registered winch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    Init,
    Standby,
    Monitor,
    Cast,
    DownCast,
    Soak,
    UpCast,
    ManualOut,
    ManualIn,
    Error,
    Stop,
    ReadData,
    Help,
}

impl StateId {
    pub const ALL: [StateId; 13] = [
        StateId::Init,
        StateId::Standby,
        StateId::Monitor,
        StateId::Cast,
        StateId::DownCast,
        StateId::Soak,
        StateId::UpCast,
        StateId::ManualOut,
        StateId::ManualIn,
        StateId::Error,
        StateId::Stop,
        StateId::ReadData,
        StateId::Help,
    ];

    /// Name used in the registry and on the wire.
    pub fn name(self) -> &'static str {
        match self {
            StateId::Init => "INIT",
            StateId::Standby => "STDBY",
            StateId::Monitor => "MONITOR",
            StateId::Cast => "CAST",
            StateId::DownCast => "DOWNCAST",
            StateId::Soak => "SOAK",
            StateId::UpCast => "UPCAST",
            StateId::ManualOut => "MANOUT",
            StateId::ManualIn => "MANIN",
            StateId::Error => "ERROR",
            StateId::Stop => "STOP",
            StateId::ReadData => "READDATA",
            StateId::Help => "HELP",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one entry-behavior invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Goal not reached; re-invoke on the next tick.
    Continue,
    /// Goal reached; the loop removes the state from the sequence head.
    Done,
}

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Executed(StateId, Step),
    /// Target was not registered; the current state was re-entered instead.
    Unknown,
}
