// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Winch state machine components.
//!
//! State identities and their registry, the pending state sequence, the
//! events posted to the control loop, and the per-state entry behaviors.

pub mod context;
pub mod events;
pub mod sequence;
pub mod state;
pub mod states;

pub use context::Context;
pub use events::{CommandSource, SensorEvent, WinchEvent};
pub use sequence::{SequenceEntry, StateSequence};
pub use state::{Dispatch, StateId, Step};
