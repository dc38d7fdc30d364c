// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Events posted to the control loop.
//!
//! Controller callbacks and the command intake run outside the loop. They
//! never touch winch state directly; they post events that the loop drains
//! at the start of each tick.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::client::ClientCommand;
use crate::DynResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    Slack(bool),
    Dock(bool),
    OutOfLine(bool),
    /// Drum pulse, stamped when the controller reported it.
    Rotation(Instant),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WinchEvent {
    Sensor(SensorEvent),
    Client {
        command: ClientCommand,
        received_at: Instant,
    },
}

/// Background producer of operator commands.
pub trait CommandSource: Send {
    /// Start intake. Decoded commands go to `events`; status lines to be
    /// sent back to the most recent peer arrive on `responses`.
    fn start(
        &mut self,
        events: UnboundedSender<WinchEvent>,
        responses: UnboundedReceiver<String>,
    ) -> DynResult<()>;
}
