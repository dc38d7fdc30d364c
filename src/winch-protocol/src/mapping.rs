// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tokio::time::Instant;

use winch_core::{ClientCommand, WinchEvent};

/// Wrap a decoded command for posting to the control loop.
pub fn client_command_to_event(command: ClientCommand, received_at: Instant) -> WinchEvent {
    WinchEvent::Client {
        command,
        received_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_carries_receive_time() {
        let now = Instant::now();
        let event = client_command_to_event(ClientCommand::Stop, now);
        assert_eq!(
            event,
            WinchEvent::Client {
                command: ClientCommand::Stop,
                received_at: now
            }
        );
    }
}
