// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Datagram decoding and response encoding.

use thiserror::Error;

use winch_core::{ClientCommand, SensorKind};

/// Largest datagram accepted from a client.
pub const MAX_DATAGRAM: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,

    #[error("command is not valid UTF-8")]
    InvalidUtf8,

    #[error("command longer than 1024 bytes")]
    TooLong,
}

/// Decode one datagram into a client command.
///
/// STOP, CLEARERROR and the sensor toggles take effect immediately; any
/// other text is forwarded verbatim as the live command.
pub fn decode_datagram(datagram: &[u8]) -> Result<ClientCommand, ProtocolError> {
    if datagram.len() > MAX_DATAGRAM {
        return Err(ProtocolError::TooLong);
    }
    let text = std::str::from_utf8(datagram).map_err(|_| ProtocolError::InvalidUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let command = match text.to_ascii_uppercase().as_str() {
        "STOP" => ClientCommand::Stop,
        "CLEARERROR" => ClientCommand::ClearError,
        "SLACKON" => sensor(SensorKind::Slack, true),
        "SLACKOFF" => sensor(SensorKind::Slack, false),
        "DOCKON" => sensor(SensorKind::Dock, true),
        "DOCKOFF" => sensor(SensorKind::Dock, false),
        "LINEON" => sensor(SensorKind::Line, true),
        "LINEOFF" => sensor(SensorKind::Line, false),
        _ => ClientCommand::Live(text.to_string()),
    };
    Ok(command)
}

fn sensor(sensor: SensorKind, enabled: bool) -> ClientCommand {
    ClientCommand::SetSensor { sensor, enabled }
}

/// Encode a status line for sending back to a client.
pub fn encode_response(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len() + 1);
    out.extend_from_slice(line.trim_end().as_bytes());
    out.push(b'\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_tokens() {
        assert_eq!(decode_datagram(b"STOP"), Ok(ClientCommand::Stop));
        assert_eq!(decode_datagram(b"clearerror\n"), Ok(ClientCommand::ClearError));
        assert_eq!(
            decode_datagram(b"SLACKOFF"),
            Ok(ClientCommand::SetSensor {
                sensor: SensorKind::Slack,
                enabled: false
            })
        );
        assert_eq!(
            decode_datagram(b" LINEON "),
            Ok(ClientCommand::SetSensor {
                sensor: SensorKind::Line,
                enabled: true
            })
        );
        assert_eq!(
            decode_datagram(b"DOCKON"),
            Ok(ClientCommand::SetSensor {
                sensor: SensorKind::Dock,
                enabled: true
            })
        );
    }

    #[test]
    fn test_other_text_is_live() {
        assert_eq!(
            decode_datagram(b"MANOUT"),
            Ok(ClientCommand::Live("MANOUT".to_string()))
        );
        assert_eq!(
            decode_datagram(b"CAST 10 1.1 60\r\n"),
            Ok(ClientCommand::Live("CAST 10 1.1 60".to_string()))
        );
        assert_eq!(
            decode_datagram(b"STOP NOW"),
            Ok(ClientCommand::Live("STOP NOW".to_string()))
        );
    }

    #[test]
    fn test_rejects_bad_datagrams() {
        assert_eq!(decode_datagram(b""), Err(ProtocolError::Empty));
        assert_eq!(decode_datagram(b"  \n"), Err(ProtocolError::Empty));
        assert_eq!(decode_datagram(&[0xff, 0xfe]), Err(ProtocolError::InvalidUtf8));
        assert_eq!(
            decode_datagram(&vec![b'A'; MAX_DATAGRAM + 1]),
            Err(ProtocolError::TooLong)
        );
    }

    #[test]
    fn test_encode_response_single_line() {
        assert_eq!(encode_response("Stopped"), b"Stopped\n".to_vec());
        assert_eq!(encode_response("Error cleared\n"), b"Error cleared\n".to_vec());
    }
}
