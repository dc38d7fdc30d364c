// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Wire protocol for the winch command channel.
//!
//! One UTF-8 command per datagram in, one status line per datagram out.

pub mod codec;
pub mod mapping;

pub use codec::{decode_datagram, encode_response, ProtocolError, MAX_DATAGRAM};
pub use mapping::client_command_to_event;
