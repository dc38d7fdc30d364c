// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! UDP command intake for winch-server.
//!
//! Each datagram carries one command. Status lines from the control loop go
//! back to the most recent sender until it falls silent for the peer timeout.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use winch_core::{CommandSource, DynResult, WinchEvent};
use winch_protocol::{client_command_to_event, decode_datagram, encode_response, MAX_DATAGRAM};

/// Command source bound to a UDP address.
pub struct UdpCommandSource {
    addr: SocketAddr,
    peer_timeout: Duration,
    local_addr: Option<SocketAddr>,
}

impl UdpCommandSource {
    pub fn new(addr: SocketAddr, peer_timeout: Duration) -> Self {
        Self {
            addr,
            peer_timeout,
            local_addr: None,
        }
    }

    /// Bound address once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl CommandSource for UdpCommandSource {
    /// Bind the socket and spawn the intake task. Must run inside a tokio
    /// runtime.
    fn start(
        &mut self,
        events: UnboundedSender<WinchEvent>,
        responses: UnboundedReceiver<String>,
    ) -> DynResult<()> {
        let std_socket = std::net::UdpSocket::bind(self.addr)?;
        std_socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(std_socket)?;
        let local = socket.local_addr()?;
        self.local_addr = Some(local);
        info!("Listening for commands on udp://{}", local);

        tokio::spawn(run_intake(socket, events, responses, self.peer_timeout));
        Ok(())
    }
}

struct Peer {
    addr: SocketAddr,
    last_seen: Instant,
}

async fn run_intake(
    socket: UdpSocket,
    events: UnboundedSender<WinchEvent>,
    mut responses: UnboundedReceiver<String>,
    peer_timeout: Duration,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM + 1];
    let mut peer: Option<Peer> = None;
    let mut sweep = time::interval(peer_timeout);
    sweep.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Command socket receive failed: {}", e);
                        continue;
                    }
                };
                let now = Instant::now();
                if peer.as_ref().map_or(true, |p| p.addr != from) {
                    info!("Command client: {}", from);
                }
                peer = Some(Peer { addr: from, last_seen: now });

                match decode_datagram(&buf[..len]) {
                    Ok(command) => {
                        debug!("{} -> {:?}", from, command);
                        if events.send(client_command_to_event(command, now)).is_err() {
                            info!("Control loop gone, stopping command intake");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Rejected datagram from {}: {}", from, e);
                        let reply = encode_response(&format!("ERROR: {}", e));
                        if let Err(e) = socket.send_to(&reply, from).await {
                            warn!("Failed to reply to {}: {}", from, e);
                        }
                    }
                }
            }
            line = responses.recv() => {
                let Some(line) = line else {
                    info!("Response channel closed, stopping command intake");
                    return;
                };
                match peer.as_ref() {
                    Some(p) => {
                        if let Err(e) = socket.send_to(&encode_response(&line), p.addr).await {
                            error!("Failed to send response to {}: {}", p.addr, e);
                        }
                    }
                    None => debug!("No client for response: {}", line),
                }
            }
            _ = sweep.tick() => {
                if let Some(p) = peer.as_ref() {
                    if p.last_seen.elapsed() >= peer_timeout {
                        info!("Command client {} timed out", p.addr);
                        peer = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use winch_core::{ClientCommand, SensorKind};

    async fn started() -> (
        SocketAddr,
        mpsc::UnboundedReceiver<WinchEvent>,
        mpsc::UnboundedSender<String>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let mut source =
            UdpCommandSource::new("127.0.0.1:0".parse().unwrap(), Duration::from_secs(5));
        source.start(events_tx, responses_rx).unwrap();
        (source.local_addr().unwrap(), events_rx, responses_tx)
    }

    async fn client() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    async fn recv_line(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 256];
        let (len, _) = time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_datagrams_become_events() {
        let (addr, mut events, _responses) = started().await;
        let client = client().await;

        client.send_to(b"MANOUT", addr).await.unwrap();
        client.send_to(b"slackoff\n", addr).await.unwrap();

        match events.recv().await.unwrap() {
            WinchEvent::Client { command, .. } => {
                assert_eq!(command, ClientCommand::Live("MANOUT".to_string()))
            }
            other => panic!("unexpected event {:?}", other),
        }
        match events.recv().await.unwrap() {
            WinchEvent::Client { command, .. } => assert_eq!(
                command,
                ClientCommand::SetSensor {
                    sensor: SensorKind::Slack,
                    enabled: false
                }
            ),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_responses_go_to_latest_sender() {
        let (addr, mut events, responses) = started().await;
        let first = client().await;
        let second = client().await;

        first.send_to(b"READDATA", addr).await.unwrap();
        events.recv().await.unwrap();
        second.send_to(b"HELP", addr).await.unwrap();
        events.recv().await.unwrap();

        responses.send("Stopped".to_string()).unwrap();
        assert_eq!(recv_line(&second).await, "Stopped\n");
    }

    #[tokio::test]
    async fn test_bad_datagram_gets_error_reply() {
        let (addr, mut events, _responses) = started().await;
        let client = client().await;

        client.send_to(&[0xff, 0xfe], addr).await.unwrap();
        let reply = recv_line(&client).await;
        assert!(reply.starts_with("ERROR:"));
        assert!(events.try_recv().is_err());
    }
}
