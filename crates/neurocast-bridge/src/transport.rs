//! OSC over UDP value sink

use neurocast_core::{NeurocastError, NeurocastResult, ValueSink};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Sends each value as its own OSC message with one float32 argument.
///
/// Fire-and-forget: nothing is acknowledged or retried.
#[derive(Debug)]
pub struct OscSink {
    socket: UdpSocket,
    target: SocketAddr,
    sent: u64,
}

impl OscSink {
    /// Bind an ephemeral local port and resolve `host:port`
    pub fn connect(host: &str, port: u16) -> NeurocastResult<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|e| transport_error(format!("cannot resolve {}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| transport_error(format!("{}:{} resolved to no address", host, port)))?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| transport_error(format!("failed to bind UDP socket: {}", e)))?;

        tracing::info!(addr = %target, "OSC sink ready");

        Ok(OscSink {
            socket,
            target,
            sent: 0,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Messages handed to the socket so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

/// Encode one `/address value` message
pub fn encode_message(address: &str, value: f64) -> NeurocastResult<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: vec![OscType::Float(value as f32)],
    });
    encoder::encode(&packet).map_err(|e| transport_error(format!("failed to encode {}: {:?}", address, e)))
}

fn transport_error(reason: String) -> NeurocastError {
    NeurocastError::Transport { reason }
}

impl ValueSink for OscSink {
    fn send(&mut self, address: &str, value: f64) -> NeurocastResult<()> {
        let bytes = encode_message(address, value)?;
        self.socket
            .send_to(&bytes, self.target)
            .map_err(|e| transport_error(format!("send to {} failed: {}", self.target, e)))?;
        self.sent += 1;
        Ok(())
    }
}
