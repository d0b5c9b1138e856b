//! UDP transport: one connected datagram socket per receiver address.
//!
//! Each socket is bound to an ephemeral local port and `connect`ed to its
//! receiver, so `send` needs no destination argument and the OS filters
//! replies.  Sockets live in a `HashMap` keyed by the normalized
//! [`ReceiverAddress`], so lookups compare the (ip, port) value.
//!
//! # How connected UDP sockets fail (for beginners)
//!
//! UDP has no handshake, so `connect` succeeds even when nothing listens on
//! the far side.  If the receiver is down, the remote host answers a datagram
//! with an ICMP "port unreachable", and the *next* `send` on that socket
//! returns `ConnectionRefused`.  That error is reported for the frame and the
//! socket stays usable for the following frames.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};

use flipdot_core::{ReceiverAddress, TransportKind};
use tracing::{debug, info, warn};

use super::{Transport, TransportError, TransportOptions};
use crate::application::report::{DeliveryOutcome, Destination};

/// Datagram sockets, one per configured receiver.
#[derive(Debug)]
pub struct UdpTransport {
    sockets: HashMap<ReceiverAddress, UdpSocket>,
    order: Vec<ReceiverAddress>,
}

impl UdpTransport {
    /// Binds and connects one socket per address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for an unparsable address or a socket that
    /// cannot be bound or connected.
    pub fn connect(
        addresses: &[ReceiverAddress],
        options: &TransportOptions,
    ) -> Result<Self, TransportError> {
        let mut sockets = HashMap::with_capacity(addresses.len());
        let mut order = Vec::with_capacity(addresses.len());

        for address in addresses {
            let key = address.normalized();
            if sockets.contains_key(&key) {
                continue;
            }
            let target = address.socket_addr()?;
            let local: SocketAddr = if target.is_ipv4() {
                SocketAddr::from(([0, 0, 0, 0], 0))
            } else {
                SocketAddr::from(([0u16; 8], 0))
            };

            let socket = UdpSocket::bind(local).map_err(|source| TransportError::Bind {
                address: address.clone(),
                source,
            })?;
            socket
                .connect(target)
                .map_err(|source| TransportError::Connect {
                    address: address.clone(),
                    source,
                })?;
            if let Err(e) = socket.set_write_timeout(options.write_timeout) {
                warn!("could not set write timeout for UDP {address}: {e}");
            }

            info!("UDP connected [{address}]");
            order.push(key.clone());
            sockets.insert(key, socket);
        }

        Ok(Self { sockets, order })
    }
}

impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn send(&mut self, dest: &Destination, frame: &[u8]) -> DeliveryOutcome {
        let Destination::Address(address) = dest else {
            return DeliveryOutcome::DestinationUnresolved;
        };
        let Some(socket) = self.sockets.get(&address.normalized()) else {
            debug!("no UDP socket for {address}; frame skipped");
            return DeliveryOutcome::DestinationUnresolved;
        };

        match socket.send(frame) {
            Ok(n) if n == frame.len() => DeliveryOutcome::Delivered,
            Ok(n) => DeliveryOutcome::TransportError(format!(
                "short datagram to {address}: {n} of {} bytes",
                frame.len()
            )),
            Err(e) => DeliveryOutcome::TransportError(format!("send to {address} failed: {e}")),
        }
    }

    fn close(&mut self) {
        for address in &self.order {
            if self.sockets.remove(address).is_some() {
                info!("UDP closed [{address}]");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
