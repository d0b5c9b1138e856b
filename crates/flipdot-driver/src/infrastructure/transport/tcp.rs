//! TCP transport: one persistent stream per receiver address.
//!
//! Streams are opened at activation.  A frame is written with a single
//! `write_all`, so frames never interleave on the wire as long as only the
//! dispatch worker writes.  When a write fails the stream is shut down and
//! marked disconnected; later frames for that receiver report
//! "not connected" until the driver is re-enabled.

use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, TcpStream};

use flipdot_core::{ReceiverAddress, TransportKind};
use tracing::{debug, info, warn};

use super::{Transport, TransportError, TransportOptions};
use crate::application::report::{DeliveryOutcome, Destination};

/// Streams keyed by normalized receiver address.  `None` marks a stream that
/// failed and was closed.
#[derive(Debug)]
pub struct TcpTransport {
    streams: HashMap<ReceiverAddress, Option<TcpStream>>,
    order: Vec<ReceiverAddress>,
}

impl TcpTransport {
    /// Connects to every receiver.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for an unparsable address or a refused
    /// connection.  Streams opened before the failure are dropped.
    pub fn connect(
        addresses: &[ReceiverAddress],
        options: &TransportOptions,
    ) -> Result<Self, TransportError> {
        let mut streams = HashMap::with_capacity(addresses.len());
        let mut order = Vec::with_capacity(addresses.len());

        for address in addresses {
            let key = address.normalized();
            if streams.contains_key(&key) {
                continue;
            }
            let target = address.socket_addr()?;
            let connected = match options.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&target, timeout),
                None => TcpStream::connect(target),
            };
            let stream = connected.map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;

            if let Err(e) = stream.set_nodelay(true) {
                debug!("set_nodelay failed for {address}: {e}");
            }
            if let Err(e) = stream.set_write_timeout(options.write_timeout) {
                warn!("could not set write timeout for TCP {address}: {e}");
            }

            info!("TCP connected [{address}]");
            order.push(key.clone());
            streams.insert(key, Some(stream));
        }

        Ok(Self { streams, order })
    }

    /// `true` if the stream for `address` is still usable.
    pub fn is_connected(&self, address: &ReceiverAddress) -> bool {
        matches!(self.streams.get(&address.normalized()), Some(Some(_)))
    }
}

impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn send(&mut self, dest: &Destination, frame: &[u8]) -> DeliveryOutcome {
        let Destination::Address(address) = dest else {
            return DeliveryOutcome::DestinationUnresolved;
        };
        let Some(slot) = self.streams.get_mut(&address.normalized()) else {
            debug!("no TCP stream for {address}; frame skipped");
            return DeliveryOutcome::DestinationUnresolved;
        };
        let Some(stream) = slot.as_mut() else {
            return DeliveryOutcome::TransportError(format!("{address} not connected"));
        };

        match stream.write_all(frame) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!("TCP write to {address} failed, closing stream: {e}");
                let _ = stream.shutdown(Shutdown::Both);
                *slot = None;
                DeliveryOutcome::TransportError(e.to_string())
            }
        }
    }

    fn close(&mut self) {
        for address in &self.order {
            if let Some(Some(stream)) = self.streams.remove(address) {
                let _ = stream.shutdown(Shutdown::Both);
                info!("TCP closed [{address}]");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
