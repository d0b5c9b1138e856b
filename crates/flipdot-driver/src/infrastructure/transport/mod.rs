//! Transport infrastructure: the physical links to the panel controllers.
//!
//! # Sub-modules
//!
//! - **`serial`** – One serial port shared by every panel.  Panels are told
//!   apart only by the screen id in the frame header.
//!
//! - **`udp`** – One connected datagram socket per receiver address.  Each
//!   frame goes out as exactly one datagram.
//!
//! - **`tcp`** – One persistent stream per receiver address.  A failed write
//!   marks the stream disconnected; there is no reconnect.
//!
//! All three implement the application's [`Transport`] trait.  A transport is opened once when the
//! driver is enabled, then moved into the dispatch worker thread, which is the
//! only code that ever writes to it.  Each `send` writes one complete frame
//! with a single `write_all`/`send` call and reports a `DeliveryOutcome`
//! instead of returning an error.

pub mod serial;
pub mod tcp;
pub mod udp;

use std::time::Duration;

use flipdot_core::{DisplaySettings, GeometryError, ReceiverAddress};
use thiserror::Error;

pub use crate::application::dispatch::Transport;
pub use flipdot_core::TransportKind;
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

/// Errors raised while opening a transport at activation.
///
/// Write failures after activation are never errors; they become
/// `DeliveryOutcome::TransportError` entries in the frame report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serial port could not be opened with the configured settings.
    #[error("failed to open serial port {port}: {source}")]
    Serial {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// A configured serial setting has no equivalent on this platform.
    #[error("unsupported serial setting: {0}")]
    UnsupportedSetting(String),

    /// A receiver address is not a literal IP address.
    #[error(transparent)]
    InvalidAddress(#[from] GeometryError),

    /// The local datagram socket could not be bound.
    #[error("failed to bind UDP socket for {address}: {source}")]
    Bind {
        address: ReceiverAddress,
        #[source]
        source: std::io::Error,
    },

    /// The socket could not be connected to the receiver.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: ReceiverAddress,
        #[source]
        source: std::io::Error,
    },
}

/// Timeouts applied to the transport handles.
///
/// `None` means the OS default: a stalled link blocks the dispatch worker
/// until the write completes or fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub write_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

/// Opens the transport selected for this activation.
///
/// # Errors
///
/// Returns [`TransportError`] if any handle fails to open; handles opened
/// before the failure are closed again.
pub fn open_transport(
    kind: TransportKind,
    settings: &DisplaySettings,
    options: &TransportOptions,
) -> Result<Box<dyn Transport>, TransportError> {
    let transport: Box<dyn Transport> = match kind {
        TransportKind::Serial => Box::new(SerialTransport::open(&settings.link, options)?),
        TransportKind::Udp => Box::new(UdpTransport::connect(&settings.rx_addresses, options)?),
        TransportKind::Tcp => Box::new(TcpTransport::connect(&settings.rx_addresses, options)?),
    };
    Ok(transport)
}
