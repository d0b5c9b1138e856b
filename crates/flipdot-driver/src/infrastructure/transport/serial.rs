//! Serial transport: every panel shares one port.
//!
//! The port is opened once at activation with the configured baud rate,
//! parity, data bits and stop bits, and stays open until the driver is
//! disabled.  Frames are written back to back; the controllers pick out their
//! own data by the screen id in the frame header.
//!
//! The settings document can name parity modes (`Mark`, `Space`) and a stop
//! bit count (`OnePointFive`) that the `serialport` crate cannot express.
//! Those are rejected when the port is opened rather than silently replaced.

use std::io::Write;
use std::time::Duration;

use flipdot_core::{LinkSettings, Parity, StopBits, TransportKind};
use tracing::{info, warn};

use super::{Transport, TransportError, TransportOptions};
use crate::application::report::{DeliveryOutcome, Destination};

/// Write timeout used when none is configured.
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_secs(1);

// ── Setting conversion ────────────────────────────────────────────────────────

pub(crate) fn map_parity(parity: Parity) -> Result<serialport::Parity, TransportError> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(TransportError::UnsupportedSetting(format!(
            "parity {parity:?}"
        ))),
    }
}

pub(crate) fn map_stop_bits(stop_bits: StopBits) -> Result<serialport::StopBits, TransportError> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(TransportError::UnsupportedSetting(
            "stop bits OnePointFive".to_string(),
        )),
    }
}

pub(crate) fn map_data_bits(data_bits: u8) -> Result<serialport::DataBits, TransportError> {
    match data_bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        n => Err(TransportError::UnsupportedSetting(format!("data bits {n}"))),
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// The shared serial link.
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    /// Opens the port described by `link`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnsupportedSetting`] for settings the
    /// platform cannot express, or [`TransportError::Serial`] if the OS
    /// refuses to open the port.
    pub fn open(link: &LinkSettings, options: &TransportOptions) -> Result<Self, TransportError> {
        let parity = map_parity(link.parity)?;
        let stop_bits = map_stop_bits(link.stop_bits)?;
        let data_bits = map_data_bits(link.data_bits)?;

        let port = serialport::new(link.com_port.as_str(), link.baud_rate)
            .parity(parity)
            .stop_bits(stop_bits)
            .data_bits(data_bits)
            .timeout(options.write_timeout.unwrap_or(DEFAULT_SERIAL_TIMEOUT))
            .open()
            .map_err(|source| TransportError::Serial {
                port: link.com_port.clone(),
                source,
            })?;

        info!(
            "serial port {} open at {} baud ({:?}, {} data bits, {:?} stop bits)",
            link.com_port, link.baud_rate, link.parity, link.data_bits, link.stop_bits
        );

        Ok(Self {
            port_name: link.com_port.clone(),
            port: Some(port),
        })
    }
}

impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn send(&mut self, _dest: &Destination, frame: &[u8]) -> DeliveryOutcome {
        let Some(port) = self.port.as_mut() else {
            return DeliveryOutcome::TransportError(format!("{} is closed", self.port_name));
        };
        match port.write_all(frame) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!("serial write to {} failed: {e}", self.port_name);
                DeliveryOutcome::TransportError(e.to_string())
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush() {
                warn!("flushing {} on close failed: {e}", self.port_name);
            }
            info!("serial port {} closed", self.port_name);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
