//! Display wall geometry: panels, link parameters and receiver addresses.
//!
//! A flip-dot wall is a grid of physical panels.  Each panel covers a
//! rectangle of the full rendered frame, described by its origin column/row
//! (`startX`, `startY`) and its extent (`width` columns × `height` rows).
//! Every column of a panel is packed into a single byte on the wire, so a
//! panel is never taller than 8 dots.
//!
//! ```text
//!  column 0                                   lineStride - 1
//!  ┌─────────────────────┬─────────────────────┐  row 0
//!  │ panel id 3          │ panel id 4          │
//!  │ startX 0, startY 0  │ startX 28, startY 0 │
//!  ├─────────────────────┼─────────────────────┤  row 7
//!  │ panel id 5          │ panel id 6          │
//!  │ startX 0, startY 7  │ startX 28, startY 7 │
//!  └─────────────────────┴─────────────────────┘  row 13
//! ```
//!
//! [`DisplaySettings`] is loaded once when the driver is enabled and is
//! immutable afterwards.  Its serde attributes follow the camelCase key names
//! of the settings document, so the same struct reads both the JSON and the
//! TOML form.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::framing::is_known_size_class;

/// Maximum number of rows a panel may have: one bit per row in a column byte.
pub const MAX_PANEL_HEIGHT: usize = 8;

/// Errors produced while validating a [`DisplaySettings`] document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// The document lists no panels at all.
    #[error("settings contain no panels")]
    NoPanels,

    /// `lineStride` must be a positive column count.
    #[error("lineStride must be greater than zero")]
    ZeroLineStride,

    /// A panel has a zero width, a zero height or is taller than 8 rows.
    #[error("panel {panel_id}: invalid extent {width}x{height} (height must be 1..=8, width > 0)")]
    InvalidPanelExtent {
        panel_id: u8,
        width: usize,
        height: usize,
    },

    /// A panel's columns extend past the end of a source row.
    #[error("panel {panel_id}: columns {start_x}..{end_x} exceed lineStride {line_stride}")]
    PanelOutsideStride {
        panel_id: u8,
        start_x: usize,
        end_x: usize,
        line_stride: usize,
    },

    /// A panel's `startY` is so large that its last row cannot be addressed.
    #[error("panel {panel_id}: startY {start_y} plus height overflows")]
    PanelRowsOverflow { panel_id: u8, start_y: usize },

    /// The wall's total dot count does not fit in `usize`.
    #[error("total dot count of the wall overflows")]
    WallTooLarge,

    /// A network transport was selected but no receiver addresses are configured.
    #[error("{transport} transport selected but rxAddresses is empty")]
    NoReceivers { transport: TransportKind },

    /// The same receiver address appears twice in `rxAddresses`.
    #[error("receiver address {0} is listed more than once")]
    DuplicateReceiver(ReceiverAddress),

    /// A panel's destination does not match any configured receiver address.
    #[error("panel {panel_id}: destination {destination} is not in rxAddresses")]
    UnresolvedDestination {
        panel_id: u8,
        destination: ReceiverAddress,
    },

    /// An address string could not be parsed into an IP socket address.
    #[error("invalid receiver address {address}: {reason}")]
    InvalidAddress {
        address: ReceiverAddress,
        reason: String,
    },
}

// ── Transport selection ───────────────────────────────────────────────────────

/// The physical link used to reach the panel controllers.
///
/// Chosen once at activation; a running driver never switches transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// A single RS-485/RS-232 serial link shared by every panel.
    #[default]
    Serial,
    /// One connected datagram socket per receiver address.
    Udp,
    /// One persistent stream socket per receiver address.
    Tcp,
}

impl TransportKind {
    /// Returns `true` for the transports that address panels by (ip, port).
    pub fn is_network(self) -> bool {
        matches!(self, TransportKind::Udp | TransportKind::Tcp)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Serial => "serial",
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
        };
        f.write_str(name)
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(TransportKind::Serial),
            "udp" => Ok(TransportKind::Udp),
            "tcp" => Ok(TransportKind::Tcp),
            other => Err(format!("unknown transport {other:?} (expected serial, udp or tcp)")),
        }
    }
}

// ── Receiver addresses ────────────────────────────────────────────────────────

/// An (ip, port) pair identifying one panel controller on the network.
///
/// Compared by value: two addresses with the same ip text and port are the
/// same key in the per-address socket table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiverAddress {
    pub ip: String,
    pub port: u16,
}

impl ReceiverAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns a copy with surrounding whitespace stripped from the ip text.
    pub fn normalized(&self) -> Self {
        Self {
            ip: self.ip.trim().to_string(),
            port: self.port,
        }
    }

    /// Parses the address into a [`SocketAddr`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidAddress`] if the ip text is not a
    /// literal IPv4/IPv6 address.
    pub fn socket_addr(&self) -> Result<SocketAddr, GeometryError> {
        let ip = self
            .ip
            .trim()
            .parse::<std::net::IpAddr>()
            .map_err(|e| GeometryError::InvalidAddress {
                address: self.clone(),
                reason: e.to_string(),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl fmt::Display for ReceiverAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

// ── Panels ────────────────────────────────────────────────────────────────────

/// Placement, extent and network identity of one physical panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelGeometry {
    /// Screen id written into the frame header on network transports.
    pub id: u8,
    /// First source column covered by the panel.
    pub start_x: usize,
    /// First source row covered by the panel.
    pub start_y: usize,
    /// Number of columns; also the number of data bytes in the panel's frame.
    pub width: usize,
    /// Number of rows, at most [`MAX_PANEL_HEIGHT`].
    pub height: usize,
    /// Controller ip, used only by UDP/TCP.
    #[serde(default)]
    pub ip: String,
    /// Controller port, used only by UDP/TCP.
    #[serde(default)]
    pub rx_port: u16,
}

impl PanelGeometry {
    /// Number of dots this panel contributes to the wall.
    ///
    /// Saturates at `usize::MAX` for extents [`DisplaySettings::validate`]
    /// would reject.
    pub fn dot_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// One past the last source column covered by the panel.
    ///
    /// Saturates at `usize::MAX`, which no `lineStride` can contain.
    pub fn end_x(&self) -> usize {
        self.start_x.saturating_add(self.width)
    }

    /// One past the last source row covered by the panel.
    ///
    /// Saturates at `usize::MAX`, which no frame can contain.
    pub fn end_y(&self) -> usize {
        self.start_y.saturating_add(self.height)
    }

    /// The receiver address this panel's frames are sent to.
    pub fn destination(&self) -> ReceiverAddress {
        ReceiverAddress::new(self.ip.clone(), self.rx_port)
    }
}

// ── Serial link parameters ────────────────────────────────────────────────────

/// Serial parity setting.
///
/// The settings document may spell it by name or by the numeric value older
/// tooling wrote (`0`=None, `1`=Odd, `2`=Even, `3`=Mark, `4`=Space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "SettingRepr")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

/// Serial stop-bit setting.
///
/// Numeric spellings: `1`=One, `2`=Two, `3`=OnePointFive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "SettingRepr")]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

/// Either spelling of an enumerated serial setting in the document.
#[derive(Deserialize)]
#[serde(untagged)]
enum SettingRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<SettingRepr> for Parity {
    type Error = String;

    fn try_from(repr: SettingRepr) -> Result<Self, Self::Error> {
        match repr {
            SettingRepr::Code(0) => Ok(Parity::None),
            SettingRepr::Code(1) => Ok(Parity::Odd),
            SettingRepr::Code(2) => Ok(Parity::Even),
            SettingRepr::Code(3) => Ok(Parity::Mark),
            SettingRepr::Code(4) => Ok(Parity::Space),
            SettingRepr::Code(n) => Err(format!("unknown parity code {n}")),
            SettingRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "none" => Ok(Parity::None),
                "odd" => Ok(Parity::Odd),
                "even" => Ok(Parity::Even),
                "mark" => Ok(Parity::Mark),
                "space" => Ok(Parity::Space),
                _ => Err(format!("unknown parity {name:?}")),
            },
        }
    }
}

impl TryFrom<SettingRepr> for StopBits {
    type Error = String;

    fn try_from(repr: SettingRepr) -> Result<Self, Self::Error> {
        match repr {
            SettingRepr::Code(1) => Ok(StopBits::One),
            SettingRepr::Code(2) => Ok(StopBits::Two),
            SettingRepr::Code(3) => Ok(StopBits::OnePointFive),
            SettingRepr::Code(n) => Err(format!("unknown stop bits code {n}")),
            SettingRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "one" => Ok(StopBits::One),
                "onepointfive" => Ok(StopBits::OnePointFive),
                "two" => Ok(StopBits::Two),
                _ => Err(format!("unknown stop bits {name:?}")),
            },
        }
    }
}

/// Link parameters: the serial port settings plus the source row stride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSettings {
    #[serde(default = "default_com_port")]
    pub com_port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub stop_bits: StopBits,
    /// Pixel columns per source row; must equal the frame's logical row width.
    pub line_stride: usize,
}

fn default_com_port() -> String {
    "COM1".to_string()
}
fn default_baud_rate() -> u32 {
    57600
}
fn default_data_bits() -> u8 {
    8
}

impl LinkSettings {
    /// Link settings with the document defaults and the given stride.
    pub fn with_line_stride(line_stride: usize) -> Self {
        Self {
            com_port: default_com_port(),
            baud_rate: default_baud_rate(),
            parity: Parity::default(),
            data_bits: default_data_bits(),
            stop_bits: StopBits::default(),
            line_stride,
        }
    }
}

// ── Aggregate ─────────────────────────────────────────────────────────────────

/// A panel whose width is not one of the data lengths the controllers
/// recognise (112, 28 or 56); its frames carry the `0x00` opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeClassWarning {
    pub panel_id: u8,
    pub width: usize,
}

/// Everything the driver needs to know about the wall, loaded once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    /// Panels in send order.
    pub panels: Vec<PanelGeometry>,
    #[serde(flatten)]
    pub link: LinkSettings,
    #[serde(default)]
    pub rx_addresses: Vec<ReceiverAddress>,
    /// Optional transport preference; the caller may override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
}

impl DisplaySettings {
    /// Total number of dots on the wall; the minimum encodable buffer length.
    pub fn dots_in_flipdot(&self) -> usize {
        self.panels
            .iter()
            .map(PanelGeometry::dot_count)
            .fold(0, usize::saturating_add)
    }

    /// Finds the receiver address matching `panel`'s configured destination.
    pub fn resolve_destination(&self, panel: &PanelGeometry) -> Option<&ReceiverAddress> {
        let wanted = panel.destination().normalized();
        self.rx_addresses
            .iter()
            .find(|candidate| candidate.normalized() == wanted)
    }

    /// Checks the geometry invariants and, for network transports, that
    /// every panel destination resolves to a receiver address.
    ///
    /// # Errors
    ///
    /// Returns the first [`GeometryError`] found, in document order.
    pub fn validate(&self, transport: TransportKind) -> Result<(), GeometryError> {
        if self.panels.is_empty() {
            return Err(GeometryError::NoPanels);
        }
        let line_stride = self.link.line_stride;
        if line_stride == 0 {
            return Err(GeometryError::ZeroLineStride);
        }

        let mut dots = 0usize;
        for panel in &self.panels {
            if panel.width == 0 || panel.height == 0 || panel.height > MAX_PANEL_HEIGHT {
                return Err(GeometryError::InvalidPanelExtent {
                    panel_id: panel.id,
                    width: panel.width,
                    height: panel.height,
                });
            }
            let end_x = panel.start_x.checked_add(panel.width);
            if end_x.map_or(true, |end_x| end_x > line_stride) {
                return Err(GeometryError::PanelOutsideStride {
                    panel_id: panel.id,
                    start_x: panel.start_x,
                    end_x: panel.end_x(),
                    line_stride,
                });
            }
            if panel.start_y.checked_add(panel.height).is_none() {
                return Err(GeometryError::PanelRowsOverflow {
                    panel_id: panel.id,
                    start_y: panel.start_y,
                });
            }
            dots = panel
                .width
                .checked_mul(panel.height)
                .and_then(|n| dots.checked_add(n))
                .ok_or(GeometryError::WallTooLarge)?;
        }

        if !transport.is_network() {
            return Ok(());
        }

        if self.rx_addresses.is_empty() {
            return Err(GeometryError::NoReceivers { transport });
        }
        for (i, address) in self.rx_addresses.iter().enumerate() {
            address.socket_addr()?;
            let key = address.normalized();
            if self.rx_addresses[..i].iter().any(|a| a.normalized() == key) {
                return Err(GeometryError::DuplicateReceiver(address.clone()));
            }
        }
        for panel in &self.panels {
            if self.resolve_destination(panel).is_none() {
                return Err(GeometryError::UnresolvedDestination {
                    panel_id: panel.id,
                    destination: panel.destination(),
                });
            }
        }
        Ok(())
    }

    /// Lists panels whose width falls outside the recognised size classes.
    pub fn size_class_warnings(&self) -> Vec<SizeClassWarning> {
        self.panels
            .iter()
            .filter(|p| !is_known_size_class(p.width))
            .map(|p| SizeClassWarning {
                panel_id: p.id,
                width: p.width,
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(id: u8, start_x: usize, start_y: usize, width: usize, height: usize) -> PanelGeometry {
        PanelGeometry {
            id,
            start_x,
            start_y,
            width,
            height,
            ip: "10.0.0.5".to_string(),
            rx_port: 5000,
        }
    }

    fn two_panel_settings() -> DisplaySettings {
        DisplaySettings {
            panels: vec![panel(3, 0, 0, 28, 7), panel(4, 28, 0, 28, 7)],
            link: LinkSettings::with_line_stride(56),
            rx_addresses: vec![ReceiverAddress::new("10.0.0.5", 5000)],
            transport: None,
        }
    }

    #[test]
    fn test_dots_in_flipdot_sums_panel_areas() {
        // Arrange
        let settings = two_panel_settings();

        // Act / Assert
        assert_eq!(settings.dots_in_flipdot(), 2 * 28 * 7);
    }

    #[test]
    fn test_validate_accepts_well_formed_settings_for_every_transport() {
        let settings = two_panel_settings();
        assert_eq!(settings.validate(TransportKind::Serial), Ok(()));
        assert_eq!(settings.validate(TransportKind::Udp), Ok(()));
        assert_eq!(settings.validate(TransportKind::Tcp), Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty_panel_list() {
        let mut settings = two_panel_settings();
        settings.panels.clear();
        assert_eq!(
            settings.validate(TransportKind::Serial),
            Err(GeometryError::NoPanels)
        );
    }

    #[test]
    fn test_validate_rejects_zero_line_stride() {
        let mut settings = two_panel_settings();
        settings.link.line_stride = 0;
        assert_eq!(
            settings.validate(TransportKind::Serial),
            Err(GeometryError::ZeroLineStride)
        );
    }

    #[test]
    fn test_validate_rejects_panel_taller_than_a_byte() {
        // Arrange
        let mut settings = two_panel_settings();
        settings.panels[1].height = 9;

        // Act
        let result = settings.validate(TransportKind::Serial);

        // Assert
        assert_eq!(
            result,
            Err(GeometryError::InvalidPanelExtent {
                panel_id: 4,
                width: 28,
                height: 9
            })
        );
    }

    #[test]
    fn test_validate_rejects_panel_past_line_stride() {
        let mut settings = two_panel_settings();
        settings.panels[1].start_x = 30;
        assert!(matches!(
            settings.validate(TransportKind::Serial),
            Err(GeometryError::PanelOutsideStride {
                panel_id: 4,
                end_x: 58,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_start_x_that_overflows() {
        // Arrange: start_x + width wraps past usize::MAX
        let mut settings = two_panel_settings();
        settings.panels[1].start_x = usize::MAX;
        settings.panels[1].width = 2;

        // Act
        let result = settings.validate(TransportKind::Serial);

        // Assert
        assert_eq!(
            result,
            Err(GeometryError::PanelOutsideStride {
                panel_id: 4,
                start_x: usize::MAX,
                end_x: usize::MAX,
                line_stride: 56,
            })
        );
    }

    #[test]
    fn test_validate_rejects_start_y_that_overflows() {
        // Arrange
        let mut settings = two_panel_settings();
        settings.panels[0].start_y = usize::MAX - 3;

        // Act
        let result = settings.validate(TransportKind::Serial);

        // Assert
        assert_eq!(
            result,
            Err(GeometryError::PanelRowsOverflow {
                panel_id: 3,
                start_y: usize::MAX - 3,
            })
        );
    }

    #[test]
    fn test_validate_rejects_wall_whose_dot_count_overflows() {
        // Arrange: each panel alone fits the stride, together they overflow
        let half = usize::MAX / 2;
        let settings = DisplaySettings {
            panels: vec![panel(3, 0, 0, half, 2), panel(4, 0, 0, half, 2)],
            link: LinkSettings::with_line_stride(usize::MAX),
            rx_addresses: Vec::new(),
            transport: None,
        };

        // Act
        let result = settings.validate(TransportKind::Serial);

        // Assert
        assert_eq!(result, Err(GeometryError::WallTooLarge));
    }

    #[test]
    fn test_overflowing_extents_saturate_instead_of_panicking() {
        // Arrange
        let geometry = panel(3, usize::MAX, usize::MAX, usize::MAX, 2);
        let settings = DisplaySettings {
            panels: vec![geometry.clone(), geometry.clone()],
            link: LinkSettings::with_line_stride(56),
            rx_addresses: Vec::new(),
            transport: None,
        };

        // Act / Assert
        assert_eq!(geometry.end_x(), usize::MAX);
        assert_eq!(geometry.end_y(), usize::MAX);
        assert_eq!(geometry.dot_count(), usize::MAX);
        assert_eq!(settings.dots_in_flipdot(), usize::MAX);
    }

    #[test]
    fn test_validate_serial_ignores_missing_receivers() {
        // Serial never looks at rxAddresses.
        let mut settings = two_panel_settings();
        settings.rx_addresses.clear();
        assert_eq!(settings.validate(TransportKind::Serial), Ok(()));
    }

    #[test]
    fn test_validate_network_requires_receivers() {
        let mut settings = two_panel_settings();
        settings.rx_addresses.clear();
        assert_eq!(
            settings.validate(TransportKind::Udp),
            Err(GeometryError::NoReceivers {
                transport: TransportKind::Udp
            })
        );
    }

    #[test]
    fn test_validate_network_rejects_unresolved_destination() {
        // Arrange: panel 4 points at a controller that is not listed
        let mut settings = two_panel_settings();
        settings.panels[1].rx_port = 5001;

        // Act
        let result = settings.validate(TransportKind::Tcp);

        // Assert
        assert_eq!(
            result,
            Err(GeometryError::UnresolvedDestination {
                panel_id: 4,
                destination: ReceiverAddress::new("10.0.0.5", 5001),
            })
        );
    }

    #[test]
    fn test_validate_network_rejects_duplicate_receiver() {
        let mut settings = two_panel_settings();
        settings
            .rx_addresses
            .push(ReceiverAddress::new(" 10.0.0.5", 5000));
        assert!(matches!(
            settings.validate(TransportKind::Udp),
            Err(GeometryError::DuplicateReceiver(_))
        ));
    }

    #[test]
    fn test_validate_network_rejects_hostname_receiver() {
        let mut settings = two_panel_settings();
        settings.rx_addresses = vec![ReceiverAddress::new("wall.local", 5000)];
        assert!(matches!(
            settings.validate(TransportKind::Udp),
            Err(GeometryError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_resolve_destination_matches_by_value_not_identity() {
        // Arrange: a fresh, separately allocated address with the same value
        let settings = two_panel_settings();

        // Act
        let resolved = settings.resolve_destination(&settings.panels[0]);

        // Assert
        assert_eq!(resolved, Some(&ReceiverAddress::new("10.0.0.5", 5000)));
    }

    #[test]
    fn test_resolve_destination_ignores_surrounding_whitespace() {
        let mut settings = two_panel_settings();
        settings.panels[0].ip = "10.0.0.5 ".to_string();
        assert!(settings.resolve_destination(&settings.panels[0]).is_some());
    }

    #[test]
    fn test_size_class_warnings_flags_unrecognised_widths() {
        // Arrange: 28 is a known class, 30 is not
        let mut settings = two_panel_settings();
        settings.panels[1].width = 30;
        settings.link.line_stride = 58;

        // Act
        let warnings = settings.size_class_warnings();

        // Assert
        assert_eq!(
            warnings,
            vec![SizeClassWarning {
                panel_id: 4,
                width: 30
            }]
        );
    }

    #[test]
    fn test_transport_kind_parses_case_insensitively() {
        assert_eq!("UDP".parse::<TransportKind>(), Ok(TransportKind::Udp));
        assert_eq!(" tcp ".parse::<TransportKind>(), Ok(TransportKind::Tcp));
        assert_eq!("Serial".parse::<TransportKind>(), Ok(TransportKind::Serial));
        assert!("rs485".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_receiver_address_display_is_ip_colon_port() {
        assert_eq!(ReceiverAddress::new("10.1.2.3", 7000).to_string(), "10.1.2.3:7000");
    }

    #[test]
    fn test_socket_addr_parses_ipv4_literal() {
        let addr = ReceiverAddress::new("127.0.0.1", 9000).socket_addr().unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
    }

    // ── serde ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_json_document_with_numeric_enums() {
        // Arrange: the layout older tooling wrote, enums as integers
        let json = r#"{
            "panels": [
                { "id": 3, "startX": 0, "startY": 0, "width": 28, "height": 7,
                  "ip": "10.0.0.5", "rxPort": 5000 }
            ],
            "comPort": "/dev/ttyUSB0",
            "rxAddresses": [ { "ip": "10.0.0.5", "port": 5000 } ],
            "baudRate": 57600,
            "parity": 2,
            "dataBits": 8,
            "stopBits": 1,
            "lineStride": 28
        }"#;

        // Act
        let settings: DisplaySettings = serde_json::from_str(json).expect("deserialize");

        // Assert
        assert_eq!(settings.link.parity, Parity::Even);
        assert_eq!(settings.link.stop_bits, StopBits::One);
        assert_eq!(settings.link.com_port, "/dev/ttyUSB0");
        assert_eq!(settings.panels[0].start_x, 0);
        assert_eq!(settings.panels[0].rx_port, 5000);
        assert_eq!(settings.transport, None);
    }

    #[test]
    fn test_deserialize_json_document_with_named_enums_and_defaults() {
        let json = r#"{
            "panels": [ { "id": 1, "startX": 0, "startY": 0, "width": 4, "height": 2 } ],
            "parity": "Odd",
            "stopBits": "OnePointFive",
            "lineStride": 4,
            "transport": "udp"
        }"#;

        let settings: DisplaySettings = serde_json::from_str(json).expect("deserialize");

        assert_eq!(settings.link.parity, Parity::Odd);
        assert_eq!(settings.link.stop_bits, StopBits::OnePointFive);
        assert_eq!(settings.link.baud_rate, 57600);
        assert_eq!(settings.link.data_bits, 8);
        assert_eq!(settings.link.com_port, "COM1");
        assert!(settings.rx_addresses.is_empty());
        assert_eq!(settings.panels[0].ip, "");
        assert_eq!(settings.transport, Some(TransportKind::Udp));
    }

    #[test]
    fn test_deserialize_rejects_unknown_parity_code() {
        let json = r#"{ "panels": [], "parity": 9, "lineStride": 4 }"#;
        let result: Result<DisplaySettings, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_requires_line_stride() {
        let json = r#"{ "panels": [] }"#;
        let result: Result<DisplaySettings, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
