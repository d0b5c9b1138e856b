//! # flipdot-core
//!
//! Shared library for the flip-dot wall driver containing the panel geometry
//! model, the bit-packing frame encoder and the controller wire framing.
//!
//! This crate has zero dependencies on serial ports, sockets or threads.
//!
//! # Architecture overview (for beginners)
//!
//! A flip-dot wall is built from several physical panels.  Each dot is a small
//! disc that is either flipped "on" (bright side out) or "off".  The driver's
//! job is to take one rendered image and tell every panel which dots to flip.
//!
//! This crate (`flipdot-core`) is the pure foundation.  It defines:
//!
//! - **`domain`** – What the wall looks like and how an image becomes bits.
//!   [`DisplaySettings`] describes where each panel sits in the image,
//!   [`FrameEncoder`] packs every panel column into one byte, and
//!   [`intensity`](domain::intensity) turns raw captures into intensities.
//!
//! - **`protocol`** – How bytes travel to a panel controller: a 3-byte header
//!   (`0x80`, opcode, screen id), the column bytes, and a `0x8F` trailer.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `flipdot_core::FrameEncoder` instead of `flipdot_core::domain::encoder::FrameEncoder`.
pub use domain::encoder::{decode_column, EncodeError, FrameEncoder};
pub use domain::geometry::{
    DisplaySettings, GeometryError, LinkSettings, PanelGeometry, Parity, ReceiverAddress,
    SizeClassWarning, StopBits, TransportKind, MAX_PANEL_HEIGHT,
};
pub use domain::intensity::{intensities_from_rgba, IntensityError, TestPattern};
pub use protocol::framing::{format_message, opcode_for, FrameView, FramingError};
