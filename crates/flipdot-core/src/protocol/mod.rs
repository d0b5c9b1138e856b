//! Protocol module containing the panel controller wire framing.

pub mod framing;

pub use framing::{format_message, opcode_for, FrameView, FramingError, FRAME_END, FRAME_START};
