//! Wire framing for panel controller messages.
//!
//! Wire format (identical on serial, UDP and TCP):
//! ```text
//! [0x80][opcode:1][screen_id:1][data:N][0x8F]
//! ```
//! The opcode is chosen from the data length and the refresh flag:
//!
//! | data length | refresh | no refresh |
//! |-------------|---------|------------|
//! | 112         | `0x82`  | `0x81`     |
//! | 28          | `0x83`  | `0x84`     |
//! | 56          | `0x85`  | `0x86`     |
//! | other       | `0x00`  | `0x00`     |
//!
//! Data bytes are not escaped, so a receiver must know the data length of each
//! screen to split a stream; [`FrameView::split_stream`] does exactly that.

use thiserror::Error;

/// First byte of every frame.
pub const FRAME_START: u8 = 0x80;

/// Last byte of every frame.
pub const FRAME_END: u8 = 0x8F;

/// Header (start, opcode, screen id) plus trailer.
pub const FRAME_OVERHEAD: usize = 4;

/// Opcode written when the data length matches no known size class.
pub const OPCODE_UNKNOWN: u8 = 0x00;

/// Data lengths the controllers recognise, with their (refresh, no-refresh)
/// opcodes.
const SIZE_CLASSES: [(usize, u8, u8); 3] = [(112, 0x82, 0x81), (28, 0x83, 0x84), (56, 0x85, 0x86)];

/// Errors returned by [`FrameView::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("frame too short: {0} bytes, need at least {FRAME_OVERHEAD}")]
    TooShort(usize),

    #[error("missing start marker: got 0x{0:02X}")]
    MissingStart(u8),

    #[error("missing end marker: got 0x{0:02X}")]
    MissingEnd(u8),
}

/// Selects the opcode for a payload of `data_len` bytes.
pub fn opcode_for(data_len: usize, refresh: bool) -> u8 {
    SIZE_CLASSES
        .iter()
        .find(|(len, _, _)| *len == data_len)
        .map(|&(_, on_refresh, no_refresh)| if refresh { on_refresh } else { no_refresh })
        .unwrap_or(OPCODE_UNKNOWN)
}

/// Returns `true` if `data_len` maps to a real opcode.
pub fn is_known_size_class(data_len: usize) -> bool {
    SIZE_CLASSES.iter().any(|(len, _, _)| *len == data_len)
}

/// Wraps `data` for the panel selected by `screen_id`.
///
/// # Examples
///
/// ```rust
/// use flipdot_core::protocol::framing::format_message;
///
/// let frame = format_message(4, &[0x01; 28], true);
/// assert_eq!(&frame[..3], &[0x80, 0x83, 4]);
/// assert_eq!(frame.last(), Some(&0x8F));
/// assert_eq!(frame.len(), 28 + 4);
/// ```
pub fn format_message(screen_id: u8, data: &[u8], refresh: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_OVERHEAD + data.len());
    buf.push(FRAME_START);
    buf.push(opcode_for(data.len(), refresh));
    buf.push(screen_id);
    buf.extend_from_slice(data);
    buf.push(FRAME_END);
    buf
}

/// A borrowed view of one frame's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub opcode: u8,
    pub screen_id: u8,
    pub data: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Splits a complete frame into its fields.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError`] if the markers are missing or the slice is
    /// shorter than the fixed overhead.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FramingError> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(FramingError::TooShort(bytes.len()));
        }
        if bytes[0] != FRAME_START {
            return Err(FramingError::MissingStart(bytes[0]));
        }
        let last = bytes[bytes.len() - 1];
        if last != FRAME_END {
            return Err(FramingError::MissingEnd(last));
        }
        Ok(Self {
            opcode: bytes[1],
            screen_id: bytes[2],
            data: &bytes[3..bytes.len() - 1],
        })
    }

    /// Splits a byte stream holding back-to-back frames whose data lengths
    /// are known in advance (one entry per expected frame).
    ///
    /// Stops at the first frame that does not parse and returns what was
    /// recovered so far together with the unconsumed tail.
    pub fn split_stream(mut bytes: &'a [u8], data_lengths: &[usize]) -> (Vec<Self>, &'a [u8]) {
        let mut frames = Vec::with_capacity(data_lengths.len());
        for &len in data_lengths {
            let total = len + FRAME_OVERHEAD;
            if bytes.len() < total {
                break;
            }
            match Self::parse(&bytes[..total]) {
                Ok(frame) => frames.push(frame),
                Err(_) => break,
            }
            bytes = &bytes[total..];
        }
        (frames, bytes)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_for_known_lengths_with_refresh() {
        assert_eq!(opcode_for(112, true), 0x82);
        assert_eq!(opcode_for(28, true), 0x83);
        assert_eq!(opcode_for(56, true), 0x85);
    }

    #[test]
    fn test_opcode_for_known_lengths_without_refresh() {
        assert_eq!(opcode_for(112, false), 0x81);
        assert_eq!(opcode_for(28, false), 0x84);
        assert_eq!(opcode_for(56, false), 0x86);
    }

    #[test]
    fn test_opcode_for_unknown_length_is_zero() {
        for len in [0, 1, 4, 27, 29, 57, 111, 113, 224] {
            assert_eq!(opcode_for(len, true), OPCODE_UNKNOWN, "len {len}");
            assert_eq!(opcode_for(len, false), OPCODE_UNKNOWN, "len {len}");
        }
    }

    #[test]
    fn test_format_message_layout() {
        // Arrange
        let data = [0x11, 0x22, 0x33];

        // Act
        let frame = format_message(7, &data, true);

        // Assert
        assert_eq!(frame, vec![0x80, 0x00, 7, 0x11, 0x22, 0x33, 0x8F]);
    }

    #[test]
    fn test_format_message_empty_data_is_header_and_trailer() {
        assert_eq!(format_message(1, &[], false), vec![0x80, 0x00, 1, 0x8F]);
    }

    #[test]
    fn test_is_known_size_class() {
        assert!(is_known_size_class(28));
        assert!(is_known_size_class(56));
        assert!(is_known_size_class(112));
        assert!(!is_known_size_class(4));
    }

    #[test]
    fn test_frame_view_parse_extracts_fields() {
        let frame = format_message(3, &[0x7F; 56], false);
        let view = FrameView::parse(&frame).unwrap();
        assert_eq!(view.opcode, 0x86);
        assert_eq!(view.screen_id, 3);
        assert_eq!(view.data, &[0x7F; 56][..]);
    }

    #[test]
    fn test_frame_view_parse_rejects_bad_markers() {
        assert_eq!(FrameView::parse(&[0x80, 0, 1]), Err(FramingError::TooShort(3)));
        assert_eq!(
            FrameView::parse(&[0x81, 0, 1, 0x8F]),
            Err(FramingError::MissingStart(0x81))
        );
        assert_eq!(
            FrameView::parse(&[0x80, 0, 1, 0x00]),
            Err(FramingError::MissingEnd(0x00))
        );
    }

    #[test]
    fn test_split_stream_recovers_back_to_back_frames() {
        // Arrange
        let mut stream = format_message(1, &[1, 2], true);
        stream.extend(format_message(2, &[3, 4, 5], true));
        stream.extend([0x80, 0x00]);

        // Act
        let (frames, rest) = FrameView::split_stream(&stream, &[2, 3, 2]);

        // Assert
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, &[1, 2]);
        assert_eq!(frames[1].screen_id, 2);
        assert_eq!(rest, &[0x80, 0x00]);
    }
}
