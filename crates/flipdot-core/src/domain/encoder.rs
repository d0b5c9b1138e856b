//! Frame encoder: flat intensity buffer → one bit-packed byte run per panel.
//!
//! The renderer hands over one integer per source pixel, row-major, with
//! `lineStride` pixels per row.  For every panel column the encoder builds a
//! single byte by walking the panel's rows from the last (`height - 1`) up to
//! the first (`0`), shifting the running byte left and OR-ing in the
//! thresholded pixel:
//!
//! ```text
//!   panel rows        column byte (height = 7)
//!   row 0  ■   ──►   bit 0
//!   row 1  □   ──►   bit 1
//!   ...
//!   row 6  ■   ──►   bit 6      bit 7 always 0
//! ```
//!
//! A pixel is "on" when its value is strictly greater than the black point.
//!
//! With `top_to_bottom == false` the source row index is mirrored
//! (`totalRows - 1 - y`) so buffers read back upside down from a GPU render
//! target land the right way up on the wall.

use thiserror::Error;

use super::geometry::{DisplaySettings, PanelGeometry, MAX_PANEL_HEIGHT};

/// Reasons a buffer cannot be turned into panel bitmaps.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// The buffer holds fewer pixels than the wall has dots.
    #[error("undersized frame: need at least {needed} pixels, got {available}")]
    UndersizedFrame { needed: usize, available: usize },

    /// The stride is zero, so the buffer has no row structure.
    #[error("lineStride is zero")]
    ZeroLineStride,

    /// A panel reaches past the rows (or columns) the buffer actually has.
    #[error("panel {panel_id} needs {needed_rows} rows x {needed_cols} cols, buffer has {available_rows} x {line_stride}")]
    RegionOutOfBounds {
        panel_id: u8,
        needed_rows: usize,
        needed_cols: usize,
        available_rows: usize,
        line_stride: usize,
    },

    /// A panel is taller than the 8 bits a column byte can carry.
    #[error("panel {panel_id} is {height} rows tall; at most 8 fit in a column byte")]
    PanelTooTall { panel_id: u8, height: usize },
}

/// Converts intensity buffers into per-panel column bytes.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    panels: Vec<PanelGeometry>,
    line_stride: usize,
    dots_in_flipdot: usize,
}

impl FrameEncoder {
    pub fn new(settings: &DisplaySettings) -> Self {
        Self {
            panels: settings.panels.clone(),
            line_stride: settings.link.line_stride,
            dots_in_flipdot: settings.dots_in_flipdot(),
        }
    }

    /// Minimum buffer length this encoder accepts.
    pub fn dots_in_flipdot(&self) -> usize {
        self.dots_in_flipdot
    }

    /// Encodes one frame, returning one byte vector per panel in panel order.
    ///
    /// Each vector is `panel.width` bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the buffer is shorter than
    /// [`dots_in_flipdot`](Self::dots_in_flipdot) or a panel region does not
    /// fit inside it.  Nothing is partially encoded.
    pub fn try_encode(
        &self,
        pixels: &[i32],
        top_to_bottom: bool,
        black_point: i32,
    ) -> Result<Vec<Vec<u8>>, EncodeError> {
        if pixels.len() < self.dots_in_flipdot {
            return Err(EncodeError::UndersizedFrame {
                needed: self.dots_in_flipdot,
                available: pixels.len(),
            });
        }
        if self.line_stride == 0 {
            return Err(EncodeError::ZeroLineStride);
        }

        let stride = self.line_stride;
        let total_rows = pixels.len() / stride;

        // Bounds are checked for every panel up front so a bad panel late in
        // the list cannot leave earlier panels half-sent.
        for panel in &self.panels {
            if panel.height > MAX_PANEL_HEIGHT {
                return Err(EncodeError::PanelTooTall {
                    panel_id: panel.id,
                    height: panel.height,
                });
            }
            if panel.end_y() > total_rows || panel.end_x() > stride {
                return Err(EncodeError::RegionOutOfBounds {
                    panel_id: panel.id,
                    needed_rows: panel.end_y(),
                    needed_cols: panel.end_x(),
                    available_rows: total_rows,
                    line_stride: stride,
                });
            }
        }

        let encoded = self
            .panels
            .iter()
            .map(|panel| {
                (panel.start_x..panel.end_x())
                    .map(|x| {
                        let mut cell = 0u8;
                        for row in (0..panel.height).rev() {
                            let y = if top_to_bottom {
                                panel.start_y + row
                            } else {
                                (total_rows - 1) - (panel.start_y + row)
                            };
                            let on = pixels[x + y * stride] > black_point;
                            cell = (cell << 1) | u8::from(on);
                        }
                        cell
                    })
                    .collect()
            })
            .collect();

        Ok(encoded)
    }

    /// Sentinel form of [`try_encode`](Self::try_encode): an empty result set
    /// means "cannot encode this frame" and must be treated as a no-op.
    pub fn encode(&self, pixels: &[i32], top_to_bottom: bool, black_point: i32) -> Vec<Vec<u8>> {
        match self.try_encode(pixels, top_to_bottom, black_point) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::debug!("frame not encoded: {e}");
                Vec::new()
            }
        }
    }
}

/// Unpacks one column byte into `height` on/off values, row 0 first.
pub fn decode_column(byte: u8, height: usize) -> Vec<bool> {
    (0..height.min(MAX_PANEL_HEIGHT))
        .map(|row| byte & (1 << row) != 0)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{LinkSettings, PanelGeometry};

    fn settings(panels: Vec<PanelGeometry>, line_stride: usize) -> DisplaySettings {
        DisplaySettings {
            panels,
            link: LinkSettings::with_line_stride(line_stride),
            rx_addresses: Vec::new(),
            transport: None,
        }
    }

    fn panel(id: u8, start_x: usize, start_y: usize, width: usize, height: usize) -> PanelGeometry {
        PanelGeometry {
            id,
            start_x,
            start_y,
            width,
            height,
            ip: String::new(),
            rx_port: 0,
        }
    }

    #[test]
    fn test_encode_single_column_packs_row_zero_into_lsb() {
        // Arrange: 1 column, 3 rows; only row 0 is lit
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 1, 3)], 1));
        let pixels = [5, 0, 0];

        // Act
        let out = enc.try_encode(&pixels, true, 0).unwrap();

        // Assert
        assert_eq!(out, vec![vec![0b001]]);
    }

    #[test]
    fn test_encode_last_row_lands_in_bit_height_minus_one() {
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 1, 3)], 1));
        let out = enc.try_encode(&[0, 0, 9], true, 0).unwrap();
        assert_eq!(out, vec![vec![0b100]]);
    }

    #[test]
    fn test_encode_threshold_is_inclusive_for_off() {
        // Arrange: value equal to black point is off, one above is on
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 2, 1)], 2));

        // Act
        let out = enc.try_encode(&[128, 129], true, 128).unwrap();

        // Assert
        assert_eq!(out, vec![vec![0, 1]]);
    }

    #[test]
    fn test_encode_full_column_of_eight_sets_every_bit() {
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 1, 8)], 1));
        let out = enc.try_encode(&[1; 8], true, 0).unwrap();
        assert_eq!(out, vec![vec![0xFF]]);
    }

    #[test]
    fn test_encode_bottom_to_top_mirrors_source_rows() {
        // Arrange: 4 source rows, panel covers rows 0..2; only source row 3 lit
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 1, 2)], 1));
        let pixels = [0, 0, 0, 1];

        // Act
        let top_down = enc.try_encode(&pixels, true, 0).unwrap();
        let bottom_up = enc.try_encode(&pixels, false, 0).unwrap();

        // Assert: top-down never reaches row 3; bottom-up maps panel row 0 to row 3
        assert_eq!(top_down, vec![vec![0b00]]);
        assert_eq!(bottom_up, vec![vec![0b01]]);
    }

    #[test]
    fn test_encode_respects_panel_offsets() {
        // Arrange: stride 4, 2 rows; panel covers columns 2..4, row 1 only
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 2, 1), panel(2, 2, 1, 2, 1)], 4));
        #[rustfmt::skip]
        let pixels = [
            1, 0, 0, 0,
            0, 0, 1, 0,
        ];

        // Act
        let out = enc.try_encode(&pixels, true, 0).unwrap();

        // Assert
        assert_eq!(out, vec![vec![1, 0], vec![1, 0]]);
    }

    #[test]
    fn test_try_encode_reports_undersized_frame() {
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 4, 2)], 4));
        assert_eq!(
            enc.try_encode(&[0; 7], true, 0),
            Err(EncodeError::UndersizedFrame {
                needed: 8,
                available: 7
            })
        );
    }

    #[test]
    fn test_encode_returns_empty_set_for_undersized_frame() {
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 4, 2)], 4));
        assert!(enc.encode(&[0; 7], true, 0).is_empty());
    }

    #[test]
    fn test_try_encode_rejects_region_below_buffer() {
        // Arrange: enough pixels overall, but the panel starts on row 2 of 2
        let enc = FrameEncoder::new(&settings(vec![panel(9, 0, 2, 2, 1)], 2));

        // Act
        let result = enc.try_encode(&[0; 4], true, 0);

        // Assert
        assert!(matches!(
            result,
            Err(EncodeError::RegionOutOfBounds { panel_id: 9, available_rows: 2, .. })
        ));
    }

    #[test]
    fn test_try_encode_rejects_start_x_that_overflows() {
        // Arrange: start_x + width wraps past usize::MAX
        let enc = FrameEncoder::new(&settings(vec![panel(9, usize::MAX, 0, 2, 1)], 2));

        // Act
        let result = enc.try_encode(&[0; 4], true, 0);

        // Assert
        assert!(matches!(
            result,
            Err(EncodeError::RegionOutOfBounds { panel_id: 9, needed_cols: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_try_encode_rejects_panel_taller_than_eight() {
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 1, 9)], 1));
        assert_eq!(
            enc.try_encode(&[0; 9], true, 0),
            Err(EncodeError::PanelTooTall {
                panel_id: 1,
                height: 9
            })
        );
    }

    #[test]
    fn test_try_encode_rejects_zero_stride() {
        let enc = FrameEncoder::new(&settings(vec![panel(1, 0, 0, 1, 1)], 0));
        assert_eq!(enc.try_encode(&[0; 4], true, 0), Err(EncodeError::ZeroLineStride));
    }

    #[test]
    fn test_decode_column_inverts_packing() {
        assert_eq!(decode_column(0b101, 3), vec![true, false, true]);
        assert_eq!(decode_column(0b0000_0010, 2), vec![false, true]);
    }
}
