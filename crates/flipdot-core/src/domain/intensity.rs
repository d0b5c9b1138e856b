//! Helpers for producing intensity buffers.
//!
//! The capture path reads an RGBA32 render target back into memory and keeps
//! only the red channel as the per-pixel intensity.  [`intensities_from_rgba`]
//! performs that conversion; [`TestPattern`] renders a few fixed images for
//! bringing a wall up without a renderer attached.

use std::str::FromStr;

use thiserror::Error;

/// Bytes per pixel in an RGBA32 capture.
pub const RGBA_BYTES_PER_PIXEL: usize = 4;

/// Errors from converting a raw capture into intensities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntensityError {
    #[error("RGBA buffer has {actual} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// Converts an RGBA32 buffer (`width * height * 4` bytes) into one intensity
/// per pixel taken from the red channel.
///
/// # Errors
///
/// Returns [`IntensityError::SizeMismatch`] if the byte count does not match
/// the stated dimensions.
pub fn intensities_from_rgba(
    rgba: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<i32>, IntensityError> {
    let expected = width * height * RGBA_BYTES_PER_PIXEL;
    if rgba.len() != expected {
        return Err(IntensityError::SizeMismatch {
            width,
            height,
            expected,
            actual: rgba.len(),
        });
    }
    Ok(rgba
        .chunks_exact(RGBA_BYTES_PER_PIXEL)
        .map(|px| i32::from(px[0]))
        .collect())
}

/// Fixed images used for wiring checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPattern {
    /// Every dot off.
    Clear,
    /// Every dot on.
    Fill,
    /// Alternating dots, top-left on.
    Checkerboard,
    /// Even columns on.
    Columns,
    /// Even rows on.
    Rows,
}

impl TestPattern {
    /// Renders the pattern as a row-major buffer of 0 / 255 intensities.
    pub fn render(self, width: usize, height: usize) -> Vec<i32> {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let on = match self {
                    TestPattern::Clear => false,
                    TestPattern::Fill => true,
                    TestPattern::Checkerboard => (x + y) % 2 == 0,
                    TestPattern::Columns => x % 2 == 0,
                    TestPattern::Rows => y % 2 == 0,
                };
                pixels.push(if on { 255 } else { 0 });
            }
        }
        pixels
    }
}

impl FromStr for TestPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clear" => Ok(TestPattern::Clear),
            "fill" => Ok(TestPattern::Fill),
            "checkerboard" => Ok(TestPattern::Checkerboard),
            "columns" => Ok(TestPattern::Columns),
            "rows" => Ok(TestPattern::Rows),
            other => Err(format!("unknown pattern {other:?}")),
        }
    }
}
