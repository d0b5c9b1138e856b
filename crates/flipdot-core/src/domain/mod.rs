//! Domain entities for the flip-dot wall.
//!
//! This module contains pure logic with no infrastructure dependencies: it can
//! be compiled and tested on any machine without a serial adapter or a panel
//! controller on the network.

/// Panel placement, link parameters and receiver addresses.
///
/// See [`geometry::DisplaySettings`] for the aggregate loaded at activation.
pub mod geometry;

/// Intensity buffer → per-panel column bytes.
pub mod encoder;

/// Raw capture conversion and test patterns.
pub mod intensity;
