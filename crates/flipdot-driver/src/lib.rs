//! flipdot-driver library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::dispatch::{DispatchConfig, DispatchStats, FrameRequest, SubmitOutcome};
pub use application::driver::{DisplayDriver, DriverConfig, DriverError};
pub use application::report::{DeliveryOutcome, Destination, FrameReport, SendRecord};
pub use infrastructure::transport::{TransportError, TransportKind, TransportOptions};
