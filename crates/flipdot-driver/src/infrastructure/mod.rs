//! Infrastructure layer for the flipdot driver.
//!
//! Contains OS-facing adapters: the serial, UDP and TCP transports and the
//! settings-document storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `flipdot_core`, but the domain crate MUST NOT import it.  The only
//! application code that reaches in here is `driver`, which wires the
//! adapters together at activation.

pub mod storage;
pub mod transport;
