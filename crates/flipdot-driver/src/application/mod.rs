//! Application layer for the flipdot driver.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `flipdot_core`) and the infrastructure (serial ports,
//! sockets, files).  Code here:
//!
//! - **Orchestrates** domain objects to fulfil a goal, e.g. "turn this pixel
//!   buffer into packets and send them to every panel in order".
//! - **Depends on abstractions**: the dispatcher only knows the [`Transport`]
//!   trait, so tests drive it with a mock instead of real hardware.
//!
//! # Sub-modules
//!
//! - **`report`**   – Per-packet delivery outcomes and per-frame reports.
//!
//! - **`dispatch`** – The bounded frame queue and the single I/O worker that
//!   encodes, sequences and writes each frame.
//!
//! - **`driver`**   – The enable / send / disable lifecycle that callers use.
//!
//! [`Transport`]: dispatch::Transport

pub mod dispatch;
pub mod driver;
pub mod report;
