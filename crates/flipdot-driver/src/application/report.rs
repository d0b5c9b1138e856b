//! Per-frame delivery reports.
//!
//! Every transport write produces a [`DeliveryOutcome`].  The dispatch worker
//! collects the outcomes of one submitted frame (the priming packet(s) plus
//! one packet per panel) into a [`FrameReport`], logs it, and keeps the most
//! recent one for callers that want to inspect it.  Nothing here is ever
//! returned to the code that submitted the frame, so a failing link can never
//! block or crash the renderer.

use std::fmt;

use flipdot_core::{ReceiverAddress, TransportKind};

/// Where a single packet is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The one shared serial link.
    Link,
    /// A panel controller reached over UDP or TCP.
    Address(ReceiverAddress),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Link => f.write_str("serial link"),
            Destination::Address(addr) => write!(f, "{addr}"),
        }
    }
}

/// Result of one transport write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The OS accepted every byte of the packet.
    Delivered,
    /// The write failed; the packet was dropped.
    TransportError(String),
    /// No open handle exists for the destination; nothing was written.
    DestinationUnresolved,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// One packet of a frame and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRecord {
    pub screen_id: u8,
    pub destination: Destination,
    /// `true` for the warm-up packet sent ahead of the panel data.
    pub priming: bool,
    pub outcome: DeliveryOutcome,
}

/// Everything that happened to one submitted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Submission sequence number, starting at 0 for each activation.
    pub sequence: u64,
    pub transport: TransportKind,
    /// Why the frame was not sent at all (e.g. an undersized buffer).
    pub skipped: Option<String>,
    /// Packets in the order they were written.
    pub sends: Vec<SendRecord>,
}

impl FrameReport {
    /// A report for a frame that never reached the transport.
    pub fn skipped(sequence: u64, transport: TransportKind, reason: impl Into<String>) -> Self {
        Self {
            sequence,
            transport,
            skipped: Some(reason.into()),
            sends: Vec::new(),
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    pub fn delivered_count(&self) -> usize {
        self.sends.iter().filter(|s| s.outcome.is_delivered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.sends.len() - self.delivered_count()
    }

    /// `true` when the frame was sent and every packet was delivered.
    pub fn is_fully_delivered(&self) -> bool {
        !self.was_skipped() && self.failed_count() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
