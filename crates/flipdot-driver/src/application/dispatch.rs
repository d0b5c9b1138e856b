//! DispatchScheduler: turns submitted frames into panel packets on one
//! persistent I/O worker.
//!
//! # Flow
//!
//! ```text
//! caller ──submit()──► bounded queue ──► "flipdot-dispatch" thread
//!   (never blocks)      (try_send)          │ encode (FrameEncoder)
//!                                           │ plan_frame (priming + panels)
//!                                           │ Transport::send per packet
//!                                           └─► FrameReport / stats
//! ```
//!
//! The worker owns the [`Transport`] outright: it is moved into the thread at
//! start and closed there on exit, so no two writes can ever run at once and
//! frames from overlapping submissions never interleave on the wire.
//!
//! # Queue policy
//!
//! The queue holds at most `queue_capacity` frames.  When it is full the *new*
//! frame is dropped and counted; the caller gets [`SubmitOutcome::Dropped`]
//! straight away.  Frames already queued go out in submission order.
//!
//! # Cancellation
//!
//! `shutdown` sets a shared `AtomicBool` and closes the queue.  The worker
//! checks the flag before each frame and between packets, never in the middle
//! of a write.  Shutdown waits up to `shutdown_timeout` for the worker to
//! notice; a worker stuck in a slow write is detached and still closes its
//! handles once the write returns.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flipdot_core::{format_message, DisplaySettings, FrameEncoder, TransportKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::report::{DeliveryOutcome, Destination, FrameReport, SendRecord};

/// Screen id of the warm-up packet sent ahead of every frame.
pub const PRIMING_SCREEN_ID: u8 = 1;

/// On serial, panel `i` (in document order) answers to screen id `i + 3`.
pub const SERIAL_SCREEN_ID_OFFSET: usize = 3;

const WORKER_THREAD_NAME: &str = "flipdot-dispatch";
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

// ── Transport port ────────────────────────────────────────────────────────────

/// A live link to the panel controllers.
///
/// Infrastructure implements this for serial, UDP and TCP; tests use the
/// generated `MockTransport`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Which kind of link this is.
    fn kind(&self) -> TransportKind;

    /// Writes one complete frame to `dest`.
    fn send(&mut self, dest: &Destination, frame: &[u8]) -> DeliveryOutcome;

    /// Closes every handle.  Later sends report a failure.
    fn close(&mut self);
}

// ── Planning ──────────────────────────────────────────────────────────────────

/// One packet ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSend {
    pub screen_id: u8,
    pub destination: Destination,
    pub priming: bool,
    pub frame: Vec<u8>,
}

/// Orders and addresses the packets for one encoded frame.
///
/// `encoded` holds one byte run per panel, in document order.  The first
/// panel's bytes are sent once more up front under [`PRIMING_SCREEN_ID`]:
/// on the serial link, and on every receiver address for UDP/TCP.
///
/// Serial panels are addressed by position (`index + 3`), network panels by
/// their configured id at the receiver matching their destination.  A panel
/// whose destination matches no receiver keeps its own (ip, port), which the
/// transport then reports as unresolved.
///
/// Returns an empty plan for an empty `encoded` slice.
pub fn plan_frame(
    kind: TransportKind,
    settings: &DisplaySettings,
    encoded: &[Vec<u8>],
    refresh: bool,
) -> Vec<PlannedSend> {
    let Some(first) = encoded.first() else {
        return Vec::new();
    };

    let mut plan = Vec::with_capacity(encoded.len() + settings.rx_addresses.len().max(1));
    let priming = format_message(PRIMING_SCREEN_ID, first, refresh);

    match kind {
        TransportKind::Serial => {
            plan.push(PlannedSend {
                screen_id: PRIMING_SCREEN_ID,
                destination: Destination::Link,
                priming: true,
                frame: priming,
            });
            for (index, data) in encoded.iter().enumerate() {
                let screen_id = (index + SERIAL_SCREEN_ID_OFFSET) as u8;
                plan.push(PlannedSend {
                    screen_id,
                    destination: Destination::Link,
                    priming: false,
                    frame: format_message(screen_id, data, refresh),
                });
            }
        }
        TransportKind::Udp | TransportKind::Tcp => {
            for address in &settings.rx_addresses {
                plan.push(PlannedSend {
                    screen_id: PRIMING_SCREEN_ID,
                    destination: Destination::Address(address.clone()),
                    priming: true,
                    frame: priming.clone(),
                });
            }
            for (panel, data) in settings.panels.iter().zip(encoded) {
                let address = settings
                    .resolve_destination(panel)
                    .cloned()
                    .unwrap_or_else(|| panel.destination());
                plan.push(PlannedSend {
                    screen_id: panel.id,
                    destination: Destination::Address(address),
                    priming: false,
                    frame: format_message(panel.id, data, refresh),
                });
            }
        }
    }
    plan
}

// ── Configuration and results ─────────────────────────────────────────────────

/// Tuning for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Frames that may wait behind the one being written.
    pub queue_capacity: usize,
    /// How long `shutdown` waits for an in-flight write.
    pub shutdown_timeout: Duration,
    /// Selects the refresh variant of each opcode.
    pub refresh: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            shutdown_timeout: Duration::from_secs(2),
            refresh: true,
        }
    }
}

/// One frame handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    /// Row-major intensities, `lineStride` per row.
    pub pixels: Vec<i32>,
    pub top_to_bottom: bool,
    /// Pixels strictly above this value light their dot.
    pub black_point: i32,
}

impl FrameRequest {
    pub fn new(pixels: Vec<i32>, top_to_bottom: bool) -> Self {
        Self {
            pixels,
            top_to_bottom,
            black_point: 0,
        }
    }
}

/// What happened to a submission at the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; the worker will send it in order.
    Queued,
    /// The queue was full; the frame was discarded.
    Dropped,
    /// The dispatcher has shut down.
    Stopped,
}

/// Counters since the dispatcher started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Every call to `submit`, accepted or not.
    pub submitted: u64,
    /// Submissions discarded because the queue was full.
    pub dropped: u64,
    /// Frames whose packets were all handed to the transport, whether or
    /// not each write succeeded. See `failed_sends` for per-packet failures.
    pub sent_frames: u64,
    /// Frames that never reached the transport (e.g. undersized buffers).
    pub skipped_frames: u64,
    /// Individual packets that failed or had no destination.
    pub failed_sends: u64,
}

impl DispatchStats {
    /// Frames the worker has finished with, sent or skipped.
    pub fn processed(&self) -> u64 {
        self.sent_frames + self.skipped_frames
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    sent_frames: AtomicU64,
    skipped_frames: AtomicU64,
    failed_sends: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent_frames: self.sent_frames.load(Ordering::Acquire),
            skipped_frames: self.skipped_frames.load(Ordering::Acquire),
            failed_sends: self.failed_sends.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the scheduler handle and its worker.
#[derive(Debug, Default)]
struct Shared {
    counters: Counters,
    last_report: Mutex<Option<FrameReport>>,
}

struct Job {
    sequence: u64,
    request: FrameRequest,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Handle to the running dispatch worker.
pub struct DispatchScheduler {
    tx: Option<mpsc::Sender<Job>>,
    cancel: Arc<AtomicBool>,
    shared: Arc<Shared>,
    done_rx: Mutex<std_mpsc::Receiver<()>>,
    handle: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
    kind: TransportKind,
}

impl DispatchScheduler {
    /// Spawns the worker thread and hands it `transport`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn start(
        settings: Arc<DisplaySettings>,
        transport: Box<dyn Transport>,
        config: DispatchConfig,
    ) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (done_tx, done_rx) = std_mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(Shared::default());
        let kind = transport.kind();

        let worker = Worker {
            encoder: FrameEncoder::new(&settings),
            settings,
            transport,
            rx,
            cancel: Arc::clone(&cancel),
            shared: Arc::clone(&shared),
            refresh: config.refresh,
        };

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                worker.run();
                let _ = done_tx.send(());
            })?;

        info!(
            "dispatcher started ({kind}, queue capacity {})",
            config.queue_capacity.max(1)
        );

        Ok(Self {
            tx: Some(tx),
            cancel,
            shared,
            done_rx: Mutex::new(done_rx),
            handle: Some(handle),
            shutdown_timeout: config.shutdown_timeout,
            kind,
        })
    }

    /// Queues a frame without blocking.
    pub fn submit(&self, request: FrameRequest) -> SubmitOutcome {
        let Some(tx) = self.tx.as_ref() else {
            return SubmitOutcome::Stopped;
        };
        let sequence = self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);

        match tx.try_send(Job { sequence, request }) {
            Ok(()) => SubmitOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("frame {sequence} dropped: dispatch queue full");
                SubmitOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => SubmitOutcome::Stopped,
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    pub fn stats(&self) -> DispatchStats {
        self.shared.counters.snapshot()
    }

    /// The report of the most recently processed frame.
    pub fn last_report(&self) -> Option<FrameReport> {
        self.shared
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until at least `count` frames have been processed or `timeout`
    /// elapses.  Returns `true` if the count was reached.
    pub fn wait_for_processed(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.stats().processed() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Cancels queued frames, waits for the in-flight write and closes the
    /// transport.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        self.cancel.store(true, Ordering::Release);
        drop(tx);

        let done_rx = self
            .done_rx
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        error!("dispatch worker panicked");
                    }
                }
                info!("dispatcher stopped");
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    "dispatch worker did not stop within {:?}; detaching it",
                    self.shutdown_timeout
                );
                self.handle.take();
            }
        }
    }
}

impl Drop for DispatchScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct Worker {
    settings: Arc<DisplaySettings>,
    encoder: FrameEncoder,
    transport: Box<dyn Transport>,
    rx: mpsc::Receiver<Job>,
    cancel: Arc<AtomicBool>,
    shared: Arc<Shared>,
    refresh: bool,
}

impl Worker {
    fn run(mut self) {
        while let Some(job) = self.rx.blocking_recv() {
            if self.cancelled() {
                break;
            }
            self.process(job);
        }
        let pending = self.drain_pending();
        if pending > 0 {
            debug!("{pending} queued frame(s) discarded at shutdown");
        }
        self.transport.close();
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn drain_pending(&mut self) -> usize {
        self.rx.close();
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    fn process(&mut self, job: Job) {
        let kind = self.transport.kind();
        let Job { sequence, request } = job;

        let encoded = match self.encoder.try_encode(
            &request.pixels,
            request.top_to_bottom,
            request.black_point,
        ) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("frame {sequence} skipped: {e}");
                self.finish(FrameReport::skipped(sequence, kind, e.to_string()), true);
                return;
            }
        };

        let plan = plan_frame(kind, &self.settings, &encoded, self.refresh);
        let mut report = FrameReport {
            sequence,
            transport: kind,
            skipped: None,
            sends: Vec::with_capacity(plan.len()),
        };

        for packet in plan {
            if self.cancelled() {
                debug!("frame {sequence} cancelled after {} packet(s)", report.sends.len());
                self.store_report(report);
                return;
            }
            let outcome = self.transport.send(&packet.destination, &packet.frame);
            match &outcome {
                DeliveryOutcome::Delivered => {}
                DeliveryOutcome::TransportError(reason) => warn!(
                    "frame {sequence}: screen {} to {} failed: {reason}",
                    packet.screen_id, packet.destination
                ),
                DeliveryOutcome::DestinationUnresolved => warn!(
                    "frame {sequence}: no open handle for {}; screen {} skipped",
                    packet.destination, packet.screen_id
                ),
            }
            report.sends.push(SendRecord {
                screen_id: packet.screen_id,
                destination: packet.destination,
                priming: packet.priming,
                outcome,
            });
        }

        debug!(
            "frame {sequence} sent: {} of {} packet(s) delivered",
            report.delivered_count(),
            report.sends.len()
        );
        self.finish(report, false);
    }

    fn finish(&self, report: FrameReport, skipped: bool) {
        let counters = &self.shared.counters;
        counters
            .failed_sends
            .fetch_add(report.failed_count() as u64, Ordering::Relaxed);
        self.store_report(report);
        if skipped {
            counters.skipped_frames.fetch_add(1, Ordering::Release);
        } else {
            counters.sent_frames.fetch_add(1, Ordering::Release);
        }
    }

    fn store_report(&self, report: FrameReport) {
        *self
            .shared
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
