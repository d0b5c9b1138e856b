//! DisplayDriver: the enable / send / disable lifecycle of one wall.
//!
//! `enable` does all the fallible work up front: load the settings document,
//! validate it for the chosen transport, open every transport handle and
//! start the dispatch worker.  If any step fails nothing is left running and
//! the error is returned.  After that, `send_frame` can never fail: it only
//! queues work for the dispatcher.
//!
//! Dropping a driver disables it.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use flipdot_core::{DisplaySettings, GeometryError, TransportKind};
use thiserror::Error;
use tracing::{error, info, warn};

use super::dispatch::{
    DispatchConfig, DispatchScheduler, DispatchStats, FrameRequest, SubmitOutcome, Transport,
};
use super::report::FrameReport;
use crate::infrastructure::storage::settings::{load_settings, SettingsError, DEFAULT_SETTINGS_FILE};
use crate::infrastructure::transport::{open_transport, TransportError, TransportOptions};

/// Error type for driver activation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("invalid display settings: {0}")]
    Invalid(#[from] GeometryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to start dispatch worker: {0}")]
    Spawn(#[source] io::Error),
}

/// Everything `enable` needs.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub settings_path: PathBuf,
    /// Overrides the document's `transport` key.  Serial if neither is set.
    pub transport: Option<TransportKind>,
    pub transport_options: TransportOptions,
    pub dispatch: DispatchConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(DEFAULT_SETTINGS_FILE),
            transport: None,
            transport_options: TransportOptions::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// An enabled display wall.
pub struct DisplayDriver {
    settings: Arc<DisplaySettings>,
    scheduler: DispatchScheduler,
}

impl DisplayDriver {
    /// Loads the settings document and brings the wall up.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the document is missing or malformed, fails
    /// validation for the selected transport, or a transport handle cannot
    /// be opened.
    pub fn enable(config: DriverConfig) -> Result<Self, DriverError> {
        let settings = load_settings(&config.settings_path).map_err(|e| {
            error!("cannot load {}: {e}", config.settings_path.display());
            e
        })?;
        let kind = config
            .transport
            .or(settings.transport)
            .unwrap_or_default();
        Self::with_settings(settings, kind, &config.transport_options, config.dispatch)
    }

    /// Brings the wall up from settings already in memory.
    ///
    /// # Errors
    ///
    /// Same as [`enable`](Self::enable), minus the document errors.
    pub fn with_settings(
        settings: DisplaySettings,
        kind: TransportKind,
        options: &TransportOptions,
        dispatch: DispatchConfig,
    ) -> Result<Self, DriverError> {
        if let Err(e) = settings.validate(kind) {
            error!("display settings rejected for {kind}: {e}");
            return Err(e.into());
        }
        for warning in settings.size_class_warnings() {
            warn!(
                "panel {} is {} columns wide, which matches no controller size class; its frames carry opcode 0x00",
                warning.panel_id, warning.width
            );
        }

        let transport = open_transport(kind, &settings, options).map_err(|e| {
            error!("cannot open {kind} transport: {e}");
            e
        })?;
        Self::with_transport(settings, transport, dispatch)
    }

    /// Starts the dispatcher over an already-open transport.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Spawn`] if the worker thread cannot start.
    pub fn with_transport(
        settings: DisplaySettings,
        transport: Box<dyn Transport>,
        dispatch: DispatchConfig,
    ) -> Result<Self, DriverError> {
        let kind = transport.kind();
        let settings = Arc::new(settings);
        let scheduler = DispatchScheduler::start(Arc::clone(&settings), transport, dispatch)
            .map_err(DriverError::Spawn)?;

        info!(
            "flipdot driver enabled: {} panel(s), {} dots, {kind}",
            settings.panels.len(),
            settings.dots_in_flipdot()
        );
        Ok(Self {
            settings,
            scheduler,
        })
    }

    /// Queues one frame with the default black point (0).
    pub fn send_frame(&self, pixels: Vec<i32>, top_to_bottom: bool) -> SubmitOutcome {
        self.scheduler.submit(FrameRequest::new(pixels, top_to_bottom))
    }

    /// Queues one frame; pixels strictly above `black_point` light their dot.
    pub fn send_frame_with_black_point(
        &self,
        pixels: Vec<i32>,
        top_to_bottom: bool,
        black_point: i32,
    ) -> SubmitOutcome {
        self.scheduler.submit(FrameRequest {
            pixels,
            top_to_bottom,
            black_point,
        })
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.scheduler.transport_kind()
    }

    pub fn stats(&self) -> DispatchStats {
        self.scheduler.stats()
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.scheduler.last_report()
    }

    /// See [`DispatchScheduler::wait_for_processed`].
    pub fn wait_for_processed(&self, count: u64, timeout: Duration) -> bool {
        self.scheduler.wait_for_processed(count, timeout)
    }

    /// Stops the dispatcher and closes every transport handle.
    pub fn disable(self) {
        let stats = self.scheduler.stats();
        info!(
            "flipdot driver disabled: {} submitted, {} dropped, {} sent, {} skipped",
            stats.submitted, stats.dropped, stats.sent_frames, stats.skipped_frames
        );
        self.scheduler.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
