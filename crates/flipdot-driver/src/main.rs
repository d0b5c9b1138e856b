//! flipdot-driver command-line entry point.
//!
//! Loads a wall description, brings the driver up on the selected transport
//! and pushes a test pattern or a raw RGBA capture to the panels, once or on
//! a fixed interval until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()                 -- flags + FLIPDOT_* env overrides
//!  ├─ --init   → save_settings()   -- write a starter document and exit
//!  ├─ --dump   → plan_frame()      -- print wire frames, no transport
//!  └─ DisplayDriver::enable()
//!       └─ send loop (tokio interval) ──► dispatch worker thread
//! ```

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flipdot_core::{intensities_from_rgba, DisplaySettings, FrameEncoder, FrameView, TestPattern, TransportKind};
use flipdot_driver::application::dispatch::{plan_frame, DispatchConfig, SubmitOutcome};
use flipdot_driver::application::driver::{DisplayDriver, DriverConfig};
use flipdot_driver::infrastructure::storage::settings::{
    example_settings, load_settings, save_settings, DEFAULT_SETTINGS_FILE,
};
use flipdot_driver::infrastructure::transport::TransportOptions;

/// How long to wait for queued frames to go out before disabling.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Flip-dot display wall driver.
///
/// Sends a test pattern or a raw RGBA32 capture to every panel described by
/// the settings document.
#[derive(Debug, Parser)]
#[command(
    name = "flipdot-driver",
    about = "Drive a wall of flip-dot panels over serial, UDP or TCP",
    version
)]
struct Cli {
    /// Settings document (JSON, or TOML by extension).
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE, env = "FLIPDOT_CONFIG")]
    config: PathBuf,

    /// Transport to use: serial, udp or tcp.
    ///
    /// Falls back to the document's `transport` key, then serial.
    #[arg(long, env = "FLIPDOT_TRANSPORT")]
    transport: Option<TransportKind>,

    /// Test pattern: clear, fill, checkerboard, columns or rows.
    #[arg(long, default_value = "checkerboard", conflicts_with = "frame")]
    pattern: TestPattern,

    /// Raw RGBA32 capture to send instead of a pattern.
    #[arg(long, requires_all = ["width", "height"])]
    frame: Option<PathBuf>,

    /// Width in pixels of the `--frame` capture.
    #[arg(long)]
    width: Option<usize>,

    /// Height in pixels of the `--frame` capture.
    #[arg(long)]
    height: Option<usize>,

    /// Source rows are stored bottom row first (GPU read-back order).
    #[arg(long)]
    bottom_to_top: bool,

    /// Pixels strictly above this intensity light their dot.
    #[arg(long, default_value_t = 0)]
    black_point: i32,

    /// Resend the frame every this many milliseconds.  0 sends once.
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Stop after this many frames when repeating.  0 runs until Ctrl-C.
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Write timeout for every transport handle, in milliseconds.
    #[arg(long)]
    write_timeout_ms: Option<u64>,

    /// Print the planned wire frames as hex and exit without opening a transport.
    #[arg(long)]
    dump: bool,

    /// Write a starter settings document to PATH and exit.
    #[arg(long, value_name = "PATH")]
    init: Option<PathBuf>,
}

impl Cli {
    fn top_to_bottom(&self) -> bool {
        !self.bottom_to_top
    }

    fn transport_options(&self) -> TransportOptions {
        let timeout = self.write_timeout_ms.map(Duration::from_millis);
        TransportOptions {
            write_timeout: timeout,
            connect_timeout: timeout,
        }
    }

    /// Builds the intensity buffer for `settings`.
    fn pixels(&self, settings: &DisplaySettings) -> anyhow::Result<Vec<i32>> {
        match (&self.frame, self.width, self.height) {
            (Some(path), Some(width), Some(height)) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read frame {}", path.display()))?;
                let pixels = intensities_from_rgba(&bytes, width, height)
                    .with_context(|| format!("invalid frame {}", path.display()))?;
                if width != settings.link.line_stride {
                    warn!(
                        "frame is {width} px wide but lineStride is {}; rows will be misaligned",
                        settings.link.line_stride
                    );
                }
                Ok(pixels)
            }
            (Some(_), _, _) => bail!("--frame needs --width and --height"),
            _ => Ok(self
                .pattern
                .render(settings.link.line_stride, wall_rows(settings))),
        }
    }
}

/// Rows the wall spans: the lowest panel edge.
fn wall_rows(settings: &DisplaySettings) -> usize {
    settings.panels.iter().map(|p| p.end_y()).max().unwrap_or(0)
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

fn write_example(path: &Path) -> anyhow::Result<()> {
    save_settings(path, &example_settings())
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote example settings to {}", path.display());
    Ok(())
}

fn dump_frames(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli.config)?;
    let kind = cli.transport.or(settings.transport).unwrap_or_default();
    settings
        .validate(kind)
        .with_context(|| format!("{} is not valid for {kind}", cli.config.display()))?;

    let pixels = cli.pixels(&settings)?;
    let encoded = FrameEncoder::new(&settings)
        .try_encode(&pixels, cli.top_to_bottom(), cli.black_point)
        .context("frame cannot be encoded")?;

    for send in plan_frame(kind, &settings, &encoded, DispatchConfig::default().refresh) {
        let view = FrameView::parse(&send.frame).context("planned frame is malformed")?;
        println!(
            "{:<22} screen {:>3} opcode 0x{:02X} {:>3} bytes{}  {}",
            send.destination.to_string(),
            view.screen_id,
            view.opcode,
            view.data.len(),
            if send.priming { " (priming)" } else { "" },
            hex(&send.frame)
        );
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.init {
        return write_example(path);
    }
    if cli.dump {
        return dump_frames(&cli);
    }

    let driver = DisplayDriver::enable(DriverConfig {
        settings_path: cli.config.clone(),
        transport: cli.transport,
        transport_options: cli.transport_options(),
        dispatch: DispatchConfig::default(),
    })
    .with_context(|| format!("failed to enable driver from {}", cli.config.display()))?;
    let pixels = cli.pixels(driver.settings())?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl-C: {e}"),
        }
    });

    // ── Send loop ─────────────────────────────────────────────────────────────
    let mut queued = 0u64;
    if cli.interval_ms == 0 {
        if driver.send_frame_with_black_point(pixels, cli.top_to_bottom(), cli.black_point)
            == SubmitOutcome::Queued
        {
            queued += 1;
        }
    } else {
        let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms));
        let mut sent = 0u64;
        while running.load(Ordering::Relaxed) && (cli.frames == 0 || sent < cli.frames) {
            ticker.tick().await;
            match driver.send_frame_with_black_point(
                pixels.clone(),
                cli.top_to_bottom(),
                cli.black_point,
            ) {
                SubmitOutcome::Queued => queued += 1,
                SubmitOutcome::Dropped => warn!("frame {sent} dropped: link is falling behind"),
                SubmitOutcome::Stopped => break,
            }
            sent += 1;
        }
    }

    // Let queued frames go out, then close every handle off the runtime thread.
    tokio::task::spawn_blocking(move || {
        if !driver.wait_for_processed(queued, DRAIN_TIMEOUT) {
            warn!("gave up waiting for {queued} frame(s) to be sent");
        }
        if let Some(report) = driver.last_report() {
            info!(
                "last frame: {} of {} packet(s) delivered",
                report.delivered_count(),
                report.sends.len()
            );
        }
        driver.disable();
    })
    .await
    .context("driver shutdown task failed")?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use flipdot_core::{LinkSettings, PanelGeometry};

    #[test]
    fn test_cli_defaults() {
        // Arrange: parse with no arguments (all defaults apply)
        let cli = Cli::parse_from(["flipdot-driver"]);

        // Assert
        assert_eq!(cli.config, PathBuf::from("FlipdotSettings.json"));
        assert_eq!(cli.pattern, TestPattern::Checkerboard);
        assert!(cli.top_to_bottom());
        assert_eq!(cli.interval_ms, 0);
        assert_eq!(cli.transport_options(), TransportOptions::default());
    }

    #[test]
    fn test_cli_parses_transport_case_insensitively() {
        let cli = Cli::parse_from(["flipdot-driver", "--transport", "UDP"]);
        assert_eq!(cli.transport, Some(TransportKind::Udp));
    }

    #[test]
    fn test_cli_frame_requires_dimensions() {
        assert!(Cli::try_parse_from(["flipdot-driver", "--frame", "cap.rgba"]).is_err());
    }

    #[test]
    fn test_pattern_pixels_cover_the_wall() {
        // Arrange: two 28x7 panels stacked vertically
        let panel = |start_y| PanelGeometry {
            id: 1,
            start_x: 0,
            start_y,
            width: 28,
            height: 7,
            ip: String::new(),
            rx_port: 0,
        };
        let settings = DisplaySettings {
            panels: vec![panel(0), panel(7)],
            link: LinkSettings::with_line_stride(28),
            rx_addresses: Vec::new(),
            transport: None,
        };
        let cli = Cli::parse_from(["flipdot-driver", "--pattern", "fill"]);

        // Act
        let pixels = cli.pixels(&settings).unwrap();

        // Assert
        assert_eq!(pixels.len(), 28 * 14);
        assert!(pixels.iter().all(|&p| p == 255));
    }

    #[test]
    fn test_hex_formats_bytes() {
        assert_eq!(hex(&[0x80, 0x0A, 0x8F]), "80 0A 8F");
    }
}
