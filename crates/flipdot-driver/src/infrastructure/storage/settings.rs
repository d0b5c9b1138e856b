//! Settings-document persistence for the display wall.
//!
//! The wall is described by one document, read once when the driver is
//! enabled.  Two formats are accepted, chosen by file extension:
//!
//! - `.json` – the `FlipdotSettings.json` layout with camelCase keys.
//! - `.toml` – the same keys written as TOML.
//!
//! Any other extension is read as JSON.
//!
//! # Example (JSON)
//!
//! ```json
//! {
//!   "panels": [
//!     { "id": 4, "startX": 0,  "startY": 0, "width": 28, "height": 7,
//!       "ip": "192.168.0.10", "rxPort": 5000 }
//!   ],
//!   "comPort": "/dev/ttyUSB0",
//!   "baudRate": 57600,
//!   "parity": "None",
//!   "dataBits": 8,
//!   "stopBits": "One",
//!   "lineStride": 28,
//!   "rxAddresses": [ { "ip": "192.168.0.10", "port": 5000 } ]
//! }
//! ```
//!
//! # Serde default values
//!
//! Omitted link fields take the values the controllers ship with (`COM1`,
//! 57600 baud, no parity, 8 data bits, one stop bit) and `rxAddresses`
//! defaults to empty.  `panels` and `lineStride` have no default: a document
//! without them is rejected instead of driving a wall of the wrong shape.
//!
//! Unlike the application config of a desktop tool, a missing settings
//! document is an error, not a first-run default.

use std::path::{Path, PathBuf};

use flipdot_core::{DisplaySettings, LinkSettings, PanelGeometry, ReceiverAddress, TransportKind};
use thiserror::Error;
use tracing::info;

/// File name looked up when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "FlipdotSettings.json";

/// Error type for settings-document operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The document does not exist.
    #[error("settings document not found: {0}")]
    NotFound(PathBuf),

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The JSON content could not be parsed.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(String),
}

/// On-disk encoding of the settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsFormat {
    #[default]
    Json,
    Toml,
}

impl SettingsFormat {
    /// Picks the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => SettingsFormat::Toml,
            _ => SettingsFormat::Json,
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Parses a settings document held in memory.
///
/// # Errors
///
/// Returns [`SettingsError::Json`] or [`SettingsError::Toml`] for malformed
/// content, including a missing `panels` or `lineStride` key.
pub fn parse_settings(content: &str, format: SettingsFormat) -> Result<DisplaySettings, SettingsError> {
    let settings = match format {
        SettingsFormat::Json => serde_json::from_str(content)?,
        SettingsFormat::Toml => toml::from_str(content)?,
    };
    Ok(settings)
}

/// Loads the settings document at `path`.
///
/// # Errors
///
/// Returns [`SettingsError::NotFound`] if the file is absent,
/// [`SettingsError::Io`] for other file-system errors, and a parse error if
/// the content is malformed.
pub fn load_settings(path: &Path) -> Result<DisplaySettings, SettingsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SettingsError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings = parse_settings(&content, SettingsFormat::from_path(path))?;
    info!(
        "loaded {} panel(s) from {} (lineStride {})",
        settings.panels.len(),
        path.display(),
        settings.link.line_stride
    );
    Ok(settings)
}

/// Writes `settings` to `path` in the format its extension selects.
///
/// Creates the parent directory if it does not exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system failures or
/// [`SettingsError::Serialize`] if serialization fails.
pub fn save_settings(path: &Path, settings: &DisplaySettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = match SettingsFormat::from_path(path) {
        SettingsFormat::Json => serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?,
        SettingsFormat::Toml => {
            toml::to_string_pretty(settings).map_err(|e| SettingsError::Serialize(e.to_string()))?
        }
    };
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// A starter document: two 28x7 panels side by side on one UDP receiver.
pub fn example_settings() -> DisplaySettings {
    let panel = |id: u8, start_x: usize| PanelGeometry {
        id,
        start_x,
        start_y: 0,
        width: 28,
        height: 7,
        ip: "192.168.0.10".to_string(),
        rx_port: 5000,
    };
    DisplaySettings {
        panels: vec![panel(4, 0), panel(5, 28)],
        link: LinkSettings::with_line_stride(56),
        rx_addresses: vec![ReceiverAddress::new("192.168.0.10", 5000)],
        transport: Some(TransportKind::Udp),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
