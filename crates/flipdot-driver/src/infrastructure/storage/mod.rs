//! Storage infrastructure: settings-document persistence.
//!
//! The `settings` sub-module reads the wall description (JSON or TOML) once
//! at activation, and can write a starter document for `--init`.

pub mod settings;
