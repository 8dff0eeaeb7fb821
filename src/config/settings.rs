//! Application settings loading from config.toml
//!
//! Settings control when the export cache is regenerated. Every field has a
//! default, so a missing file or a missing section yields the stock behaviour.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Export cache behaviour
    pub export: ExportSettings,
}

/// `[export]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportSettings {
    /// Regenerate the cache when an estimate becomes visible to its client
    pub regenerate_on_publish: bool,
    /// Copy the source cache verbatim when creating an act instead of recomputing
    pub copy_cache_into_acts: bool,
    /// Compare the cache against a live recomputation whenever it is read
    pub check_drift_on_read: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            regenerate_on_publish: true,
            copy_cache_into_acts: true,
            check_drift_on_read: false,
        }
    }
}

/// Loads settings from a TOML file.
///
/// A missing file is not an error and yields [`Settings::default`].
///
/// # Errors
/// Returns an error if the file exists but cannot be read or is not valid TOML.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No settings file at {path:?}, using defaults");
        return Ok(Settings::default());
    }

    debug!("Loading settings from {path:?}");
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {path:?}: {e}"),
    })?;

    parse_settings(&contents)
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}
