//! Server configuration module.
//!
//! Handles loading and validating `config.toml`. Configuration is read once at
//! startup and then shared read-only (`Arc<ServerConfig>`) by every request.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! document_root = "public"          # Directory images are served from
//! cache_directory_name = "cache"    # Rendition cache, under document_root
//! breakpoints = [1200, 992, 768, 480, 320]
//! compression_quality_floor = 85    # JPEG quality for the widest sources (1-100)
//! browser_cache_seconds = 604800    # Cache-Control max-age / Expires offset
//! sharpen = true                    # Unsharp-mask downscaled renditions
//! watch_cache = true                # Re-render when the source is newer
//! viewport_cookie = "resolution"    # Cookie carrying the viewport hint
//!
//! [server]
//! listen = "127.0.0.1:8080"
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::breakpoints::BreakpointLadder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Process-wide configuration.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Directory request paths are resolved against.
    pub document_root: PathBuf,
    /// Name of the rendition cache directory inside `document_root`.
    pub cache_directory_name: String,
    /// Rendition widths.
    pub breakpoints: BreakpointLadder,
    /// JPEG quality used for sources at least as wide as the widest breakpoint.
    pub compression_quality_floor: u32,
    /// Browser cache lifetime for served images, in seconds.
    pub browser_cache_seconds: u64,
    /// Apply light sharpening after downscaling.
    pub sharpen: bool,
    /// Compare rendition and source timestamps before serving from cache.
    pub watch_cache: bool,
    /// Name of the cookie carrying the viewport hint.
    pub viewport_cookie: String,
    /// HTTP listener settings.
    pub server: ListenConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("public"),
            cache_directory_name: "cache".to_string(),
            breakpoints: BreakpointLadder::default(),
            compression_quality_floor: 85,
            browser_cache_seconds: 604_800,
            sharpen: true,
            watch_cache: true,
            viewport_cookie: "resolution".to_string(),
            server: ListenConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.compression_quality_floor) {
            return Err(ConfigError::Validation(
                "compression_quality_floor must be 1-100".into(),
            ));
        }
        let cache_name = Path::new(&self.cache_directory_name);
        if self.cache_directory_name.is_empty()
            || cache_name.components().count() != 1
            || cache_name.is_absolute()
            || self.cache_directory_name == ".."
            || self.cache_directory_name == "."
        {
            return Err(ConfigError::Validation(
                "cache_directory_name must be a single directory name".into(),
            ));
        }
        if self.viewport_cookie.trim().is_empty() {
            return Err(ConfigError::Validation(
                "viewport_cookie must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Root of the rendition cache.
    pub fn cache_root(&self) -> PathBuf {
        self.document_root.join(&self.cache_directory_name)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenConfig {
    /// Socket address to bind, e.g. `"0.0.0.0:8080"`.
    pub listen: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, or stock defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => {
            let config = ServerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Adaptive Images Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory that request paths are resolved against.
document_root = "public"

# Renditions are stored under <document_root>/<cache_directory_name>/<width>/,
# mirroring the source's directory structure.
cache_directory_name = "cache"

# Rendition widths. A client gets the widest breakpoint that fits its viewport,
# or the narrowest one when nothing fits.
breakpoints = [1200, 992, 768, 480, 320]

# JPEG quality for sources at least as wide as the widest breakpoint (1-100).
# Narrower sources are compressed more gently, up to 100.
compression_quality_floor = 85

# How long browsers may cache served images (Cache-Control max-age, Expires).
browser_cache_seconds = 604800

# Apply a light unsharp mask after downscaling.
sharpen = true

# Re-render a cached rendition when its source has been modified since.
# Turn off to serve any existing rendition without checking timestamps.
watch_cache = true

# Cookie set by the front-end carrying "<width>" or "<width>,<pixel density>".
viewport_cookie = "resolution"

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
listen = "127.0.0.1:8080"
"##
}
