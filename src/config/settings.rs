//! Application configuration loading from config.toml
//!
//! The file is optional: when it is missing the built-in defaults are used (sandbox
//! gateway with placeholder credentials, empty catalog seed), which is enough to run
//! the booking flow in simulation mode.

use super::{catalog::CatalogSeed, gateway::PaymentsConfig};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone)]
pub struct AppConfig {
    /// Payment gateway settings
    #[serde(default)]
    pub payments: PaymentsConfig,
    /// Catalog entries seeded on start
    #[serde(default)]
    pub catalog: CatalogSeed,
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `CONFIG_PATH` (default `./config.toml`) and applies the
/// `MPESA_*` environment overrides. A missing file falls back to defaults.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        warn!("Config file {path} not found, using defaults");
        AppConfig::default()
    };

    Ok(AppConfig {
        payments: config.payments.with_env_overrides()?,
        ..config
    })
}
