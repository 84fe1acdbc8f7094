/// Catalog seed entries from config.toml
pub mod catalog;

/// Database connection and schema creation
pub mod database;

/// Payment gateway credentials per environment
pub mod gateway;

/// Root of config.toml and loading
pub mod settings;

pub use settings::{AppConfig, load_app_configuration, load_config};
