//! Storage module for configuration persistence.

pub mod config;

pub use config::{AppConfig, ConfigError, TrackerSettings, UserProfile, Units};
