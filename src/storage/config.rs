//! User profile and application configuration.
//!
//! Configuration is stored as TOML in the platform data directory. Every
//! section falls back to its defaults when absent, so a partial file is fine.

use crate::tracking::estimator::StepSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default stride length in meters.
pub const DEFAULT_STRIDE_LENGTH_M: f64 = 0.7;

/// Default accelerometer magnitude threshold, in g-equivalent units.
pub const DEFAULT_ACCEL_THRESHOLD: f64 = 1.2;

/// Default accelerometer sampling rate in Hz.
pub const DEFAULT_ACCEL_FREQUENCY_HZ: u32 = 60;

/// Unit system preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Metric units (km, kg)
    #[default]
    Metric,
    /// Imperial units (miles, lbs)
    Imperial,
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Units::Metric => write!(f, "Metric"),
            Units::Imperial => write!(f, "Imperial"),
        }
    }
}

/// User profile used for display units and energy estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Display name
    pub name: String,
    /// Weight in kilograms
    pub weight_kg: f64,
    /// Unit preference
    pub units: Units,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Walker".to_string(),
            weight_kg: 70.0,
            units: Units::Metric,
        }
    }
}

impl UserProfile {
    /// Create a new user profile with the given name.
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Validate weight value (30-250 kg).
    pub fn validate_weight(weight: f64) -> bool {
        (30.0..=250.0).contains(&weight)
    }

    /// Reject a weight outside the supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !Self::validate_weight(self.weight_kg) {
            return Err(ConfigError::Invalid(format!(
                "weight_kg must be between 30 and 250, got {}",
                self.weight_kg
            )));
        }
        Ok(())
    }

    /// Convert distance to the user's preferred units.
    pub fn convert_distance(&self, distance_km: f64) -> (f64, &'static str) {
        match self.units {
            Units::Metric => (distance_km, "km"),
            Units::Imperial => (distance_km * 0.621371, "mi"),
        }
    }
}

/// Tunables of the step and distance estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Assumed distance per step, used to turn GPS displacement into steps
    pub stride_length_m: f64,
    /// Accelerometer magnitude above which a reading counts as a step
    pub accel_threshold: f64,
    /// Requested accelerometer sampling rate
    pub accel_frequency_hz: u32,
    /// Which sensor is authoritative for the step count
    pub step_source: StepSource,
    /// Readings ignored after a counted accelerometer step. Zero disables the
    /// refractory window, so a sustained reading above threshold counts on
    /// every sample.
    pub accel_refractory_samples: u32,
    /// Fixes reporting a worse accuracy radius than this are discarded
    pub max_accuracy_m: Option<f64>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            stride_length_m: DEFAULT_STRIDE_LENGTH_M,
            accel_threshold: DEFAULT_ACCEL_THRESHOLD,
            accel_frequency_hz: DEFAULT_ACCEL_FREQUENCY_HZ,
            step_source: StepSource::default(),
            accel_refractory_samples: 0,
            max_accuracy_m: None,
        }
    }
}

impl TrackerSettings {
    /// Reject values the estimator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.stride_length_m.is_finite() && self.stride_length_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "stride_length_m must be positive, got {}",
                self.stride_length_m
            )));
        }
        if !(self.accel_threshold.is_finite() && self.accel_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "accel_threshold must be positive, got {}",
                self.accel_threshold
            )));
        }
        if self.accel_frequency_hz == 0 {
            return Err(ConfigError::Invalid(
                "accel_frequency_hz must be at least 1".to_string(),
            ));
        }
        if let Some(max) = self.max_accuracy_m {
            if max.is_nan() || max <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "max_accuracy_m must be positive, got {}",
                    max
                )));
            }
        }
        Ok(())
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Estimator settings
    pub tracker: TrackerSettings,
    /// User profile
    pub profile: UserProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            tracker: TrackerSettings::default(),
            profile: UserProfile::default(),
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "steptrack", "StepTrack")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.data_dir = get_data_dir();
    Ok(config)
}

/// Load configuration from `path`, returning defaults when it does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.tracker.validate()?;
    config.profile.validate()?;

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&get_config_path(), config)
}

/// Save configuration to `path`, creating parent directories as needed.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
