use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::criteria::SearchCriteria;
use crate::models::Coordinate;
use crate::services::DEFAULT_FAILURE_MESSAGE;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub geolocation: GeolocationSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_failure_message")]
    pub failure_message: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            auth_token: None,
            failure_message: default_failure_message(),
        }
    }
}

impl ServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String { "http://localhost:8000".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_failure_message() -> String { DEFAULT_FAILURE_MESSAGE.to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct GeolocationSettings {
    #[serde(default = "default_fallback_lat")]
    pub fallback_lat: f64,
    #[serde(default = "default_fallback_lng")]
    pub fallback_lng: f64,
    #[serde(default = "default_geolocation_timeout_ms")]
    pub timeout_ms: u64,
    /// Fixed device position, for hosts without a positioning capability
    pub device_lat: Option<f64>,
    pub device_lng: Option<f64>,
}

impl Default for GeolocationSettings {
    fn default() -> Self {
        Self {
            fallback_lat: default_fallback_lat(),
            fallback_lng: default_fallback_lng(),
            timeout_ms: default_geolocation_timeout_ms(),
            device_lat: None,
            device_lng: None,
        }
    }
}

impl GeolocationSettings {
    pub fn fallback(&self) -> Result<Coordinate, ConfigError> {
        Coordinate::new(self.fallback_lat, self.fallback_lng)
            .map_err(|e| ConfigError::Message(format!("geolocation fallback: {}", e)))
    }

    pub fn device(&self) -> Result<Option<Coordinate>, ConfigError> {
        match (self.device_lat, self.device_lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng)
                .map(Some)
                .map_err(|e| ConfigError::Message(format!("geolocation device position: {}", e))),
            (None, None) => Ok(None),
            _ => Err(ConfigError::Message(
                "geolocation.device_lat and geolocation.device_lng must be set together".to_string(),
            )),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// Seoul City Hall
fn default_fallback_lat() -> f64 { 37.5665 }
fn default_fallback_lng() -> f64 { 126.978 }
fn default_geolocation_timeout_ms() -> u64 { 5000 }

#[derive(Debug, Clone, Deserialize)]
pub struct OverlaySettings {
    #[serde(default = "default_remount_delay_ms")]
    pub remount_delay_ms: u64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self { remount_delay_ms: default_remount_delay_ms() }
    }
}

impl OverlaySettings {
    pub fn remount_delay(&self) -> Duration {
        Duration::from_millis(self.remount_delay_ms)
    }
}

fn default_remount_delay_ms() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_radius_km: default_radius_km() }
    }
}

impl SearchSettings {
    /// Fresh criteria at `location` with the configured radius
    pub fn criteria_at(&self, location: Coordinate) -> SearchCriteria {
        SearchCriteria::new(location, self.default_radius_km)
    }
}

fn default_radius_km() -> f64 { 2.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with TASTE__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., TASTE__SERVICE__BASE_URL -> service.base_url
            .add_source(environment())
            .build()?;

        let settings = substitute_auth_token(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        let settings = substitute_auth_token(settings)?;

        settings.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("TASTE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// The credential token obtained by the login flow may be handed over as
/// `TASTE_AUTH_TOKEN` instead of living in a config file
fn substitute_auth_token(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("TASTE_AUTH_TOKEN") {
        Ok(token) if !token.trim().is_empty() => Config::builder()
            .add_source(settings)
            .set_override("service.auth_token", token)?
            .build(),
        _ => Ok(settings),
    }
}
