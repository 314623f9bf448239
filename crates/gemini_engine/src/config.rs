//! Harvest settings, read from a RON file.
//!
//! ```ron
//! (
//!     catalog: (page_size: 25),
//!     import: (validation_policy: Reject, compute_extents: false),
//! )
//! ```
//!
//! Omitted sections and fields take their defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use engine_logging::engine_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchSettings;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::validate::{GEMINI2_PROFILE, ISO19139_PROFILE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("cannot parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("cannot write config: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub fetch: FetchConfig,
    pub catalog: CatalogConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&FetchSettings::default())
    }
}

impl From<&FetchSettings> for FetchConfig {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            redirect_limit: settings.redirect_limit,
            max_bytes: settings.max_bytes,
            allowed_content_types: settings.allowed_content_types.clone(),
        }
    }
}

impl FetchConfig {
    pub fn to_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            allowed_content_types: self.allowed_content_types.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Identifiers requested per `GetRecords` call.
    pub page_size: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// What to do with a document that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Log the messages and import anyway.
    #[default]
    Warn,
    /// Fail the unit.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Profiles handed to the validator. Empty disables validation.
    pub validator_profiles: Vec<String>,
    pub validation_policy: ValidationPolicy,
    pub compute_extents: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            validator_profiles: vec![ISO19139_PROFILE.to_string(), GEMINI2_PROFILE.to_string()],
            validation_policy: ValidationPolicy::Warn,
            compute_extents: true,
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.page_size == 0 {
            return Err(ConfigError::Invalid(
                "catalog.page_size must be greater than zero".to_string(),
            ));
        }
        if self
            .import
            .validator_profiles
            .iter()
            .any(|profile| profile.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "import.validator_profiles contains an empty name".to_string(),
            ));
        }
        if self.fetch.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn parse_config(text: &str) -> Result<HarvestConfig, ConfigError> {
    let config: HarvestConfig =
        ron::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<HarvestConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    let config = parse_config(&text)?;
    engine_info!("Loaded harvest config from {:?}", path);
    Ok(config)
}

pub fn save_config(path: &Path, config: &HarvestConfig) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(config, pretty)
        .map_err(|err| ConfigError::Parse(err.to_string()))?;
    AtomicFileWriter::new(path.to_path_buf()).write(content.as_bytes())?;
    Ok(())
}
