//! # Settings Module
//!
//! ## Purpose
//! Keeps the user's preferences for the yield calculator in one JSON file
//! (`yield_config.json`) so that the interactive menu and the binary start with
//! the same choices every time.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "decimal_places": 2,
//!   "mass_model": "Exact",
//!   "identifier_kind": "Smiles",
//!   "log_level": "warn",
//!   "log_file": null
//! }
//! ```
//!
//! ## Usage Pattern
//! ```rust,no_run
//! use ChemYield::settings::SettingsManager;
//!
//! let mut manager = SettingsManager::new();
//! manager.set_decimal_places(4).unwrap();
//! println!("{}", manager.settings().mass_model);
//! ```
//!
//! A missing file is not an error: defaults are used. A file that exists but does
//! not parse is reported by [`SettingsManager::load`] and replaced by defaults in
//! [`SettingsManager::with_config_file`].

use crate::Stoichiometry::molmass::MassModel;
use crate::Stoichiometry::resolver::IdentifierKind;
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "yield_config.json";
pub const MAX_DECIMAL_PLACES: usize = 12;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error with settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Decimal places must be between 0 and {max}, got {value}")]
    DecimalPlaces { value: usize, max: usize },
    #[error("Unknown log level '{0}', expected off, error, warn, info, debug or trace")]
    LogLevel(String),
}

/// User preferences for the calculator.
///
/// # Fields
/// * `decimal_places` - digits after the point when printing masses
/// * `mass_model` - exact (monoisotopic) or average molecular weights
/// * `identifier_kind` - whether species are typed as SMILES or formulae
/// * `log_level` - log level name for the terminal and file loggers
/// * `log_file` - optional path of a log file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldSettings {
    pub decimal_places: usize,
    pub mass_model: MassModel,
    pub identifier_kind: IdentifierKind,
    pub log_level: String,
    pub log_file: Option<String>,
}

impl Default for YieldSettings {
    fn default() -> Self {
        Self {
            decimal_places: 2,
            mass_model: MassModel::Exact,
            identifier_kind: IdentifierKind::Smiles,
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl YieldSettings {
    /// log level as a `LevelFilter`
    pub fn level_filter(&self) -> Result<LevelFilter, SettingsError> {
        parse_level(&self.log_level)
    }

    /// Checks values that serde accepts but the rest of the program cannot use
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_decimal_places(self.decimal_places)?;
        self.level_filter()?;
        Ok(())
    }
}

fn check_decimal_places(decimal_places: usize) -> Result<(), SettingsError> {
    if decimal_places > MAX_DECIMAL_PLACES {
        return Err(SettingsError::DecimalPlaces {
            value: decimal_places,
            max: MAX_DECIMAL_PLACES,
        });
    }
    Ok(())
}

fn parse_level(level: &str) -> Result<LevelFilter, SettingsError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| SettingsError::LogLevel(level.to_string()))
}

/// Loads, updates and saves [`YieldSettings`].
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: YieldSettings,
    config_file: String,
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsManager {
    /// Settings from `yield_config.json` in the current directory, or defaults.
    pub fn new() -> Self {
        Self::with_config_file(DEFAULT_CONFIG_FILE)
    }

    /// Settings from a custom file. An invalid file is logged and defaults are used.
    pub fn with_config_file(config_file: &str) -> Self {
        let settings = Self::load(config_file).unwrap_or_else(|e| {
            warn!("{}, using default settings", e);
            YieldSettings::default()
        });
        Self {
            settings,
            config_file: config_file.to_string(),
        }
    }

    /// Reads settings from a JSON file. A missing file gives the defaults,
    /// out-of-range values are errors.
    pub fn load(config_file: &str) -> Result<YieldSettings, SettingsError> {
        if !Path::new(config_file).exists() {
            return Ok(YieldSettings::default());
        }
        let content = fs::read_to_string(config_file)?;
        let settings: YieldSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes the current settings to the config file
    pub fn save(&self) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    pub fn settings(&self) -> &YieldSettings {
        &self.settings
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn set_decimal_places(&mut self, decimal_places: usize) -> Result<(), SettingsError> {
        check_decimal_places(decimal_places)?;
        self.settings.decimal_places = decimal_places;
        Ok(())
    }

    pub fn set_mass_model(&mut self, mass_model: MassModel) {
        self.settings.mass_model = mass_model;
    }

    pub fn set_identifier_kind(&mut self, identifier_kind: IdentifierKind) {
        self.settings.identifier_kind = identifier_kind;
    }

    pub fn set_log_level(&mut self, level: &str) -> Result<(), SettingsError> {
        parse_level(level)?;
        self.settings.log_level = level.trim().to_lowercase();
        Ok(())
    }

    /// Back to the default settings (not saved until [`SettingsManager::save`])
    pub fn reset_to_defaults(&mut self) {
        self.settings = YieldSettings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let manager = SettingsManager::with_config_file(path.to_str().unwrap());
        assert_eq!(manager.settings(), &YieldSettings::default());
        assert_eq!(manager.settings().decimal_places, 2);
        assert_eq!(manager.settings().level_filter().unwrap(), LevelFilter::Warn);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("yield_config.json");
        let path = path.to_str().unwrap();

        let mut manager = SettingsManager::with_config_file(path);
        manager.set_decimal_places(4).unwrap();
        manager.set_mass_model(MassModel::Average);
        manager.set_identifier_kind(IdentifierKind::Formula);
        manager.set_log_level("Debug").unwrap();
        manager.save().unwrap();

        let reloaded = SettingsManager::with_config_file(path);
        assert_eq!(reloaded.settings().decimal_places, 4);
        assert_eq!(reloaded.settings().mass_model, MassModel::Average);
        assert_eq!(reloaded.settings().identifier_kind, IdentifierKind::Formula);
        assert_eq!(reloaded.settings().log_level, "debug");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ \"decimal_places\": 3 }}").unwrap();
        let settings = SettingsManager::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.decimal_places, 3);
        assert_eq!(settings.mass_model, MassModel::Exact);
        assert_eq!(settings.log_file, None);
    }

    #[test]
    fn invalid_file_is_reported_and_replaced() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        let path = file.path().to_str().unwrap();
        assert!(matches!(
            SettingsManager::load(path),
            Err(SettingsError::Json(_))
        ));
        let manager = SettingsManager::with_config_file(path);
        assert_eq!(manager.settings(), &YieldSettings::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        let mut manager = SettingsManager::with_config_file(path.to_str().unwrap());
        assert!(matches!(
            manager.set_decimal_places(40),
            Err(SettingsError::DecimalPlaces { value: 40, .. })
        ));
        assert!(matches!(
            manager.set_log_level("loud"),
            Err(SettingsError::LogLevel(_))
        ));
        assert_eq!(manager.settings().decimal_places, 2);
        manager.set_decimal_places(0).unwrap();
        manager.reset_to_defaults();
        assert_eq!(manager.settings().decimal_places, 2);
    }

    #[test]
    fn out_of_range_file_values_fall_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ \"decimal_places\": 70000, \"mass_model\": \"Average\" }}").unwrap();
        let path = file.path().to_str().unwrap();
        assert!(matches!(
            SettingsManager::load(path),
            Err(SettingsError::DecimalPlaces { value: 70000, .. })
        ));
        let manager = SettingsManager::with_config_file(path);
        assert_eq!(manager.settings(), &YieldSettings::default());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ \"log_level\": \"loud\" }}").unwrap();
        assert!(matches!(
            SettingsManager::load(file.path().to_str().unwrap()),
            Err(SettingsError::LogLevel(_))
        ));
    }
}
