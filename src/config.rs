//! Multicast configuration
//!
//! This module holds the tunables of the delivery mode selector ("Mode",
//! "Retries", "Retry") and the file-backed configuration manager used to
//! load, validate and reload them into a live selector.

use crate::mode::MulticastModeKind;
use crate::selector::ModeSelector;
use crate::{MulticastError, Result};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of retries for GCR-UR
pub const DEFAULT_RETRIES: i16 = 3;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct MulticastConfig {
    /// Delivery mode tunables
    pub delivery: DeliveryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Delivery mode tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Multicast mode, 0 (Legacy) to 4 (GCR-DBACK)
    pub mode: i16,
    /// Number of retries for modes that support them
    pub retries: i16,
    /// Index of the retry in progress, 0 to `retries`
    pub retry: i16,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: MulticastModeKind::Legacy.value(),
            retries: DEFAULT_RETRIES,
            retry: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DeliveryConfig {
    /// Check the tunables, failing on the first out-of-range value
    pub fn validate(&self) -> Result<MulticastModeKind> {
        let mode = MulticastModeKind::try_from(self.mode)?;
        check_retries(self.retries)?;
        check_retry(self.retry, self.retries)?;
        Ok(mode)
    }
}

pub(crate) fn check_retries(retries: i16) -> Result<()> {
    if retries < 0 {
        return Err(MulticastError::InvalidConfiguration(format!(
            "retries must be non-negative, got {}",
            retries
        )));
    }
    Ok(())
}

pub(crate) fn check_retry(retry: i16, retries: i16) -> Result<()> {
    if retry < 0 || retry > retries {
        return Err(MulticastError::InvalidConfiguration(format!(
            "retry {} out of range 0..={}",
            retry, retries
        )));
    }
    Ok(())
}

/// Configuration validation result
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub valid: bool,
    /// Validation errors
    pub errors: Vec<String>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

/// Configuration manager
#[derive(Debug, Default)]
pub struct ConfigManager {
    /// Current configuration
    config: MulticastConfig,
    /// Path to configuration file
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration manager with config
    pub fn with_config(config: MulticastConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Load configuration from file, picking the format from the extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut manager = Self::new();
        let config = manager.read_validated(path)?;

        manager.config = config;
        manager.config_path = Some(path.to_path_buf());
        Ok(manager)
    }

    /// Get current configuration
    pub fn get_config(&self) -> &MulticastConfig {
        &self.config
    }

    /// Get path of the loaded file, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Replace the configuration and push its delivery tunables into `selector`.
    ///
    /// On error neither the stored configuration nor the selector changes.
    pub fn update_config(&mut self, new_config: MulticastConfig, selector: &mut ModeSelector) -> Result<()> {
        let validation = self.validate_config(&new_config);
        if !validation.valid {
            return Err(MulticastError::Config(format!(
                "Configuration validation failed: {}",
                validation.errors.join(", ")
            )));
        }

        selector.apply_config(&new_config.delivery)?;
        if new_config.delivery != self.config.delivery {
            log::info!(
                "Delivery configuration updated: mode {}, retries {}, retry {}",
                new_config.delivery.mode,
                new_config.delivery.retries,
                new_config.delivery.retry
            );
        }
        self.config = new_config;
        Ok(())
    }

    /// Re-read the configuration file and apply it to `selector`
    pub fn reload(&mut self, selector: &mut ModeSelector) -> Result<()> {
        let Some(path) = self.config_path.clone() else {
            return Err(MulticastError::Config("No config file path set".to_string()));
        };

        log::info!("Reloading configuration from {}", path.display());
        let config = self.read_validated(&path)?;
        self.update_config(config, selector)
    }

    /// Validate configuration
    pub fn validate_config(&self, config: &MulticastConfig) -> ValidationResult {
        let mut result = ValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        let delivery = &config.delivery;
        let mode = match MulticastModeKind::try_from(delivery.mode) {
            Ok(mode) => Some(mode),
            Err(e) => {
                result.errors.push(e.to_string());
                None
            }
        };

        if let Err(e) = check_retries(delivery.retries) {
            result.errors.push(e.to_string());
        } else if let Err(e) = check_retry(delivery.retry, delivery.retries) {
            result.errors.push(e.to_string());
        }

        if let Some(mode) = mode {
            if !mode.uses_retries() && delivery.retry > 0 {
                result.warnings.push(format!(
                    "Retry index {} has no effect in {} mode",
                    delivery.retry, mode
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            result.errors.push(format!(
                "Invalid log level '{}', must be one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ));
        }

        result.valid = result.errors.is_empty();
        result
    }

    fn read_validated(&self, path: &Path) -> Result<MulticastConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| MulticastError::Config(format!("Failed to read config file: {}", e)))?;

        let config: MulticastConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MulticastError::Config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| MulticastError::Config(format!("Failed to parse TOML config: {}", e)))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| MulticastError::Config(format!("Failed to parse YAML config: {}", e)))?,
            _ => return Err(MulticastError::Config("Unsupported config file format".to_string())),
        };

        let validation = self.validate_config(&config);
        if !validation.valid {
            return Err(MulticastError::Config(format!(
                "Configuration validation failed: {}",
                validation.errors.join(", ")
            )));
        }
        for warning in &validation.warnings {
            log::warn!("{}", warning);
        }

        Ok(config)
    }
}
