//! Configuration management for foamtail
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::catalog::{DEFAULT_PLUGIN, DEFAULT_VARIABLES, DEFAULT_VENDOR};
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Upper bound for the log fetch timeout
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound for the polling interval (one day)
const MAX_INTERVAL_SECONDS: u64 = 86_400;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Address foamtail's own HTTP surface binds to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    9108
}

/// The HTTP server publishing the solver log
///
/// Fields are private so a validated config cannot be mutated afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    host: String,
    #[serde(default = "default_source_port")]
    port: u16,
    file_path: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl SourceConfig {
    /// Host name or IP of the log server; also used as the `hostname` tag
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path of the log resource relative to the server root
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Hard bound on a single log fetch
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Base URL of the log server, e.g. `http://10.1.0.1:8000`
    pub fn base_url(&self) -> String {
        crate::fetch::build_url(&self.host, self.port)
    }
}

fn default_source_port() -> u16 {
    8000
}

fn default_timeout_seconds() -> u64 {
    2
}

/// What a batch does when one metric cannot be extracted
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the first per-metric error and drop the batch
    #[default]
    FailFast,
    /// Log and count the failure, omit that metric, keep the rest
    Skip,
}

/// Collection schedule and batch behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectionConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub on_metric_error: ErrorPolicy,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            on_metric_error: ErrorPolicy::default(),
        }
    }
}

fn default_interval_seconds() -> u64 {
    10
}

/// Namespace prefix and variable list advertised by the catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_vendor")]
    vendor: String,
    #[serde(default = "default_plugin")]
    plugin: String,
    #[serde(default = "default_variables")]
    variables: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
            plugin: default_plugin(),
            variables: default_variables(),
        }
    }
}

impl CatalogConfig {
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

fn default_vendor() -> String {
    DEFAULT_VENDOR.to_string()
}

fn default_plugin() -> String {
    DEFAULT_PLUGIN.to_string()
}

fn default_variables() -> Vec<String> {
    DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            source_host = %config.source.host,
            source_port = config.source.port,
            file_path = %config.source.file_path,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but can
    /// also be called explicitly when constructing Config via other means.
    pub fn validate(&self) -> AppResult<()> {
        // Source
        if self.source.host.trim().is_empty() {
            return Err(AppError::Config(
                "source.host is required and must not be empty".to_string(),
            ));
        }
        if self.source.port == 0 {
            return Err(AppError::Config(
                "source.port must be greater than 0".to_string(),
            ));
        }
        if self.source.file_path.trim().is_empty() {
            return Err(AppError::Config(
                "source.file_path is required and must not be empty".to_string(),
            ));
        }
        if self.source.timeout_seconds == 0 {
            return Err(AppError::Config(
                "source.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.source.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "source.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.source.timeout_seconds
            )));
        }

        // Collection
        if self.collection.interval_seconds == 0
            || self.collection.interval_seconds > MAX_INTERVAL_SECONDS
        {
            return Err(AppError::Config(format!(
                "collection.interval_seconds must be between 1 and {}, got {}",
                MAX_INTERVAL_SECONDS, self.collection.interval_seconds
            )));
        }

        // Catalog: every segment ends up inside a '/'-separated namespace
        for (field, value) in [
            ("catalog.vendor", &self.catalog.vendor),
            ("catalog.plugin", &self.catalog.plugin),
        ] {
            if value.is_empty() || value.contains('/') {
                return Err(AppError::Config(format!(
                    "{} must be a non-empty name without '/', got '{}'",
                    field, value
                )));
            }
        }
        if self.catalog.variables.is_empty() {
            return Err(AppError::Config(
                "catalog.variables must list at least one variable".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for variable in &self.catalog.variables {
            if variable.is_empty() || variable.contains('/') {
                return Err(AppError::Config(format!(
                    "catalog.variables entry '{}' must be non-empty and contain no '/'",
                    variable
                )));
            }
            if !seen.insert(variable.as_str()) {
                return Err(AppError::Config(format!(
                    "catalog.variables lists '{}' more than once",
                    variable
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
