//! Configuration parsing and serialization.
//!
//! The file format is chosen by extension: `.yaml`/`.yml`, `.json` or `.toml`.

use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{apply_defaults, validate_config};
use crate::error::ConfigError;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }
}

/// Parse raw file content. Defaults for absent numeric fields come from serde.
pub fn parse(content: &str, format: ConfigFormat) -> Result<GatewayConfig, ConfigError> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
    }
}

/// Render a config in the given format.
pub fn serialize(config: &GatewayConfig, format: ConfigFormat) -> Result<String, ConfigError> {
    match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string())),
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string())),
    }
}

/// Apply defaults and validate, yielding a config ready to be installed.
pub fn prepare(mut config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    apply_defaults(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load, default and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    prepare(parse(&content, format)?)
}
