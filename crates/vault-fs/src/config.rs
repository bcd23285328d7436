//! Format-agnostic settings loading and saving

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result, io};

/// Format-agnostic configuration store.
///
/// Detects the format from the file extension (`.toml`, `.json`, `.yaml` /
/// `.yml`) and handles serialization transparently.
#[derive(Debug, Default)]
pub struct ConfigStore {
    robustness: io::RobustnessConfig,
}

impl ConfigStore {
    /// Create a new ConfigStore with default robustness settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new ConfigStore with custom robustness settings.
    pub fn with_robustness(robustness: io::RobustnessConfig) -> Self {
        Self { robustness }
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = io::read_text(path)?;
        let format = Format::detect(path)?;

        let parsed = match format {
            Format::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.name().into(),
            message,
        })
    }

    /// Save configuration to a file.
    ///
    /// Uses an atomic write so a crash never leaves a truncated settings file.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let format = Format::detect(path)?;

        let content = match format {
            Format::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
        .map_err(|message| Error::ConfigSerialize {
            path: path.to_path_buf(),
            format: format.name().into(),
            message,
        })?;

        io::write_atomic(path, content.as_bytes(), self.robustness).map(|_| ())
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}
