//! Format-agnostic configuration loading and saving

use crate::{Error, NormalizedPath, Result, io};
use serde::{Serialize, de::DeserializeOwned};

/// Supported structured file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        match extension.to_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

/// Format-agnostic configuration store.
///
/// Detects the format from the file extension and handles
/// serialization transparently. Used for both the fleet configuration file
/// and sync manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a value from a `.toml`, `.json`, `.yaml` or `.yml` file.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = ConfigFormat::from_path(path)?;
        let content = io::read_text(path)?;
        self.parse(path, format, &content)
    }

    /// Parse already-read content in the given format.
    pub fn parse<T: DeserializeOwned>(
        &self,
        path: &NormalizedPath,
        format: ConfigFormat,
        content: &str,
    ) -> Result<T> {
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| Error::ConfigParse {
            path: path.to_native(),
            format: format.label().into(),
            message,
        })
    }

    /// Save a value, choosing the format from the file extension.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let format = ConfigFormat::from_path(path)?;
        let content = match format {
            ConfigFormat::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
        .map_err(|message| Error::ConfigSerialize {
            path: path.to_native(),
            format: format.label().into(),
            message,
        })?;

        io::write_atomic(path, content.as_bytes())
    }
}
