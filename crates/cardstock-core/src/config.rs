use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default number of cards rendered per template page.
pub const DEFAULT_CARDS_PER_PAGE: usize = 4;

/// Conversion backend configuration.
///
/// Both strategies drive the same office binary; the session strategy adds a
/// private user profile so it never contends with a desktop instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Office binary used for document conversion
    #[serde(default = "default_converter_binary")]
    pub binary: PathBuf,

    /// Hard timeout per conversion attempt, in seconds.
    /// A hung external process is killed when this expires.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_converter_binary() -> PathBuf {
    PathBuf::from("soffice")
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary: default_converter_binary(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Conversion backend configuration
    #[serde(default)]
    pub converter: ConverterConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/cardstock/config.toml, ./cardstock.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("cardstock").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = std::path::PathBuf::from("cardstock.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./cardstock.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./cardstock.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}

/// Column-to-slot mapping descriptor.
///
/// Persisted as JSON with exactly two recognized fields:
///
/// ```json
/// { "cards_per_page": 4, "mapping": { "Name": "NAME", "Score": "SCORE" } }
/// ```
///
/// Parsing is deliberately lenient: an absent or invalid `cards_per_page`
/// falls back to 4, and a missing `mapping` object yields no entries (the
/// per-header identity default is applied later, once headers are known).
/// Entry order follows the JSON object's insertion order and is preserved
/// through slot resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingConfig {
    /// Records placed on one template page
    pub cards_per_page: usize,
    /// Ordered (sourceField, slotBaseName) pairs, unique on sourceField
    pub entries: Vec<(String, String)>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            cards_per_page: DEFAULT_CARDS_PER_PAGE,
            entries: Vec::new(),
        }
    }
}

impl MappingConfig {
    /// Parse a mapping descriptor from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse mapping descriptor: {e}")))?;

        let cards_per_page = value
            .get("cards_per_page")
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_CARDS_PER_PAGE);

        let mut entries = Vec::new();
        if let Some(mapping) = value.get("mapping").and_then(serde_json::Value::as_object) {
            for (field, slot) in mapping {
                let slot = slot.as_str().unwrap_or(field).to_string();
                entries.push((field.clone(), slot));
            }
        }

        Ok(Self {
            cards_per_page,
            entries,
        })
    }

    /// Load a mapping descriptor from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read mapping file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Identity mapping for a known header row: each column maps to its own
    /// name as slot base name.
    pub fn identity(cards_per_page: usize, headers: &[String]) -> Self {
        Self {
            cards_per_page,
            entries: headers.iter().map(|h| (h.clone(), h.clone())).collect(),
        }
    }

    /// Resolve this mapping against the actual header row: configured entries
    /// keep their order, and any header without an entry defaults to itself.
    pub fn resolved_for_headers(&self, headers: &[String]) -> Vec<(String, String)> {
        let mut entries = self.entries.clone();
        for header in headers {
            if !entries.iter().any(|(field, _)| field == header) {
                entries.push((header.clone(), header.clone()));
            }
        }
        entries
    }
}
