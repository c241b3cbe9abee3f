//! Configuration loading from TOML, YAML or JSON.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{EmbedConfig, ValidationError};

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File content could not be parsed.
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        /// Format that was attempted.
        format: ConfigFormat,
        /// Parser message.
        message: String,
    },

    /// Extension is not one of the supported formats.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Parsed values are out of range.
    #[error("Invalid configuration: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),
}

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        })
    }
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Loads [`EmbedConfig`] from disk.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default location: `<config dir>/canvas-embed/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("canvas-embed").join("config.toml"))
    }

    /// Parse and validate configuration text.
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<EmbedConfig, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse { format, message };

        let config: EmbedConfig = match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
            }
            #[allow(unreachable_patterns)]
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load a configuration file, detecting its format from the extension.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<EmbedConfig, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::load_from_str(&content, format)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise the default location if it exists,
    /// otherwise built-in defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<EmbedConfig, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }

        match Self::default_path() {
            Some(default) if tokio::fs::try_exists(&default).await.unwrap_or(false) => {
                Self::load_from_file(default).await
            }
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(EmbedConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConfigLoader::load_from_str(
            "[export]\nseparator = \"\\n\\n\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.export.separator, "\n\n");
        assert!(config.embed.show_link_icon);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_yaml_and_json() {
        let yaml = ConfigLoader::load_from_str(
            "embed:\n  show_link_icon: false\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert!(!yaml.embed.show_link_icon);

        let json = ConfigLoader::load_from_str(
            r#"{"logging": {"level": "debug"}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(json.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ConfigLoader::load_from_str(
            "[embed]\nlink_icon_rest_opacity = 2.0\n",
            ConfigFormat::Toml,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("embed.link_icon_rest_opacity"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/config.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(ConfigFormat::from_path(Path::new("config.ini")).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[watch]\nprocessed_marker = \"done\"\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).await.unwrap();
        assert_eq!(config.watch.processed_marker, "done");
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::load_or_default(Some(&temp.path().join("nope.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
