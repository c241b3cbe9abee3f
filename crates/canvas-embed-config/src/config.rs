//! Configuration types.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Canvas to markdown export.
    pub export: ExportConfig,
    /// Rendered node embeds.
    pub embed: EmbedRenderConfig,
    /// Placeholder detection.
    pub watch: WatchConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Placed between exported embed lines.
    pub separator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
        }
    }
}

/// Rendered embed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedRenderConfig {
    /// Attach the "Open in canvas" control to rendered embeds.
    pub show_link_icon: bool,
    /// Link icon opacity when not hovered.
    pub link_icon_rest_opacity: f32,
    /// Link icon opacity on hover.
    pub link_icon_hover_opacity: f32,
    /// Distance of the link icon from the top-right corner, in pixels.
    pub link_icon_offset_px: u32,
}

impl Default for EmbedRenderConfig {
    fn default() -> Self {
        Self {
            show_link_icon: true,
            link_icon_rest_opacity: 0.6,
            link_icon_hover_opacity: 1.0,
            link_icon_offset_px: 8,
        }
    }
}

/// Placeholder detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Class the host puts on embed placeholders.
    pub placeholder_class: String,
    /// Value written to `data-node-embed` once a placeholder is claimed.
    pub processed_marker: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            placeholder_class: "internal-embed".to_string(),
            processed_marker: "parsed".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when no CLI flag is given (`off`, `error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// A configuration value that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl EmbedConfig {
    /// Check value ranges. Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ValidationError {
                field: field.to_string(),
                message: message.to_string(),
            })
        };

        if self.export.separator.is_empty() {
            push("export.separator", "must not be empty");
        }
        for (field, value) in [
            ("embed.link_icon_rest_opacity", self.embed.link_icon_rest_opacity),
            ("embed.link_icon_hover_opacity", self.embed.link_icon_hover_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                push(field, "must be between 0.0 and 1.0");
            }
        }
        if self.watch.placeholder_class.trim().is_empty()
            || self.watch.placeholder_class.contains(char::is_whitespace)
        {
            push("watch.placeholder_class", "must be a single class name");
        }
        if self.watch.processed_marker.is_empty() {
            push("watch.processed_marker", "must not be empty");
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            push("logging.level", "must be one of off, error, warn, info, debug, trace");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
