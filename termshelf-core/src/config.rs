use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub resize_debounce_ms: u64,
    /// Both the scroll idle-timer delay and the horizon for "a scroll
    /// happened recently" when a resize re-render considers deferring.
    pub scroll_settle_ms: u64,
    /// Scale delta past the last rendered scale that forces a repaint.
    pub pinch_rerender_threshold: f32,
    /// Vertical gap between page canvases, logical units.
    pub page_gap: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 200,
            scroll_settle_ms: 600,
            pinch_rerender_threshold: 0.1,
            page_gap: 8.0,
        }
    }
}

impl ViewerConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.pinch_rerender_threshold.is_finite() || self.pinch_rerender_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "pinch_rerender_threshold",
                reason: format!("must be a positive number, got {}", self.pinch_rerender_threshold),
            });
        }
        if !self.page_gap.is_finite() || self.page_gap < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "page_gap",
                reason: format!("must be zero or positive, got {}", self.page_gap),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Device pixels per logical unit, capped at the backing-store limit.
    pub pixel_ratio: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self { pixel_ratio: 1.0 }
    }
}

impl SurfaceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.pixel_ratio.is_finite() || self.pixel_ratio <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "pixel_ratio",
                reason: format!("must be a positive number, got {}", self.pixel_ratio),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub scroll_step: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { scroll_step: 48.0 }
    }
}

impl UiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.scroll_step.is_finite() || self.scroll_step <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "scroll_step",
                reason: format!("must be a positive number, got {}", self.scroll_step),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewer: ViewerConfig,
    pub surface: SurfaceConfig,
    pub ui: UiConfig,
    /// Directory catalog sources are resolved against.
    pub library_dir: Option<String>,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.viewer.validate()?;
        config.surface.validate()?;
        config.ui.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = AppConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config.viewer.resize_debounce_ms, 200);
        assert_eq!(config.viewer.scroll_settle_ms, 600);
        assert_eq!(config.viewer.pinch_rerender_threshold, 0.1);
        assert_eq!(config.surface.pixel_ratio, 1.0);
        assert_eq!(config.ui.scroll_step, 48.0);
        assert!(config.library_dir.is_none());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let raw = r#"
            library_dir = "/srv/binders"

            [viewer]
            scroll_settle_ms = 450

            [surface]
            pixel_ratio = 2.0
        "#;
        let config = AppConfig::from_toml_str(raw).expect("partial config parses");
        assert_eq!(config.viewer.scroll_settle_ms, 450);
        assert_eq!(config.viewer.resize_debounce_ms, 200);
        assert_eq!(config.surface.pixel_ratio, 2.0);
        assert_eq!(config.library_dir.as_deref(), Some("/srv/binders"));
    }

    #[test]
    fn duration_accessors_convert_milliseconds() {
        let config = ViewerConfig::default();
        assert_eq!(config.resize_debounce(), Duration::from_millis(200));
        assert_eq!(config.scroll_settle(), Duration::from_millis(600));
    }

    #[test]
    fn nonsense_values_are_rejected() {
        let bad = "[viewer]\npinch_rerender_threshold = 0.0\n";
        assert!(matches!(
            AppConfig::from_toml_str(bad),
            Err(ConfigError::InvalidValue { field: "pinch_rerender_threshold", .. })
        ));
        let bad = "[surface]\npixel_ratio = -1.0\n";
        assert!(matches!(
            AppConfig::from_toml_str(bad),
            Err(ConfigError::InvalidValue { field: "pixel_ratio", .. })
        ));
        let bad = "[ui]\nscroll_step = 0.0\n";
        assert!(matches!(
            AppConfig::from_toml_str(bad),
            Err(ConfigError::InvalidValue { field: "scroll_step", .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("[viewer\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
