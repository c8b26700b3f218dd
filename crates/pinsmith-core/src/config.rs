//! Visual constants of the element renderer.

use crate::color::parse_color_or;
use crate::effects::EffectColors;
use crate::text::DEFAULT_MIN_FONT_SIZE;
use peniko::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Renderer theme and tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Smallest size auto-fit may shrink text to.
    pub min_font_size: f64,
    pub placeholder_fill: String,
    pub placeholder_border: String,
    pub placeholder_text: String,
    /// Large label centered in an empty image slot.
    pub placeholder_label: String,
    /// Caption below the label when the slot has no name.
    pub placeholder_caption: String,
    pub placeholder_font_family: String,
    pub logo_placeholder_fill: String,
    pub logo_placeholder_label: String,
    /// Text color when an element sets none.
    pub default_text_color: String,
    /// Overlay fill when an element sets none.
    pub default_overlay_fill: String,
    pub default_shape_fill: String,
    pub lift_shadow_color: String,
    pub glitch_shadow_color: String,
    pub neon_color: String,
    pub effect_fallback_color: String,
    /// Maximum number of memoized auto-fit results.
    pub font_cache_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_font_size: DEFAULT_MIN_FONT_SIZE,
            placeholder_fill: "#e5e7eb".to_string(),
            placeholder_border: "#9ca3af".to_string(),
            placeholder_text: "#6b7280".to_string(),
            placeholder_label: "IMG".to_string(),
            placeholder_caption: "Drop Image".to_string(),
            placeholder_font_family: "Inter".to_string(),
            logo_placeholder_fill: "#d1d5db".to_string(),
            logo_placeholder_label: "LOGO".to_string(),
            default_text_color: "#000000".to_string(),
            default_overlay_fill: "rgba(0, 0, 0, 0.3)".to_string(),
            default_shape_fill: "#cccccc".to_string(),
            lift_shadow_color: "rgba(0, 0, 0, 0.5)".to_string(),
            glitch_shadow_color: "#ff00ff".to_string(),
            neon_color: "#00ffff".to_string(),
            effect_fallback_color: "#000000".to_string(),
            font_cache_capacity: 256,
        }
    }
}

impl RenderConfig {
    /// Load and validate a configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_font_size.is_finite() || self.min_font_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "minFontSize must be positive, got {}",
                self.min_font_size
            )));
        }
        if self.font_cache_capacity == 0 {
            return Err(ConfigError::Invalid("fontCacheCapacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Effect fallback colors, parsed.
    pub fn effect_colors(&self) -> EffectColors {
        let defaults = EffectColors::default();
        EffectColors {
            lift: parse_color_or(&self.lift_shadow_color, defaults.lift),
            glitch: parse_color_or(&self.glitch_shadow_color, defaults.glitch),
            neon: parse_color_or(&self.neon_color, defaults.neon),
            default: parse_color_or(&self.effect_fallback_color, defaults.default),
        }
    }

    pub fn text_color(&self) -> Color {
        parse_color_or(&self.default_text_color, Color::BLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert!((config.min_font_size - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.placeholder_label, "IMG");
        assert_eq!(config.placeholder_caption, "Drop Image");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = RenderConfig::from_json(r#"{"placeholderLabel": "PHOTO", "minFontSize": 12}"#).unwrap();
        assert_eq!(config.placeholder_label, "PHOTO");
        assert!((config.min_font_size - 12.0).abs() < f64::EPSILON);
        assert_eq!(config.logo_placeholder_label, "LOGO");
    }

    #[test]
    fn test_validate_rejects() {
        assert!(matches!(
            RenderConfig::from_json(r#"{"minFontSize": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_json(r#"{"fontCacheCapacity": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(RenderConfig::from_json("[]"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_effect_colors_match_builtin() {
        let colors = RenderConfig::default().effect_colors();
        let builtin = EffectColors::default();
        assert_eq!(colors.glitch.to_rgba8(), builtin.glitch.to_rgba8());
        assert_eq!(colors.neon.to_rgba8(), builtin.neon.to_rgba8());
        let lift = colors.lift.to_rgba8();
        assert_eq!((lift.r, lift.g, lift.b), (0, 0, 0));
        assert!((lift.a as i32 - 128).abs() <= 1);
    }
}
