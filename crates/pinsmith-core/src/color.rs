//! CSS color strings to peniko colors.

use peniko::Color;
use thiserror::Error;

/// Color parsing errors.
#[derive(Debug, Error)]
pub enum ColorError {
    #[error("Invalid color {input:?}: {reason}")]
    Parse { input: String, reason: String },
}

/// Parse a CSS color string (`#rgb`, `#rrggbbaa`, `rgba(...)`, named colors).
pub fn parse_color(input: &str) -> Result<Color, ColorError> {
    let parsed = csscolorparser::parse(input.trim()).map_err(|e| ColorError::Parse {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    let [r, g, b, a] = parsed.to_rgba8();
    Ok(Color::from_rgba8(r, g, b, a))
}

/// Parse a color, falling back to `fallback` (with a warning) when it is invalid.
pub fn parse_color_or(input: &str, fallback: Color) -> Color {
    match parse_color(input) {
        Ok(color) => color,
        Err(e) => {
            log::warn!("{}; using fallback", e);
            fallback
        }
    }
}

/// Multiply a color's alpha by `opacity` (clamped to 0..=1).
pub fn with_opacity(color: Color, opacity: f64) -> Color {
    let rgba = color.to_rgba8();
    let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    let alpha = (rgba.a as f64 * opacity).round() as u8;
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
}
