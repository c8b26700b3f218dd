//! Text effects: maps an effect descriptor onto concrete shadow/stroke/fill parameters.

use crate::color::parse_color_or;
use kurbo::Vec2;
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Value used for any absent 0–100 slider.
pub const DEFAULT_SLIDER: f64 = 50.0;
/// Shadow direction (degrees) used when absent.
pub const DEFAULT_DIRECTION: f64 = 45.0;

/// Kind of text effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    #[default]
    None,
    Shadow,
    Lift,
    Hollow,
    Outline,
    Echo,
    Glitch,
    Neon,
    Splice,
}

impl EffectKind {
    /// Get all effect kinds.
    pub fn all() -> &'static [EffectKind] {
        &[
            EffectKind::None,
            EffectKind::Shadow,
            EffectKind::Lift,
            EffectKind::Hollow,
            EffectKind::Outline,
            EffectKind::Echo,
            EffectKind::Glitch,
            EffectKind::Neon,
            EffectKind::Splice,
        ]
    }

    /// Color used when the descriptor has none.
    fn fallback_color(self, colors: &EffectColors) -> Color {
        match self {
            EffectKind::Lift => colors.lift,
            EffectKind::Glitch => colors.glitch,
            EffectKind::Neon => colors.neon,
            _ => colors.default,
        }
    }
}

/// Effect parameters attached to a text element. Sliders are 0–100; unused fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDescriptor {
    #[serde(rename = "type", default)]
    pub kind: EffectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Shadow direction in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<f64>,
}

impl EffectDescriptor {
    /// Create a descriptor of the given kind with every parameter absent.
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    fn blur(&self) -> f64 {
        slider(self.blur)
    }

    fn offset(&self) -> f64 {
        slider(self.offset)
    }

    fn thickness(&self) -> f64 {
        slider(self.thickness)
    }

    fn transparency(&self) -> f64 {
        slider(self.transparency)
    }

    fn direction(&self) -> f64 {
        self.direction.filter(|d| d.is_finite()).unwrap_or(DEFAULT_DIRECTION)
    }
}

fn slider(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(DEFAULT_SLIDER)
}

/// Fallback colors for effects whose descriptor carries no color.
#[derive(Debug, Clone, Copy)]
pub struct EffectColors {
    /// Lift shadow (translucent black).
    pub lift: Color,
    /// Glitch shadow (magenta).
    pub glitch: Color,
    /// Neon glow.
    pub neon: Color,
    /// Every other effect.
    pub default: Color,
}

impl Default for EffectColors {
    fn default() -> Self {
        Self {
            lift: Color::from_rgba8(0, 0, 0, 128),
            glitch: Color::from_rgba8(255, 0, 255, 255),
            neon: Color::from_rgba8(0, 255, 255, 255),
            default: Color::BLACK,
        }
    }
}

/// Drop-shadow paint parameters.
#[derive(Debug, Clone, Copy)]
pub struct ShadowParams {
    pub color: Color,
    pub blur: f64,
    pub offset: Vec2,
    /// Shadow opacity (0–1), applied on top of the color's alpha.
    pub opacity: f64,
}

/// Text outline paint parameters.
#[derive(Debug, Clone, Copy)]
pub struct StrokeParams {
    pub width: f64,
    pub color: Color,
}

/// Concrete paint parameters for a text element.
#[derive(Debug, Clone, Copy)]
pub struct PaintParams {
    pub shadow: Option<ShadowParams>,
    pub stroke: Option<StrokeParams>,
    /// Whether the glyph interiors are filled with the text color.
    pub fill_enabled: bool,
}

impl Default for PaintParams {
    fn default() -> Self {
        Self {
            shadow: None,
            stroke: None,
            fill_enabled: true,
        }
    }
}

/// Resolve an effect with the default fallback colors.
pub fn resolve_effect(effect: &EffectDescriptor, base_text_color: Color) -> PaintParams {
    resolve_effect_with(effect, base_text_color, &EffectColors::default())
}

/// Resolve an effect into paint parameters.
pub fn resolve_effect_with(
    effect: &EffectDescriptor,
    base_text_color: Color,
    colors: &EffectColors,
) -> PaintParams {
    let kind = effect.kind;
    let color = || {
        let fallback = kind.fallback_color(colors);
        effect
            .color
            .as_deref()
            .map(|c| parse_color_or(c, fallback))
            .unwrap_or(fallback)
    };
    let shadow = |color: Color, blur: f64, offset: Vec2, opacity: f64| ShadowParams {
        color,
        blur,
        offset,
        opacity,
    };

    match kind {
        EffectKind::None => PaintParams::default(),
        EffectKind::Shadow => {
            let distance = effect.offset() * 0.1;
            let angle = effect.direction().to_radians();
            PaintParams {
                shadow: Some(shadow(
                    color(),
                    effect.blur() / 10.0,
                    Vec2::new(distance * angle.cos(), distance * angle.sin()),
                    1.0 - effect.transparency() / 100.0,
                )),
                ..Default::default()
            }
        }
        EffectKind::Lift => PaintParams {
            shadow: Some(shadow(
                colors.lift,
                effect.blur() / 5.0,
                Vec2::new(0.0, 15.0),
                0.5,
            )),
            ..Default::default()
        },
        EffectKind::Hollow => PaintParams {
            stroke: Some(StrokeParams {
                width: effect.thickness() / 25.0,
                color: base_text_color,
            }),
            fill_enabled: false,
            ..Default::default()
        },
        EffectKind::Outline => PaintParams {
            stroke: Some(StrokeParams {
                width: effect.thickness() / 15.0,
                color: color(),
            }),
            ..Default::default()
        },
        EffectKind::Echo => PaintParams {
            shadow: Some(shadow(color(), 0.0, Vec2::new(-effect.offset() / 10.0, 0.0), 0.5)),
            ..Default::default()
        },
        EffectKind::Glitch => {
            let shift = effect.offset() / 20.0;
            PaintParams {
                shadow: Some(shadow(colors.glitch, 0.0, Vec2::new(shift, -shift), 0.7)),
                ..Default::default()
            }
        }
        EffectKind::Neon => PaintParams {
            shadow: Some(shadow(color(), effect.blur() / 2.0, Vec2::ZERO, 1.0)),
            ..Default::default()
        },
        EffectKind::Splice => {
            let shift = effect.offset() / 10.0;
            PaintParams {
                shadow: Some(shadow(color(), 0.0, Vec2::new(shift, shift), 1.0)),
                stroke: Some(StrokeParams {
                    width: effect.thickness() / 25.0,
                    color: base_text_color,
                }),
                fill_enabled: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    fn descriptor(kind: EffectKind) -> EffectDescriptor {
        EffectDescriptor {
            kind,
            color: Some("#ff0000".to_string()),
            blur: Some(50.0),
            offset: Some(50.0),
            direction: Some(45.0),
            thickness: Some(50.0),
            transparency: Some(40.0),
        }
    }

    fn rgba(color: Color) -> (u8, u8, u8, u8) {
        let c = color.to_rgba8();
        (c.r, c.g, c.b, c.a)
    }

    fn base_color() -> Color {
        Color::from_rgba8(20, 40, 60, 255)
    }

    #[test]
    fn test_none_is_plain_fill() {
        let params = resolve_effect(&descriptor(EffectKind::None), base_color());
        assert!(params.shadow.is_none());
        assert!(params.stroke.is_none());
        assert!(params.fill_enabled);
    }

    #[test]
    fn test_shadow() {
        let params = resolve_effect(&descriptor(EffectKind::Shadow), base_color());
        let shadow = params.shadow.unwrap();
        assert_eq!(rgba(shadow.color), (255, 0, 0, 255));
        assert!((shadow.blur - 5.0).abs() < EPS);
        assert!((shadow.opacity - 0.6).abs() < EPS);
        let expected = 5.0 * std::f64::consts::FRAC_PI_4.cos();
        assert!((shadow.offset.x - expected).abs() < EPS);
        assert!((shadow.offset.y - expected).abs() < EPS);
        assert!((shadow.offset.x - 3.5355).abs() < 1e-3);
        assert!(params.stroke.is_none());
        assert!(params.fill_enabled);
    }

    #[rstest]
    #[case(EffectKind::Lift, 10.0, (0.0, 15.0), 0.5)]
    #[case(EffectKind::Echo, 0.0, (-5.0, 0.0), 0.5)]
    #[case(EffectKind::Glitch, 0.0, (2.5, -2.5), 0.7)]
    #[case(EffectKind::Neon, 25.0, (0.0, 0.0), 1.0)]
    #[case(EffectKind::Splice, 0.0, (5.0, 5.0), 1.0)]
    fn test_shadow_table(
        #[case] kind: EffectKind,
        #[case] blur: f64,
        #[case] offset: (f64, f64),
        #[case] opacity: f64,
    ) {
        let shadow = resolve_effect(&descriptor(kind), base_color()).shadow.unwrap();
        assert!((shadow.blur - blur).abs() < EPS, "{kind:?} blur {}", shadow.blur);
        assert!((shadow.offset.x - offset.0).abs() < EPS, "{kind:?} dx {}", shadow.offset.x);
        assert!((shadow.offset.y - offset.1).abs() < EPS, "{kind:?} dy {}", shadow.offset.y);
        assert!((shadow.opacity - opacity).abs() < EPS, "{kind:?} opacity {}", shadow.opacity);
    }

    #[test]
    fn test_fixed_shadow_colors_ignore_descriptor() {
        let lift = resolve_effect(&descriptor(EffectKind::Lift), base_color()).shadow.unwrap();
        assert_eq!(rgba(lift.color), (0, 0, 0, 128));
        let glitch = resolve_effect(&descriptor(EffectKind::Glitch), base_color()).shadow.unwrap();
        assert_eq!(rgba(glitch.color), (255, 0, 255, 255));
        let echo = resolve_effect(&descriptor(EffectKind::Echo), base_color()).shadow.unwrap();
        assert_eq!(rgba(echo.color), (255, 0, 0, 255));
    }

    #[rstest]
    #[case(EffectKind::Hollow, 2.0, false, false)]
    #[case(EffectKind::Outline, 50.0 / 15.0, true, true)]
    #[case(EffectKind::Splice, 2.0, false, false)]
    fn test_stroke_table(
        #[case] kind: EffectKind,
        #[case] width: f64,
        #[case] fill_enabled: bool,
        #[case] uses_effect_color: bool,
    ) {
        let params = resolve_effect(&descriptor(kind), base_color());
        let stroke = params.stroke.unwrap();
        assert!((stroke.width - width).abs() < EPS);
        assert_eq!(params.fill_enabled, fill_enabled);
        let expected = if uses_effect_color { (255, 0, 0, 255) } else { (20, 40, 60, 255) };
        assert_eq!(rgba(stroke.color), expected);
    }

    #[test]
    fn test_only_splice_and_stroke_effects_have_strokes() {
        for &kind in EffectKind::all() {
            let params = resolve_effect(&descriptor(kind), base_color());
            let expects_stroke = matches!(kind, EffectKind::Hollow | EffectKind::Outline | EffectKind::Splice);
            assert_eq!(params.stroke.is_some(), expects_stroke, "{kind:?}");
        }
    }

    #[test]
    fn test_absent_fields_default_to_fifty() {
        let params = resolve_effect(&EffectDescriptor::new(EffectKind::Shadow), base_color());
        let shadow = params.shadow.unwrap();
        assert!((shadow.blur - 5.0).abs() < EPS);
        assert!((shadow.opacity - 0.5).abs() < EPS);
        assert_eq!(rgba(shadow.color), (0, 0, 0, 255));

        let neon = resolve_effect(&EffectDescriptor::new(EffectKind::Neon), base_color()).shadow.unwrap();
        assert!((neon.blur - 25.0).abs() < EPS);
        assert_eq!(rgba(neon.color), (0, 255, 255, 255));
    }

    #[test]
    fn test_descriptor_from_json() {
        let json = r##"{"type":"outline","color":"#00ff00","thickness":30}"##;
        let effect: EffectDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(effect.kind, EffectKind::Outline);
        let stroke = resolve_effect(&effect, base_color()).stroke.unwrap();
        assert!((stroke.width - 2.0).abs() < EPS);
        assert_eq!(rgba(stroke.color), (0, 255, 0, 255));
    }
}
