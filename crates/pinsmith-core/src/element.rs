//! Template elements: the nodes of a pin template's flat scene list.

use crate::effects::EffectDescriptor;
use crate::geometry::{finite_or, non_negative};
use crate::text::{
    AutoFit, FontSpec, FontStyle, FontWeight, TextAlign, TextDecoration, TextTransform, VerticalAlign,
};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable, unique identifier of an element within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create a new random element ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// Fields shared by every element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementBase {
    pub id: ElementId,
    /// Left edge in canvas units.
    #[serde(default)]
    pub x: f64,
    /// Top edge in canvas units.
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Rotation in degrees around the top-left corner.
    #[serde(default)]
    pub rotation: f64,
    /// Opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Locked elements are painted but receive no interaction.
    #[serde(default)]
    pub is_locked: bool,
}

impl ElementBase {
    pub fn new(id: impl Into<ElementId>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width: Some(width),
            height: Some(height),
            rotation: 0.0,
            opacity: 1.0,
            is_locked: false,
        }
    }

    /// Top-left corner, with non-finite coordinates mapped to 0.
    pub fn origin(&self) -> Point {
        Point::new(finite_or(self.x, 0.0), finite_or(self.y, 0.0))
    }

    /// Opacity clamped to `0..=1`.
    pub fn opacity(&self) -> f64 {
        if self.opacity.is_finite() { self.opacity.clamp(0.0, 1.0) } else { 1.0 }
    }

    /// Rotation in degrees, 0 when not finite.
    pub fn rotation(&self) -> f64 {
        finite_or(self.rotation, 0.0)
    }
}

/// A slot that displays a cover-fitted image, or a placeholder when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSlot {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default)]
    pub border_radius: f64,
    /// Source of the bound image (resolved to a bitmap by the asset layer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Placeholder caption when no image is bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageSlot {
    pub fn new(id: impl Into<ElementId>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            base: ElementBase::new(id, x, y, width, height),
            border_radius: 0.0,
            image: None,
            name: None,
        }
    }

    pub fn with_image(mut self, source: impl Into<String>) -> Self {
        self.image = Some(source.into());
        self
    }

    pub fn with_border_radius(mut self, radius: f64) -> Self {
        self.border_radius = radius;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

fn default_font_size() -> f64 {
    TextElement::DEFAULT_FONT_SIZE
}

fn default_font_family() -> String {
    TextElement::DEFAULT_FONT_FAMILY.to_string()
}

fn default_line_height() -> f64 {
    TextElement::DEFAULT_LINE_HEIGHT
}

/// A wrapped text block, optionally auto-fitted to its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(flatten)]
    pub base: ElementBase,
    /// Text content; may contain `{{variable}}` tokens.
    #[serde(default)]
    pub content: String,
    /// Configured (maximum) font size.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default)]
    pub text_transform: TextTransform,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub vertical_align: VerticalAlign,
    #[serde(default)]
    pub letter_spacing: f64,
    /// Line height as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default)]
    pub text_decoration: TextDecoration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// `Some(true)` forces auto-fit, `Some(false)` disables it, `None` enables it for variable text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectDescriptor>,
}

impl TextElement {
    pub const DEFAULT_FONT_SIZE: f64 = 32.0;
    pub const DEFAULT_FONT_FAMILY: &'static str = "Inter";
    pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;

    pub fn new(
        id: impl Into<ElementId>,
        content: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            base: ElementBase::new(id, x, y, width, height),
            content: content.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: Self::DEFAULT_FONT_FAMILY.to_string(),
            font_weight: FontWeight::default(),
            font_style: FontStyle::default(),
            text_transform: TextTransform::default(),
            text_align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
            letter_spacing: 0.0,
            line_height: Self::DEFAULT_LINE_HEIGHT,
            text_decoration: TextDecoration::default(),
            color: None,
            auto_fit: None,
            effect: None,
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_auto_fit(mut self, auto_fit: Option<bool>) -> Self {
        self.auto_fit = auto_fit;
        self
    }

    pub fn with_effect(mut self, effect: EffectDescriptor) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn with_text_transform(mut self, transform: TextTransform) -> Self {
        self.text_transform = transform;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Auto-fit mode derived from the stored flag.
    pub fn auto_fit_mode(&self) -> AutoFit {
        AutoFit::from_flag(self.auto_fit)
    }

    /// Font description at `size`.
    pub fn font_spec(&self, size: f64) -> FontSpec {
        FontSpec {
            family: self.font_family.clone(),
            size,
            weight: self.font_weight,
            style: self.font_style,
            letter_spacing: finite_or(self.letter_spacing, 0.0),
            line_height: if self.line_height.is_finite() && self.line_height > 0.0 {
                self.line_height
            } else {
                Self::DEFAULT_LINE_HEIGHT
            },
        }
    }
}

/// A flat, optionally rounded rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default)]
    pub border_radius: f64,
}

impl ShapeElement {
    pub fn new(id: impl Into<ElementId>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            base: ElementBase::new(id, x, y, width, height),
            fill: None,
            border_radius: 0.0,
        }
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }
}

/// The brand logo, stretched to its declared size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LogoElement {
    pub fn new(id: impl Into<ElementId>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            base: ElementBase::new(id, x, y, width, height),
            image: None,
        }
    }

    pub fn with_image(mut self, source: impl Into<String>) -> Self {
        self.image = Some(source.into());
        self
    }
}

/// A translucent wash, full-canvas unless sized explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

impl OverlayElement {
    /// Create a full-canvas overlay.
    pub fn new(id: impl Into<ElementId>) -> Self {
        Self {
            base: ElementBase {
                id: id.into(),
                x: 0.0,
                y: 0.0,
                width: None,
                height: None,
                rotation: 0.0,
                opacity: 1.0,
                is_locked: false,
            },
            fill: None,
        }
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }
}

/// Element kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    ImageSlot,
    Text,
    Shape,
    Logo,
    Overlay,
}

impl ElementKind {
    /// The `type` tag used in scene data.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::ImageSlot => "imageSlot",
            ElementKind::Text => "text",
            ElementKind::Shape => "shape",
            ElementKind::Logo => "logo",
            ElementKind::Overlay => "overlay",
        }
    }

    /// Look up a kind by its `type` tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "imageSlot" => Some(ElementKind::ImageSlot),
            "text" => Some(ElementKind::Text),
            "shape" => Some(ElementKind::Shape),
            "logo" => Some(ElementKind::Logo),
            "overlay" => Some(ElementKind::Overlay),
            _ => None,
        }
    }
}

/// One node of a template scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Element {
    ImageSlot(ImageSlot),
    Text(TextElement),
    Shape(ShapeElement),
    Logo(LogoElement),
    Overlay(OverlayElement),
}

impl Element {
    pub fn base(&self) -> &ElementBase {
        match self {
            Element::ImageSlot(e) => &e.base,
            Element::Text(e) => &e.base,
            Element::Shape(e) => &e.base,
            Element::Logo(e) => &e.base,
            Element::Overlay(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        match self {
            Element::ImageSlot(e) => &mut e.base,
            Element::Text(e) => &mut e.base,
            Element::Shape(e) => &mut e.base,
            Element::Logo(e) => &mut e.base,
            Element::Overlay(e) => &mut e.base,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.base().id
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::ImageSlot(_) => ElementKind::ImageSlot,
            Element::Text(_) => ElementKind::Text,
            Element::Shape(_) => ElementKind::Shape,
            Element::Logo(_) => ElementKind::Logo,
            Element::Overlay(_) => ElementKind::Overlay,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.base().is_locked
    }

    /// Get the text element if this is one.
    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            Element::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Resolved frame in canvas units.
    ///
    /// Missing sizes are 0, except overlays (and text width) which default to
    /// the remaining canvas extent. Sizes are never negative or non-finite.
    pub fn frame(&self, canvas: Size) -> Rect {
        let base = self.base();
        let origin = base.origin();
        let (default_width, default_height) = match self {
            Element::Overlay(_) => (canvas.width, canvas.height),
            Element::Text(_) => (canvas.width - origin.x, 0.0),
            _ => (0.0, 0.0),
        };
        let width = non_negative(base.width.unwrap_or(default_width));
        let height = non_negative(base.height.unwrap_or(default_height));
        Rect::from_origin_size(origin, Size::new(width, height))
    }
}
