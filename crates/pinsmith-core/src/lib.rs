//! Pinsmith Core Library
//!
//! Platform-agnostic element model and layout engines for Pinsmith pin templates:
//! cover-fit image geometry, text auto-fit and effects, and the element renderer
//! that turns a scene into a paint tree for any drawing surface.

pub mod color;
pub mod config;
pub mod effects;
pub mod element;
pub mod geometry;
pub mod interaction;
pub mod paint;
pub mod renderer;
pub mod scene;
pub mod text;

pub use color::{ColorError, parse_color};
pub use config::{ConfigError, RenderConfig};
pub use effects::{EffectDescriptor, EffectKind, PaintParams, ShadowParams, StrokeParams, resolve_effect};
pub use element::{
    Element, ElementBase, ElementId, ElementKind, ImageSlot, LogoElement, OverlayElement, ShapeElement, TextElement,
};
pub use geometry::{CoverFit, ImagePlacement, apply_zoom_pan, clamp_pan, fit_image_to_slot, rounded_rect_clip};
pub use interaction::{ElementPatch, Geometry, InteractionController, InteractionHandler, PointerEvent};
pub use paint::{ImageResource, Interactivity, PaintNode, PaintOp, PaintTree, TextPaint};
pub use renderer::{ElementRenderer, RenderContext};
pub use scene::{Scene, SceneError};
pub use text::{
    ApproximateMeasurer, AutoFit, FontSizeCache, FontSpec, MeasureError, TextMeasurer, VariableResolver,
    auto_fit_font_size,
};
