//! Renderer trait abstraction.

use kurbo::Size;
use peniko::Color;
use pinsmith_core::PaintTree;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Image decode failed: {0}")]
    ImageDecode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Drawing primitives a surface provides natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// Native rounded-rectangle path primitive. Without it, corners are
    /// built from quadratic curves.
    pub round_rect: bool,
    /// Blurred drop shadows.
    pub shadow_blur: bool,
}

impl Default for SurfaceCapabilities {
    fn default() -> Self {
        Self {
            round_rect: true,
            shadow_blur: true,
        }
    }
}

/// Context for a single render frame.
pub struct FrameContext<'a> {
    /// Paint output of the element renderer.
    pub tree: &'a PaintTree,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Clear color when the scene sets no background.
    pub background_color: Color,
}

impl<'a> FrameContext<'a> {
    /// Create a new frame context.
    pub fn new(tree: &'a PaintTree) -> Self {
        Self {
            tree,
            scale_factor: 1.0,
            background_color: Color::WHITE,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the fallback background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Output size in physical pixels.
    pub fn output_size(&self) -> Size {
        let scale = if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        Size::new(self.tree.size.width * scale, self.tree.size.height * scale)
    }
}

/// Trait for drawing surfaces.
///
/// Implementations can record canvas-2D style commands, build a Vello
/// scene, or target any other 2D backend.
pub trait Renderer: Send + Sync {
    /// Primitives this surface supports natively.
    fn capabilities(&self) -> SurfaceCapabilities {
        SurfaceCapabilities::default()
    }

    /// Build the drawing commands for a frame.
    ///
    /// Called once per frame; nodes are drawn in tree order.
    fn build_scene(&mut self, ctx: &FrameContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &FrameContext) -> Color {
        ctx.tree.background.unwrap_or(ctx.background_color)
    }
}
