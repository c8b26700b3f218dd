//! Vello-based renderer implementation.

use crate::images::ImageStore;
use crate::measure::build_layout;
use crate::renderer::{FrameContext, Renderer, SurfaceCapabilities};
use kurbo::{Affine, Join, Rect, RoundedRect, Stroke};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, Layout, LayoutContext};
use peniko::{Brush, Color, Fill, Mix};
use pinsmith_core::color::with_opacity;
use pinsmith_core::text::{TextAlign, TextDecoration, VerticalAlign};
use pinsmith_core::{PaintNode, PaintOp, TextPaint};
use vello::Scene;

/// Where one wrapped line sits inside its text box.
struct LinePlacement {
    x: f64,
    baseline: f64,
    width: f64,
}

/// Stroked passes approximating a blurred shadow.
const BLUR_PASSES: usize = 3;

/// Widest-first `(stroke width, colour)` passes that fake a blur of radius `blur`.
/// Overlapping passes build up alpha towards the glyph edge.
fn blur_halo(blur: f64, color: Color) -> Vec<(f64, Color)> {
    if !(blur.is_finite() && blur > 0.0) {
        return Vec::new();
    }
    let alpha = 1.0 / (BLUR_PASSES as f64 + 1.0);
    (1..=BLUR_PASSES)
        .rev()
        .map(|pass| {
            let width = 2.0 * blur * pass as f64 / BLUR_PASSES as f64;
            (width, with_opacity(color, alpha))
        })
        .collect()
}

enum GlyphStyle<'a> {
    Fill,
    Stroke(&'a Stroke),
}

/// Vello-based renderer for GPU-accelerated pin rendering.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
    /// Font context for text rendering (cached to avoid re-scanning system fonts).
    font_cx: FontContext,
    /// Layout context for text rendering.
    layout_cx: LayoutContext<Brush>,
    /// Decoded bitmaps referenced by image ops.
    images: ImageStore,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloRenderer {
    /// Create a new Vello renderer.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            images: ImageStore::new(),
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Bitmaps available to image ops; decode into this before building a frame.
    pub fn images_mut(&mut self) -> &mut ImageStore {
        &mut self.images
    }

    fn render_node(&mut self, node: &PaintNode, root: Affine, canvas: Rect) {
        let transform = root * node.transform();
        let layered = node.opacity < 1.0;
        if layered {
            self.scene.push_layer(Mix::Normal, node.opacity as f32, root, &canvas);
        }
        for op in &node.ops {
            self.render_op(op, transform);
        }
        if layered {
            self.scene.pop_layer();
        }
    }

    fn render_op(&mut self, op: &PaintOp, transform: Affine) {
        match op {
            PaintOp::FillRect { rect, radius, color } => {
                if *radius > 0.0 {
                    let shape = RoundedRect::from_rect(*rect, *radius);
                    self.scene.fill(Fill::NonZero, transform, *color, None, &shape);
                } else {
                    self.scene.fill(Fill::NonZero, transform, *color, None, rect);
                }
            }
            PaintOp::StrokeRect {
                rect,
                radius,
                width,
                color,
            } => {
                let stroke = Stroke::new(*width);
                if *radius > 0.0 {
                    let shape = RoundedRect::from_rect(*rect, *radius);
                    self.scene.stroke(&stroke, transform, *color, None, &shape);
                } else {
                    self.scene.stroke(&stroke, transform, *color, None, rect);
                }
            }
            PaintOp::Image { resource, rect } => self.render_image(&resource.key, *rect, transform),
            PaintOp::Clip { shape, children } => {
                self.scene.push_layer(Mix::Normal, 1.0, transform, shape);
                for child in children {
                    self.render_op(child, transform);
                }
                self.scene.pop_layer();
            }
            PaintOp::Text(text) => self.render_text(text, transform),
        }
    }

    /// Render a decoded bitmap stretched to `rect`.
    fn render_image(&mut self, key: &str, rect: Rect, transform: Affine) {
        if rect.area() <= 0.0 {
            return;
        }
        let Some(image) = self.images.get(key) else {
            log::warn!("Image {} missing from the store; drawing placeholder", key);
            self.render_image_placeholder(rect, transform);
            return;
        };
        let width = image.resource.width;
        let height = image.resource.height;
        let image_data = peniko::ImageData {
            data: image.pixels.clone(),
            format: peniko::ImageFormat::Rgba8,
            width,
            height,
            alpha_type: peniko::ImageAlphaType::Alpha,
        };

        let scale_x = rect.width() / width as f64;
        let scale_y = rect.height() / height as f64;
        let image_transform =
            transform * Affine::translate((rect.x0, rect.y0)) * Affine::scale_non_uniform(scale_x, scale_y);

        self.scene.draw_image(&image_data.into(), image_transform);
    }

    /// Render a placeholder for images that are not in the store.
    fn render_image_placeholder(&mut self, rect: Rect, transform: Affine) {
        self.scene
            .fill(Fill::NonZero, transform, Color::from_rgba8(200, 200, 200, 255), None, &rect);
        let stroke = Stroke::new(2.0);
        self.scene
            .stroke(&stroke, transform, Color::from_rgba8(100, 100, 100, 255), None, &rect);
    }

    fn render_text(&mut self, text: &TextPaint, transform: Affine) {
        let font = &text.font;
        if text.text.is_empty() || !(font.size.is_finite() && font.size > 0.0) {
            return;
        }
        let ink = text.fill.or(text.stroke.map(|s| s.color)).unwrap_or(Color::BLACK);
        let layout = build_layout(
            &mut self.font_cx,
            &mut self.layout_cx,
            &text.text,
            font,
            Some(text.rect.width()),
            Brush::Solid(ink),
        );
        let lines = place_lines(&layout, text);

        if let Some(shadow) = text.shadow {
            let color = with_opacity(shadow.color, shadow.opacity);
            let offset = transform * Affine::translate(shadow.offset);
            for (width, halo) in blur_halo(shadow.blur, color) {
                let stroke = Stroke::new(width).with_join(Join::Round);
                self.draw_glyphs(&layout, &lines, offset, &Brush::Solid(halo), GlyphStyle::Stroke(&stroke));
            }
            self.draw_glyphs(&layout, &lines, offset, &Brush::Solid(color), GlyphStyle::Fill);
        }

        let mut glyph_count = 0;
        if let Some(fill) = text.fill {
            glyph_count += self.draw_glyphs(&layout, &lines, transform, &Brush::Solid(fill), GlyphStyle::Fill);
        }
        if let Some(params) = text.stroke {
            let stroke = Stroke::new(params.width);
            glyph_count += self.draw_glyphs(
                &layout,
                &lines,
                transform,
                &Brush::Solid(params.color),
                GlyphStyle::Stroke(&stroke),
            );
        }

        // If no glyphs were rendered (font not found), draw a fallback rectangle
        if glyph_count == 0 {
            log::debug!("No glyphs for {:?} in {}; drawing fallback box", text.text, font.family);
            self.scene
                .fill(Fill::NonZero, transform, with_opacity(ink, 0.4), None, &text.rect);
            return;
        }

        let offset = match text.decoration {
            TextDecoration::None => return,
            TextDecoration::Underline => font.size * 0.1,
            TextDecoration::LineThrough => -font.size * 0.3,
        };
        let thickness = (font.size / 15.0).max(1.0);
        for line in &lines {
            let y = line.baseline + offset;
            let bar = Rect::new(line.x, y, line.x + line.width, y + thickness);
            self.scene.fill(Fill::NonZero, transform, ink, None, &bar);
        }
    }

    /// Draw every glyph run of `layout` at the given line placements.
    fn draw_glyphs(
        &mut self,
        layout: &Layout<Brush>,
        lines: &[LinePlacement],
        transform: Affine,
        brush: &Brush,
        style: GlyphStyle,
    ) -> usize {
        let mut glyph_count = 0;
        for (line, place) in layout.lines().zip(lines) {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let run = glyph_run.run();
                let font = run.font();
                let font_size = run.font_size();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = place.x as f32 + x + glyph.x;
                        let gy = place.baseline as f32 - glyph.y;
                        x += glyph.advance;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();
                if glyphs.is_empty() {
                    continue;
                }
                glyph_count += glyphs.len();

                let builder = self
                    .scene
                    .draw_glyphs(font)
                    .brush(brush)
                    .hint(true)
                    .transform(transform)
                    .glyph_transform(glyph_xform)
                    .font_size(font_size)
                    .normalized_coords(run.normalized_coords());
                match style {
                    GlyphStyle::Fill => builder.draw(Fill::NonZero, glyphs.into_iter()),
                    GlyphStyle::Stroke(stroke) => builder.draw(stroke, glyphs.into_iter()),
                }
            }
        }
        glyph_count
    }
}

/// Align each wrapped line inside the text box, spacing baselines by the line advance.
fn place_lines(layout: &Layout<Brush>, text: &TextPaint) -> Vec<LinePlacement> {
    let rect = text.rect;
    let advance = text.font.line_advance();
    let total = layout.lines().count() as f64 * advance;
    let top = match text.vertical_align {
        VerticalAlign::Top => rect.y0,
        VerticalAlign::Middle => rect.y0 + (rect.height() - total) / 2.0,
        VerticalAlign::Bottom => rect.y1 - total,
    };
    layout
        .lines()
        .enumerate()
        .map(|(i, line)| {
            let metrics = line.metrics();
            let width = metrics.advance as f64;
            let x = match text.align {
                TextAlign::Left => rect.x0,
                TextAlign::Center => rect.x0 + (rect.width() - width) / 2.0,
                TextAlign::Right => rect.x1 - width,
            };
            let glyph_height = (metrics.ascent + metrics.descent) as f64;
            let baseline = top + i as f64 * advance + (advance - glyph_height) / 2.0 + metrics.ascent as f64;
            LinePlacement { x, baseline, width }
        })
        .collect()
}

impl Renderer for VelloRenderer {
    fn capabilities(&self) -> SurfaceCapabilities {
        SurfaceCapabilities {
            round_rect: true,
            shadow_blur: false,
        }
    }

    fn build_scene(&mut self, ctx: &FrameContext) {
        // Clear the scene
        self.scene.reset();

        let scale = if ctx.scale_factor.is_finite() && ctx.scale_factor > 0.0 {
            ctx.scale_factor
        } else {
            1.0
        };
        let root = Affine::scale(scale);
        let canvas = Rect::from_origin_size((0.0, 0.0), ctx.tree.size);

        let background = self.background_color(ctx);
        self.scene.fill(Fill::NonZero, root, background, None, &canvas);

        // Draw all nodes in z-order
        for node in &ctx.tree.nodes {
            self.render_node(node, root, canvas);
        }
        log::trace!("Built vello scene with {} nodes", ctx.tree.nodes.len());
    }
}
