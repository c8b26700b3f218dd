//! Immediate-mode command recording for canvas-2D style surfaces.

use crate::renderer::{FrameContext, Renderer, SurfaceCapabilities};
use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Vec2};
use peniko::Color;
use pinsmith_core::color::with_opacity;
use pinsmith_core::geometry::rounded_rect_quad_path;
use pinsmith_core::text::{FontStyle, TextAlign, TextDecoration, VerticalAlign};
use pinsmith_core::{ApproximateMeasurer, FontSpec, PaintNode, PaintOp, TextPaint};

/// One canvas-2D drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Save,
    Restore,
    /// Multiply the current transform.
    Transform(Affine),
    GlobalAlpha(f64),
    ClipRoundRect { rect: Rect, radius: f64 },
    ClipPath(BezPath),
    FillRect { rect: Rect, color: Color },
    FillRoundRect { rect: Rect, radius: f64, color: Color },
    FillPath { path: BezPath, color: Color },
    StrokeRect { rect: Rect, width: f64, color: Color },
    StrokeRoundRect { rect: Rect, radius: f64, width: f64, color: Color },
    StrokePath { path: BezPath, width: f64, color: Color },
    Shadow { color: Color, blur: f64, offset: Vec2 },
    ClearShadow,
    /// `origin` is the top of the line box at the alignment anchor.
    FillText {
        text: String,
        origin: Point,
        align: TextAlign,
        font: String,
        color: Color,
    },
    StrokeText {
        text: String,
        origin: Point,
        align: TextAlign,
        font: String,
        width: f64,
        color: Color,
    },
    /// Draw the bitmap registered under `key`, stretched to `rect`.
    DrawImage { key: String, rect: Rect },
}

/// CSS font shorthand, e.g. `italic 700 32px "Inter"`.
pub fn css_font(font: &FontSpec) -> String {
    let style = match font.style {
        FontStyle::Italic => "italic ",
        FontStyle::Normal => "",
    };
    format!("{}{} {}px \"{}\"", style, font.weight.0, font.size, font.family)
}

/// Flattens paint trees into [`DrawCommand`]s.
///
/// Text is wrapped with an [`ApproximateMeasurer`]; hand the same measurer
/// to the element renderer so auto-fit and painting agree.
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    capabilities: SurfaceCapabilities,
    measurer: ApproximateMeasurer,
    commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a surface with the given primitives.
    pub fn with_capabilities(mut self, capabilities: SurfaceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_measurer(mut self, measurer: ApproximateMeasurer) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn measurer(&self) -> &ApproximateMeasurer {
        &self.measurer
    }

    /// Commands of the last built frame.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    fn record_node(&mut self, node: &PaintNode) {
        self.commands.push(DrawCommand::Save);
        self.commands.push(DrawCommand::Transform(node.transform()));
        if node.opacity < 1.0 {
            self.commands.push(DrawCommand::GlobalAlpha(node.opacity));
        }
        for op in &node.ops {
            self.record_op(op);
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn record_op(&mut self, op: &PaintOp) {
        match op {
            PaintOp::FillRect { rect, radius, color } => self.fill_rect(*rect, *radius, *color),
            PaintOp::StrokeRect {
                rect,
                radius,
                width,
                color,
            } => self.stroke_rect(*rect, *radius, *width, *color),
            PaintOp::Image { resource, rect } => self.commands.push(DrawCommand::DrawImage {
                key: resource.key.clone(),
                rect: *rect,
            }),
            PaintOp::Clip { shape, children } => {
                self.commands.push(DrawCommand::Save);
                self.clip(shape);
                for child in children {
                    self.record_op(child);
                }
                self.commands.push(DrawCommand::Restore);
            }
            PaintOp::Text(text) => self.record_text(text),
        }
    }

    fn fill_rect(&mut self, rect: Rect, radius: f64, color: Color) {
        let command = if radius <= 0.0 {
            DrawCommand::FillRect { rect, color }
        } else if self.capabilities.round_rect {
            DrawCommand::FillRoundRect { rect, radius, color }
        } else {
            DrawCommand::FillPath {
                path: rounded_rect_quad_path(rect, radius),
                color,
            }
        };
        self.commands.push(command);
    }

    fn stroke_rect(&mut self, rect: Rect, radius: f64, width: f64, color: Color) {
        let command = if radius <= 0.0 {
            DrawCommand::StrokeRect { rect, width, color }
        } else if self.capabilities.round_rect {
            DrawCommand::StrokeRoundRect {
                rect,
                radius,
                width,
                color,
            }
        } else {
            DrawCommand::StrokePath {
                path: rounded_rect_quad_path(rect, radius),
                width,
                color,
            }
        };
        self.commands.push(command);
    }

    fn clip(&mut self, shape: &RoundedRect) {
        let rect = shape.rect();
        let radius = shape.radii().top_left;
        let command = if self.capabilities.round_rect {
            DrawCommand::ClipRoundRect { rect, radius }
        } else {
            DrawCommand::ClipPath(rounded_rect_quad_path(rect, radius))
        };
        self.commands.push(command);
    }

    fn record_text(&mut self, text: &TextPaint) {
        let font = &text.font;
        if !(font.size.is_finite() && font.size > 0.0) {
            return;
        }
        let rect = text.rect;
        let lines = self.measurer.wrap_lines(&text.text, rect.width(), font);
        let advance = font.line_advance();
        let total = lines.len() as f64 * advance;
        let top = match text.vertical_align {
            VerticalAlign::Top => rect.y0,
            VerticalAlign::Middle => rect.y0 + (rect.height() - total) / 2.0,
            VerticalAlign::Bottom => rect.y1 - total,
        };
        let anchor_x = match text.align {
            TextAlign::Left => rect.x0,
            TextAlign::Center => rect.center().x,
            TextAlign::Right => rect.x1,
        };
        let css = css_font(font);

        if let Some(shadow) = text.shadow {
            let blur = if self.capabilities.shadow_blur { shadow.blur } else { 0.0 };
            self.commands.push(DrawCommand::Shadow {
                color: with_opacity(shadow.color, shadow.opacity),
                blur,
                offset: shadow.offset,
            });
        }

        for (i, line) in lines.iter().enumerate() {
            // Glyphs sit centered in their line box.
            let y = top + i as f64 * advance + (advance - font.size) / 2.0;
            let origin = Point::new(anchor_x, y);
            if let Some(color) = text.fill {
                self.commands.push(DrawCommand::FillText {
                    text: line.clone(),
                    origin,
                    align: text.align,
                    font: css.clone(),
                    color,
                });
            }
            if let Some(stroke) = text.stroke {
                self.commands.push(DrawCommand::StrokeText {
                    text: line.clone(),
                    origin,
                    align: text.align,
                    font: css.clone(),
                    width: stroke.width,
                    color: stroke.color,
                });
            }
        }

        if text.shadow.is_some() {
            self.commands.push(DrawCommand::ClearShadow);
        }

        let offset = match text.decoration {
            TextDecoration::None => return,
            TextDecoration::Underline => font.size * 0.9,
            TextDecoration::LineThrough => font.size * 0.55,
        };
        let Some(color) = text.fill.or(text.stroke.map(|s| s.color)) else {
            return;
        };
        let thickness = (font.size / 15.0).max(1.0);
        for (i, line) in lines.iter().enumerate() {
            let width = self.measurer.text_width(line, font);
            let x0 = match text.align {
                TextAlign::Left => anchor_x,
                TextAlign::Center => anchor_x - width / 2.0,
                TextAlign::Right => anchor_x - width,
            };
            let y = top + i as f64 * advance + (advance - font.size) / 2.0 + offset;
            self.commands.push(DrawCommand::FillRect {
                rect: Rect::new(x0, y, x0 + width, y + thickness),
                color,
            });
        }
    }
}

impl Renderer for CommandRecorder {
    fn capabilities(&self) -> SurfaceCapabilities {
        self.capabilities
    }

    fn build_scene(&mut self, ctx: &FrameContext) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(self.background_color(ctx)));

        let scale = ctx.scale_factor;
        let scaled = scale.is_finite() && scale > 0.0 && scale != 1.0;
        if scaled {
            self.commands.push(DrawCommand::Save);
            self.commands.push(DrawCommand::Transform(Affine::scale(scale)));
        }
        for node in &ctx.tree.nodes {
            self.record_node(node);
        }
        if scaled {
            self.commands.push(DrawCommand::Restore);
        }
        log::trace!("Recorded {} draw commands", self.commands.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{PathEl, Size};
    use pinsmith_core::effects::{ShadowParams, StrokeParams};
    use pinsmith_core::text::FontWeight;
    use pinsmith_core::{
        Element, ElementId, ElementKind, ElementRenderer, ImageSlot, Interactivity, PaintTree, RenderContext, Scene,
        ShapeElement,
    };

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tree_of(nodes: Vec<PaintNode>) -> PaintTree {
        PaintTree {
            size: Size::new(1000.0, 1500.0),
            background: None,
            nodes,
        }
    }

    fn node_with(ops: Vec<PaintOp>, opacity: f64) -> PaintNode {
        PaintNode {
            element_id: ElementId::from("n"),
            kind: ElementKind::Shape,
            origin: Point::new(10.0, 20.0),
            rotation: 0.0,
            opacity,
            interactivity: Interactivity::FULL,
            ops,
        }
    }

    fn text_paint(text: &str, align: TextAlign, vertical_align: VerticalAlign) -> TextPaint {
        TextPaint {
            text: text.to_string(),
            rect: Rect::new(0.0, 0.0, 120.0, 100.0),
            font: FontSpec {
                family: "Inter".to_string(),
                size: 20.0,
                weight: FontWeight::NORMAL,
                style: FontStyle::Normal,
                letter_spacing: 0.0,
                line_height: 1.0,
            },
            align,
            vertical_align,
            decoration: TextDecoration::None,
            fill: Some(Color::BLACK),
            stroke: None,
            shadow: None,
        }
    }

    fn record(recorder: &mut CommandRecorder, tree: &PaintTree) -> Vec<DrawCommand> {
        recorder.build_scene(&FrameContext::new(tree));
        recorder.take_commands()
    }

    #[test]
    fn test_node_is_wrapped_in_save_restore() {
        init_logger();
        let tree = tree_of(vec![node_with(
            vec![PaintOp::FillRect {
                rect: Rect::new(0.0, 0.0, 5.0, 5.0),
                radius: 0.0,
                color: Color::WHITE,
            }],
            0.5,
        )]);
        let commands = record(&mut CommandRecorder::new(), &tree);
        assert_eq!(commands[0], DrawCommand::Clear(Color::WHITE));
        assert_eq!(commands[1], DrawCommand::Save);
        assert_eq!(commands[2], DrawCommand::Transform(Affine::translate((10.0, 20.0))));
        assert_eq!(commands[3], DrawCommand::GlobalAlpha(0.5));
        assert!(matches!(commands[4], DrawCommand::FillRect { .. }));
        assert_eq!(commands[5], DrawCommand::Restore);
    }

    #[test]
    fn test_round_rect_fallback_uses_quadratic_path() {
        let ops = vec![PaintOp::FillRect {
            rect: Rect::new(0.0, 0.0, 100.0, 50.0),
            radius: 8.0,
            color: Color::BLACK,
        }];
        let tree = tree_of(vec![node_with(ops, 1.0)]);

        let native = record(&mut CommandRecorder::new(), &tree);
        assert!(native.iter().any(|c| matches!(c, DrawCommand::FillRoundRect { radius, .. } if *radius == 8.0)));

        let mut fallback = CommandRecorder::new().with_capabilities(SurfaceCapabilities {
            round_rect: false,
            shadow_blur: true,
        });
        let commands = record(&mut fallback, &tree);
        let path = commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::FillPath { path, .. } => Some(path),
                _ => None,
            })
            .expect("fallback path");
        let quads = path.elements().iter().filter(|el| matches!(el, PathEl::QuadTo(..))).count();
        assert_eq!(quads, 4);
    }

    #[test]
    fn test_text_wraps_and_centers_vertically() {
        let tree = tree_of(vec![node_with(
            vec![PaintOp::Text(text_paint("aaaa bbbb cc", TextAlign::Left, VerticalAlign::Middle))],
            1.0,
        )]);
        let commands = record(&mut CommandRecorder::new(), &tree);
        let lines: Vec<(&str, Point)> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, origin, .. } => Some((text.as_str(), *origin)),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, "aaaa bbbb");
        assert_eq!(lines[1].0, "cc");
        // Two 20px lines centered in a 100px box.
        assert!((lines[0].1.y - 30.0).abs() < 1e-9);
        assert!((lines[1].1.y - 50.0).abs() < 1e-9);
        assert!((lines[0].1.x - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_effects_emit_shadow_and_stroke() {
        let mut paint = text_paint("Hi", TextAlign::Center, VerticalAlign::Top);
        paint.fill = None;
        paint.stroke = Some(StrokeParams {
            width: 2.0,
            color: Color::BLACK,
        });
        paint.shadow = Some(ShadowParams {
            color: Color::from_rgba8(255, 0, 0, 255),
            blur: 0.0,
            offset: Vec2::new(5.0, 5.0),
            opacity: 1.0,
        });
        paint.decoration = TextDecoration::Underline;
        let tree = tree_of(vec![node_with(vec![PaintOp::Text(paint)], 1.0)]);
        let commands = record(&mut CommandRecorder::new(), &tree);

        assert!(!commands.iter().any(|c| matches!(c, DrawCommand::FillText { .. })));
        let shadow = commands.iter().position(|c| matches!(c, DrawCommand::Shadow { .. })).unwrap();
        let stroke = commands.iter().position(|c| matches!(c, DrawCommand::StrokeText { .. })).unwrap();
        let clear = commands.iter().position(|c| matches!(c, DrawCommand::ClearShadow)).unwrap();
        assert!(shadow < stroke && stroke < clear);
        // Underline follows the stroke color for hollow text.
        assert!(commands[clear + 1..].iter().any(|c| matches!(c, DrawCommand::FillRect { .. })));
    }

    #[test]
    fn test_css_font() {
        let mut font = text_paint("x", TextAlign::Left, VerticalAlign::Top).font;
        font.style = FontStyle::Italic;
        font.weight = FontWeight::BOLD;
        assert_eq!(css_font(&font), "italic 700 20px \"Inter\"");
    }

    #[test]
    fn test_scene_end_to_end() {
        init_logger();
        let mut scene = Scene::default().with_background("#fafafa");
        scene.push(ImageSlot::new("hero", 0.0, 0.0, 0.0, 0.0));
        scene.push(ShapeElement::new("band", 0.0, 900.0, 1000.0, 100.0).with_fill("#222"));

        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let tree = ElementRenderer::default().render_scene(&scene, &ctx);

        let mut recorder = CommandRecorder::new().with_measurer(measurer);
        recorder.build_scene(&FrameContext::new(&tree).with_scale_factor(2.0));
        let commands = recorder.commands();

        let rgba = match &commands[0] {
            DrawCommand::Clear(color) => color.to_rgba8(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!((rgba.r, rgba.g, rgba.b), (0xfa, 0xfa, 0xfa));
        assert_eq!(commands[2], DrawCommand::Transform(Affine::scale(2.0)));
        assert!(commands.iter().any(|c| matches!(c, DrawCommand::FillText { text, .. } if text == "IMG")));
        assert!(matches!(scene.elements[0], Element::ImageSlot(_)));
    }
}
