//! Element renderer: turns scene elements into a [`PaintTree`].

use crate::color::{parse_color, parse_color_or};
use crate::config::RenderConfig;
use crate::effects::{EffectColors, EffectDescriptor, resolve_effect_with};
use crate::element::{
    Element, ElementId, ImageSlot, LogoElement, OverlayElement, ShapeElement, TextElement,
};
use crate::geometry::{apply_zoom_pan, clamp_pan, clamp_radius, fit_image_to_slot, rounded_rect_clip};
use crate::paint::{ImageResource, Interactivity, PaintNode, PaintOp, PaintTree, TextPaint};
use crate::scene::Scene;
use crate::text::{
    FontSizeCache, FontSpec, FontStyle, FontWeight, NoVariables, TextAlign, TextDecoration, TextMeasurer,
    VariableResolver, VerticalAlign,
};
use kurbo::{Rect, Size, Vec2};
use peniko::Color;
use std::collections::HashMap;

/// Border width of placeholder boxes.
const PLACEHOLDER_BORDER_WIDTH: f64 = 2.0;

/// Per-frame inputs owned by the host editor.
pub struct RenderContext<'a> {
    /// User zoom per image slot (default 1).
    pub image_scales: HashMap<ElementId, f64>,
    /// User pan per image slot (default zero).
    pub image_offsets: HashMap<ElementId, Vec2>,
    /// Decoded bitmaps keyed by element image source. Absent means not (yet) loaded.
    pub images: HashMap<String, ImageResource>,
    /// Expands `{{variable}}` tokens.
    pub variables: &'a dyn VariableResolver,
    /// Wrapped-text measurement of the drawing surface.
    pub measurer: &'a dyn TextMeasurer,
    /// Slot whose inner image is being repositioned, if any.
    pub image_drag_target: Option<ElementId>,
}

impl<'a> RenderContext<'a> {
    /// Create a context with no overrides, no images and no variables.
    pub fn new(measurer: &'a dyn TextMeasurer) -> Self {
        Self {
            image_scales: HashMap::new(),
            image_offsets: HashMap::new(),
            images: HashMap::new(),
            variables: &NoVariables,
            measurer,
            image_drag_target: None,
        }
    }

    pub fn with_variables(mut self, variables: &'a dyn VariableResolver) -> Self {
        self.variables = variables;
        self
    }

    /// Register a decoded bitmap under its key.
    pub fn with_image(mut self, resource: ImageResource) -> Self {
        self.images.insert(resource.key.clone(), resource);
        self
    }

    pub fn with_image_scale(mut self, id: impl Into<ElementId>, scale: f64) -> Self {
        self.image_scales.insert(id.into(), scale);
        self
    }

    pub fn with_image_offset(mut self, id: impl Into<ElementId>, offset: Vec2) -> Self {
        self.image_offsets.insert(id.into(), offset);
        self
    }

    /// Enable image-within-slot drag mode for a slot.
    pub fn with_image_drag_target(mut self, id: Option<ElementId>) -> Self {
        self.image_drag_target = id;
        self
    }

    pub fn image_scale(&self, id: &ElementId) -> f64 {
        self.image_scales.get(id).copied().unwrap_or(1.0)
    }

    pub fn image_offset(&self, id: &ElementId) -> Vec2 {
        self.image_offsets.get(id).copied().unwrap_or(Vec2::ZERO)
    }

    /// Resolved bitmap for an optional image source. A zero-sized bitmap counts as absent.
    pub fn image(&self, source: Option<&str>) -> Option<&ImageResource> {
        source
            .and_then(|key| self.images.get(key))
            .filter(|resource| !resource.is_empty())
    }

    /// Whether `slot` is in image-within-slot drag mode with a loaded image.
    pub fn is_image_drag(&self, slot: &ImageSlot) -> bool {
        self.image_drag_target.as_ref() == Some(&slot.base.id) && self.image(slot.image.as_deref()).is_some()
    }
}

/// Lays out and paints scene elements.
///
/// Rendering is deterministic; the only state is a memo of auto-fit results.
pub struct ElementRenderer {
    config: RenderConfig,
    effect_colors: EffectColors,
    font_cache: FontSizeCache,
}

impl Default for ElementRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl ElementRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let effect_colors = config.effect_colors();
        let font_cache = FontSizeCache::new(config.font_cache_capacity);
        Self {
            config,
            effect_colors,
            font_cache,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn font_cache(&self) -> &FontSizeCache {
        &self.font_cache
    }

    /// Paint every element in array order.
    pub fn render_scene(&mut self, scene: &Scene, ctx: &RenderContext) -> PaintTree {
        let size = scene.size();
        let background = scene.background.as_deref().and_then(|bg| match parse_color(bg) {
            Ok(color) => Some(color),
            Err(e) => {
                log::warn!("Ignoring scene background: {}", e);
                None
            }
        });
        let nodes: Vec<PaintNode> = scene
            .elements
            .iter()
            .map(|element| self.render_element(element, size, ctx))
            .collect();
        log::debug!("Rendered {} elements (font cache hits: {})", nodes.len(), self.font_cache.hits());
        PaintTree {
            size,
            background,
            nodes,
        }
    }

    /// Paint one element on a canvas of `canvas` size.
    pub fn render_element(&mut self, element: &Element, canvas: Size, ctx: &RenderContext) -> PaintNode {
        let base = element.base();
        let frame = element.frame(canvas);
        let local = Rect::from_origin_size((0.0, 0.0), frame.size());

        let ops = match element {
            Element::ImageSlot(slot) => self.paint_image_slot(slot, local, ctx),
            Element::Text(text) => self.paint_text(text, local, ctx),
            Element::Shape(shape) => self.paint_shape(shape, local),
            Element::Logo(logo) => self.paint_logo(logo, local, ctx),
            Element::Overlay(overlay) => self.paint_overlay(overlay, local),
        };

        let interactivity = if element.is_locked() {
            Interactivity::NONE
        } else {
            match element {
                Element::ImageSlot(slot) if ctx.is_image_drag(slot) => Interactivity::IMAGE_PAN,
                _ => Interactivity::FULL,
            }
        };

        log::trace!("{} {}: {:?}, {} ops", element.kind().tag(), base.id, frame, ops.len());
        PaintNode {
            element_id: base.id.clone(),
            kind: element.kind(),
            origin: frame.origin(),
            rotation: base.rotation(),
            opacity: base.opacity(),
            interactivity,
            ops,
        }
    }

    /// Text as displayed: variables substituted, then case-transformed.
    pub fn display_text(&self, text: &TextElement, ctx: &RenderContext) -> String {
        text.text_transform.apply(&ctx.variables.substitute(&text.content))
    }

    /// Font size the text is painted at, after auto-fit.
    pub fn font_size(&mut self, text: &TextElement, display: &str, box_size: Size, ctx: &RenderContext) -> f64 {
        let base = if text.font_size.is_finite() && text.font_size > 0.0 {
            text.font_size
        } else {
            TextElement::DEFAULT_FONT_SIZE
        };
        // Without a height there is no box to fit into.
        if text.base.height.is_none() || !text.auto_fit_mode().is_enabled(&text.content) {
            return base;
        }
        self.font_cache.fit(
            ctx.measurer,
            display,
            box_size,
            &text.font_spec(base),
            self.config.min_font_size,
        )
    }

    fn paint_image_slot(&self, slot: &ImageSlot, local: Rect, ctx: &RenderContext) -> Vec<PaintOp> {
        let size = local.size();
        let clip = rounded_rect_clip(size.width, size.height, slot.border_radius);

        if let Some(resource) = ctx.image(slot.image.as_deref()) {
            let id = &slot.base.id;
            let zoom = ctx.image_scale(id);
            let fit = fit_image_to_slot(Some(resource.size()), size);
            let pan = clamp_pan(&fit, zoom, ctx.image_offset(id), size);
            let placement = apply_zoom_pan(&fit, zoom, pan);
            return vec![PaintOp::Clip {
                shape: clip,
                children: vec![PaintOp::Image {
                    resource: resource.clone(),
                    rect: placement.rect(),
                }],
            }];
        }

        if slot.image.is_some() {
            log::trace!("Image for slot {} not loaded; painting placeholder", slot.base.id);
        }
        let caption = slot.name.as_deref().unwrap_or(&self.config.placeholder_caption);
        self.placeholder(
            local,
            slot.border_radius,
            &self.config.placeholder_fill,
            &self.config.placeholder_label,
            Some(caption),
        )
    }

    fn paint_text(&mut self, text: &TextElement, local: Rect, ctx: &RenderContext) -> Vec<PaintOp> {
        let display = self.display_text(text, ctx);
        let box_size = local.size();
        let size = self.font_size(text, &display, box_size, ctx);
        let font = text.font_spec(size);

        let rect = if text.base.height.is_some() {
            local
        } else {
            let height = match ctx.measurer.measure_height(&display, box_size.width, &font) {
                Ok(h) if h.is_finite() && h >= 0.0 => h,
                Ok(h) => {
                    log::warn!("Invalid measured height {} for {}", h, text.base.id);
                    font.line_advance()
                }
                Err(e) => {
                    log::warn!("Measuring {} failed: {}", text.base.id, e);
                    font.line_advance()
                }
            };
            Rect::new(0.0, 0.0, box_size.width, height)
        };

        let fallback = self.config.text_color();
        let color = text
            .color
            .as_deref()
            .map(|c| parse_color_or(c, fallback))
            .unwrap_or(fallback);
        let params = match &text.effect {
            Some(effect) => resolve_effect_with(effect, color, &self.effect_colors),
            None => resolve_effect_with(&EffectDescriptor::default(), color, &self.effect_colors),
        };

        vec![PaintOp::Text(TextPaint {
            text: display,
            rect,
            font,
            align: text.text_align,
            vertical_align: text.vertical_align,
            decoration: text.text_decoration,
            fill: params.fill_enabled.then_some(color),
            stroke: params.stroke,
            shadow: params.shadow,
        })]
    }

    fn paint_shape(&self, shape: &ShapeElement, local: Rect) -> Vec<PaintOp> {
        let color = self.fill_color(shape.fill.as_deref(), &self.config.default_shape_fill);
        vec![PaintOp::FillRect {
            rect: local,
            radius: clamp_radius(local.width(), local.height(), shape.border_radius),
            color,
        }]
    }

    fn paint_logo(&self, logo: &LogoElement, local: Rect, ctx: &RenderContext) -> Vec<PaintOp> {
        match ctx.image(logo.image.as_deref()) {
            // Stretched to the declared size.
            Some(resource) => vec![PaintOp::Image {
                resource: resource.clone(),
                rect: local,
            }],
            None => self.placeholder(
                local,
                0.0,
                &self.config.logo_placeholder_fill,
                &self.config.logo_placeholder_label,
                None,
            ),
        }
    }

    fn paint_overlay(&self, overlay: &OverlayElement, local: Rect) -> Vec<PaintOp> {
        let color = self.fill_color(overlay.fill.as_deref(), &self.config.default_overlay_fill);
        vec![PaintOp::FillRect {
            rect: local,
            radius: 0.0,
            color,
        }]
    }

    fn fill_color(&self, fill: Option<&str>, default: &str) -> Color {
        let default = parse_color_or(default, Color::TRANSPARENT);
        fill.map(|f| parse_color_or(f, default)).unwrap_or(default)
    }

    /// Box with border, a centered label and an optional caption below center.
    fn placeholder(
        &self,
        local: Rect,
        radius: f64,
        fill: &str,
        label: &str,
        caption: Option<&str>,
    ) -> Vec<PaintOp> {
        let (width, height) = (local.width(), local.height());
        let radius = clamp_radius(width, height, radius);
        let ink = parse_color_or(&self.config.placeholder_text, Color::BLACK);
        let label_size = (width.min(height) / 5.0).max(12.0);
        let caption_size = (width.min(height) / 14.0).max(10.0);

        let font = |size: f64, weight: FontWeight| FontSpec {
            family: self.config.placeholder_font_family.clone(),
            size,
            weight,
            style: FontStyle::Normal,
            letter_spacing: 0.0,
            line_height: 1.0,
        };
        let text = |text: &str, rect: Rect, font: FontSpec, vertical_align: VerticalAlign| {
            PaintOp::Text(TextPaint {
                text: text.to_string(),
                rect,
                font,
                align: TextAlign::Center,
                vertical_align,
                decoration: TextDecoration::None,
                fill: Some(ink),
                stroke: None,
                shadow: None,
            })
        };

        let mut ops = vec![
            PaintOp::FillRect {
                rect: local,
                radius,
                color: parse_color_or(fill, Color::TRANSPARENT),
            },
            PaintOp::StrokeRect {
                rect: local,
                radius,
                width: PLACEHOLDER_BORDER_WIDTH,
                color: parse_color_or(&self.config.placeholder_border, Color::BLACK),
            },
            text(label, local, font(label_size, FontWeight::BOLD), VerticalAlign::Middle),
        ];
        if let Some(caption) = caption {
            let top = height / 2.0 + label_size * 0.6;
            let rect = Rect::new(0.0, top, width, top + caption_size * 1.2);
            ops.push(text(caption, rect, font(caption_size, FontWeight::NORMAL), VerticalAlign::Top));
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectKind;
    use crate::element::ElementKind;
    use crate::text::{ApproximateMeasurer, TextTransform};
    use kurbo::Point;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn image_rect(node: &PaintNode) -> Rect {
        node.flatten()
            .into_iter()
            .find_map(|op| match op {
                PaintOp::Image { rect, .. } => Some(*rect),
                _ => None,
            })
            .expect("image op")
    }

    #[test]
    fn test_image_slot_cover_fit() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer).with_image(ImageResource::new("photo.jpg", 1600, 900));
        let slot = Element::ImageSlot(ImageSlot::new("hero", 50.0, 60.0, 400.0, 400.0).with_image("photo.jpg"));

        let mut renderer = ElementRenderer::default();
        let node = renderer.render_element(&slot, Size::new(1000.0, 1500.0), &ctx);
        assert_eq!(node.origin, Point::new(50.0, 60.0));
        assert!(matches!(node.ops[0], PaintOp::Clip { .. }));
        let rect = image_rect(&node);
        assert!((rect.x0 - (400.0 - 1600.0 * 400.0 / 900.0) / 2.0).abs() < 1e-9);
        assert!(approx(rect.y0, 0.0));
        assert!(approx(rect.height(), 400.0));
    }

    #[test]
    fn test_image_slot_clamps_stored_offset() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer)
            .with_image(ImageResource::new("photo.jpg", 1600, 900))
            .with_image_offset("hero", Vec2::new(1000.0, -50.0));
        let slot = Element::ImageSlot(ImageSlot::new("hero", 0.0, 0.0, 400.0, 400.0).with_image("photo.jpg"));

        let node = ElementRenderer::default().render_element(&slot, Size::new(1000.0, 1500.0), &ctx);
        let rect = image_rect(&node);
        assert!(approx(rect.x0, 0.0));
        assert!(approx(rect.y0, 0.0));
    }

    #[test]
    fn test_image_slot_zoom_keeps_center() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer)
            .with_image(ImageResource::new("square.png", 100, 100))
            .with_image_scale("hero", 2.0);
        let slot = Element::ImageSlot(ImageSlot::new("hero", 0.0, 0.0, 200.0, 200.0).with_image("square.png"));

        let node = ElementRenderer::default().render_element(&slot, Size::new(1000.0, 1500.0), &ctx);
        let rect = image_rect(&node);
        assert_eq!(rect, Rect::new(-100.0, -100.0, 300.0, 300.0));
    }

    #[test]
    fn test_unloaded_image_paints_placeholder() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let slot = Element::ImageSlot(
            ImageSlot::new("hero", 0.0, 0.0, 300.0, 200.0)
                .with_image("pending.jpg")
                .with_name("Hero shot"),
        );

        let node = ElementRenderer::default().render_element(&slot, Size::new(1000.0, 1500.0), &ctx);
        let texts: Vec<&str> = node.texts().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["IMG", "Hero shot"]);
        assert!(node.flatten().iter().all(|op| !matches!(op, PaintOp::Image { .. })));
    }

    #[test]
    fn test_zero_sized_image_paints_placeholder() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer)
            .with_image(ImageResource::new("broken.png", 0, 0))
            .with_image(ImageResource::new("strip.png", 640, 0))
            .with_image_drag_target(Some(ElementId::from("hero")));
        let mut renderer = ElementRenderer::default();

        for source in ["broken.png", "strip.png"] {
            let slot = Element::ImageSlot(ImageSlot::new("hero", 0.0, 0.0, 300.0, 200.0).with_image(source));
            let node = renderer.render_element(&slot, Size::new(1000.0, 1500.0), &ctx);
            assert!(node.flatten().iter().all(|op| !matches!(op, PaintOp::Image { .. })));
            assert_eq!(node.texts().next().unwrap().text, "IMG");
            assert_eq!(node.interactivity, Interactivity::FULL);
        }

        let logo = Element::Logo(LogoElement::new("logo", 0.0, 0.0, 100.0, 50.0).with_image("broken.png"));
        let node = renderer.render_element(&logo, Size::new(1000.0, 1500.0), &ctx);
        assert_eq!(node.texts().next().unwrap().text, "LOGO");
    }

    #[test]
    fn test_text_substitution_and_transform() {
        let measurer = ApproximateMeasurer::default();
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), "easy pasta".to_string());
        let ctx = RenderContext::new(&measurer).with_variables(&vars);
        let text = Element::Text(
            TextElement::new("t", "{{title}} night", 0.0, 0.0, 800.0, 400.0)
                .with_text_transform(TextTransform::Uppercase)
                .with_color("#112233"),
        );

        let node = ElementRenderer::default().render_element(&text, Size::new(1000.0, 1500.0), &ctx);
        let paint = node.texts().next().unwrap();
        assert_eq!(paint.text, "EASY PASTA NIGHT");
        assert!(approx(paint.font.size, 32.0));
        let fill = paint.fill.unwrap().to_rgba8();
        assert_eq!((fill.r, fill.g, fill.b), (0x11, 0x22, 0x33));
    }

    #[test]
    fn test_variable_text_autofits() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let long = "{{title}} ".repeat(40);
        let element = TextElement::new("t", long, 0.0, 0.0, 300.0, 100.0).with_font_size(72.0);
        let mut renderer = ElementRenderer::default();

        let size = renderer.font_size(&element, &element.content, Size::new(300.0, 100.0), &ctx);
        assert!(size < 72.0 && size >= 10.0);
        assert!(approx(size, size.round()));

        // Same inputs again hit the cache.
        let again = renderer.font_size(&element, &element.content, Size::new(300.0, 100.0), &ctx);
        assert!(approx(size, again));
        assert_eq!(renderer.font_cache().hits(), 1);
    }

    #[test]
    fn test_static_text_does_not_autofit() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let element = TextElement::new("t", "word ".repeat(200), 0.0, 0.0, 100.0, 20.0).with_font_size(40.0);
        let size = ElementRenderer::default().font_size(&element, &element.content, Size::new(100.0, 20.0), &ctx);
        assert!(approx(size, 40.0));
    }

    #[test]
    fn test_hollow_effect_disables_fill() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let mut effect = EffectDescriptor::new(EffectKind::Hollow);
        effect.thickness = Some(50.0);
        let text = Element::Text(TextElement::new("t", "Hi", 0.0, 0.0, 200.0, 50.0).with_effect(effect));

        let node = ElementRenderer::default().render_element(&text, Size::new(1000.0, 1500.0), &ctx);
        let paint = node.texts().next().unwrap();
        assert!(paint.fill.is_none());
        assert!(approx(paint.stroke.unwrap().width, 2.0));
    }

    #[test]
    fn test_text_without_height_is_measured() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let mut element = TextElement::new("t", "{{a}}", 0.0, 0.0, 500.0, 0.0);
        element.base.height = None;
        let node = ElementRenderer::default().render_element(&Element::Text(element), Size::new(1000.0, 1500.0), &ctx);
        let paint = node.texts().next().unwrap();
        assert!(approx(paint.font.size, 32.0));
        assert!(approx(paint.rect.height(), 32.0 * 1.2));
    }

    #[test]
    fn test_logo_stretches_and_falls_back() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer).with_image(ImageResource::new("logo.png", 512, 128));
        let mut renderer = ElementRenderer::default();

        let logo = Element::Logo(LogoElement::new("logo", 10.0, 10.0, 100.0, 100.0).with_image("logo.png"));
        let node = renderer.render_element(&logo, Size::new(1000.0, 1500.0), &ctx);
        assert_eq!(image_rect(&node), Rect::new(0.0, 0.0, 100.0, 100.0));

        let missing = Element::Logo(LogoElement::new("logo", 10.0, 10.0, 100.0, 100.0));
        let node = renderer.render_element(&missing, Size::new(1000.0, 1500.0), &ctx);
        assert_eq!(node.texts().next().unwrap().text, "LOGO");
    }

    #[test]
    fn test_overlay_covers_canvas() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let overlay = Element::Overlay(OverlayElement::new("wash").with_fill("rgba(0,0,0,0.4)"));
        let node = ElementRenderer::default().render_element(&overlay, Size::new(1000.0, 1500.0), &ctx);
        assert_eq!(node.kind, ElementKind::Overlay);
        match &node.ops[0] {
            PaintOp::FillRect { rect, .. } => assert_eq!(*rect, Rect::new(0.0, 0.0, 1000.0, 1500.0)),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_rotation_and_opacity_stay_on_node() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer);
        let mut shape = ShapeElement::new("s", 20.0, 30.0, 100.0, 50.0).with_fill("red");
        shape.base.rotation = 30.0;
        shape.base.opacity = 0.5;
        let node = ElementRenderer::default().render_element(&Element::Shape(shape), Size::new(1000.0, 1500.0), &ctx);
        assert!(approx(node.rotation, 30.0));
        assert!(approx(node.opacity, 0.5));
        match &node.ops[0] {
            PaintOp::FillRect { rect, .. } => assert_eq!(*rect, Rect::new(0.0, 0.0, 100.0, 50.0)),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_image_drag_mode_interactivity() {
        let measurer = ApproximateMeasurer::default();
        let ctx = RenderContext::new(&measurer)
            .with_image(ImageResource::new("photo.jpg", 800, 600))
            .with_image_drag_target(Some(ElementId::from("hero")));
        let mut renderer = ElementRenderer::default();

        let slot = Element::ImageSlot(ImageSlot::new("hero", 0.0, 0.0, 200.0, 200.0).with_image("photo.jpg"));
        assert_eq!(renderer.render_element(&slot, Size::new(1000.0, 1500.0), &ctx).interactivity, Interactivity::IMAGE_PAN);

        let other = Element::ImageSlot(ImageSlot::new("other", 0.0, 0.0, 200.0, 200.0).with_image("photo.jpg"));
        assert_eq!(renderer.render_element(&other, Size::new(1000.0, 1500.0), &ctx).interactivity, Interactivity::FULL);
    }
}
