//! Pointer gestures on rendered elements and the host callback contract.
//!
//! The controller never mutates the scene. It reports intent through an
//! [`InteractionHandler`]; the host editor decides what to commit.

use crate::element::{Element, ElementId, TextElement};
use crate::geometry::{
    CoverFit, apply_zoom_pan, clamp_image_position, element_transform, finite_or, fit_image_to_slot, to_local,
    zoomed_origin,
};
use crate::renderer::RenderContext;
use kurbo::{Point, Size, Vec2};

/// A pointer event targeted at one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Click,
    Tap,
    DoubleClick,
    DoubleTap,
    /// `position` is the dragged node's proposed top-left in canvas units.
    DragStart { position: Point },
    DragMove { position: Point },
    DragEnd { position: Point },
    /// Gesture aborted (e.g. pointer left the canvas).
    DragCancel,
    TransformStart,
    /// Resize/rotate handle released with the node's visual transform.
    TransformEnd {
        x: f64,
        y: f64,
        scale_x: f64,
        scale_y: f64,
        rotation: f64,
    },
}

/// Element geometry reported to callbacks. Fields not applicable to the kind are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub font_size: Option<f64>,
    pub rotation: Option<f64>,
}

impl Geometry {
    fn at(position: Point) -> Self {
        Self {
            x: position.x,
            y: position.y,
            ..Default::default()
        }
    }

    fn of(element: &Element) -> Self {
        let base = element.base();
        Self {
            x: base.x,
            y: base.y,
            width: base.width,
            height: base.height,
            font_size: element.as_text().map(|t| t.font_size),
            rotation: Some(base.rotation),
        }
    }
}

/// Partial element update. Scale is never part of a patch: transforms are
/// normalized into width/height/font size first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub font_size: Option<f64>,
    pub rotation: Option<f64>,
}

impl ElementPatch {
    /// Apply to an element. `font_size` only affects text.
    pub fn apply_to(&self, element: &mut Element) {
        let base = element.base_mut();
        if let Some(x) = self.x {
            base.x = x;
        }
        if let Some(y) = self.y {
            base.y = y;
        }
        if let Some(width) = self.width {
            base.width = Some(width);
        }
        if let Some(height) = self.height {
            base.height = Some(height);
        }
        if let Some(rotation) = self.rotation {
            base.rotation = rotation;
        }
        if let (Some(size), Element::Text(text)) = (self.font_size, element) {
            text.font_size = size;
        }
    }
}

impl From<Geometry> for ElementPatch {
    fn from(g: Geometry) -> Self {
        Self {
            x: Some(g.x),
            y: Some(g.y),
            width: g.width,
            height: g.height,
            font_size: g.font_size,
            rotation: g.rotation,
        }
    }
}

/// Host callbacks. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait InteractionHandler {
    fn on_select(&mut self, id: &ElementId, event: &PointerEvent) {}
    fn on_drag_start(&mut self, id: &ElementId, geometry: Geometry) {}
    fn on_drag_move(&mut self, id: &ElementId, geometry: Geometry) {}
    fn on_drag_end(&mut self, id: &ElementId, geometry: Geometry) {}
    fn on_transform_start(&mut self, id: &ElementId, geometry: Geometry) {}
    fn on_transform_end(&mut self, id: &ElementId, geometry: Geometry) {}
    fn on_element_change(&mut self, id: &ElementId, patch: ElementPatch) {}
    /// New pan relative to the slot's zoomed cover-fit origin.
    fn on_image_offset_change(&mut self, id: &ElementId, offset: Vec2) {}
    fn on_text_double_click(&mut self, element: &TextElement, event: &PointerEvent) {}
}

/// In-progress drag of an image inside its slot.
#[derive(Debug, Clone, Copy)]
struct ImageDrag {
    fit: CoverFit,
    zoom: f64,
    slot: Size,
    image: Size,
    origin: Point,
    rotation: f64,
}

impl ImageDrag {
    /// Clamp a proposed canvas-space image position; returns it in slot-local units.
    fn bound(&self, position: Point) -> Point {
        let local = to_local(position, self.origin, self.rotation);
        clamp_image_position(local, self.slot, self.image)
    }
}

#[derive(Debug, Clone)]
enum Gesture {
    Drag(ElementId),
    ImageDrag(ElementId, ImageDrag),
    Transform(ElementId),
}

/// Routes pointer events to host callbacks, honoring lock state and
/// image-within-slot drag mode.
#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Option<Gesture>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag or transform is in progress.
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Handle `event` on `element`.
    ///
    /// For drag events returns the bounded position the host should show the
    /// dragged node at, in canvas units. Locked elements are ignored.
    pub fn dispatch(
        &mut self,
        element: &Element,
        event: &PointerEvent,
        ctx: &RenderContext,
        handler: &mut dyn InteractionHandler,
    ) -> Option<Point> {
        if element.is_locked() {
            log::trace!("Ignoring {:?} on locked element {}", event, element.id());
            return None;
        }
        let id = element.id();

        let image_mode = match element {
            Element::ImageSlot(slot) => ctx.is_image_drag(slot),
            _ => false,
        };

        match *event {
            PointerEvent::Click | PointerEvent::Tap => {
                handler.on_select(id, event);
                None
            }
            PointerEvent::DoubleClick | PointerEvent::DoubleTap => {
                if let Element::Text(text) = element {
                    handler.on_text_double_click(text, event);
                }
                None
            }
            PointerEvent::DragCancel => {
                if self.gesture.take().is_some() {
                    log::debug!("Gesture on {} cancelled", id);
                }
                None
            }
            PointerEvent::DragStart { position } if image_mode => {
                let drag = self.image_drag(element, ctx)?;
                self.gesture = Some(Gesture::ImageDrag(id.clone(), drag));
                Some(element_transform(drag.origin, drag.rotation) * drag.bound(position))
            }
            PointerEvent::DragMove { position } | PointerEvent::DragEnd { position } if image_mode => {
                let Some(Gesture::ImageDrag(active, drag)) = &self.gesture else {
                    return None;
                };
                if active != id {
                    return None;
                }
                let drag = *drag;
                let local = drag.bound(position);
                if matches!(event, PointerEvent::DragEnd { .. }) {
                    self.gesture = None;
                    let pan = local - zoomed_origin(&drag.fit, drag.zoom);
                    handler.on_image_offset_change(id, pan);
                }
                Some(element_transform(drag.origin, drag.rotation) * local)
            }
            // The slot itself only selects while its image is being positioned.
            PointerEvent::TransformStart | PointerEvent::TransformEnd { .. } if image_mode => None,
            PointerEvent::DragStart { position } => {
                self.gesture = Some(Gesture::Drag(id.clone()));
                handler.on_drag_start(id, Geometry::at(position));
                Some(position)
            }
            PointerEvent::DragMove { position } => {
                if !self.is_gesture_on(id) {
                    return None;
                }
                handler.on_drag_move(id, Geometry::at(position));
                Some(position)
            }
            PointerEvent::DragEnd { position } => {
                if !self.is_gesture_on(id) {
                    return None;
                }
                self.gesture = None;
                handler.on_drag_end(id, Geometry::at(position));
                handler.on_element_change(
                    id,
                    ElementPatch {
                        x: Some(position.x),
                        y: Some(position.y),
                        ..Default::default()
                    },
                );
                Some(position)
            }
            PointerEvent::TransformStart => {
                self.gesture = Some(Gesture::Transform(id.clone()));
                handler.on_transform_start(id, Geometry::of(element));
                None
            }
            PointerEvent::TransformEnd {
                x,
                y,
                scale_x,
                scale_y,
                rotation,
            } => {
                if !self.is_transform_on(id) {
                    return None;
                }
                self.gesture = None;
                let geometry = normalize_transform(element, x, y, scale_x, scale_y, rotation);
                handler.on_transform_end(id, geometry);
                handler.on_element_change(id, geometry.into());
                None
            }
        }
    }

    fn is_gesture_on(&self, id: &ElementId) -> bool {
        matches!(&self.gesture, Some(Gesture::Drag(active)) if active == id)
    }

    fn is_transform_on(&self, id: &ElementId) -> bool {
        matches!(&self.gesture, Some(Gesture::Transform(active)) if active == id)
    }

    fn image_drag(&self, element: &Element, ctx: &RenderContext) -> Option<ImageDrag> {
        let Element::ImageSlot(slot) = element else {
            return None;
        };
        let resource = ctx.image(slot.image.as_deref())?;
        let frame = element.frame(Size::ZERO);
        let zoom = ctx.image_scale(&slot.base.id);
        let fit = fit_image_to_slot(Some(resource.size()), frame.size());
        let placement = apply_zoom_pan(&fit, zoom, Vec2::ZERO);
        Some(ImageDrag {
            fit,
            zoom,
            slot: frame.size(),
            image: placement.size(),
            origin: frame.origin(),
            rotation: slot.base.rotation(),
        })
    }
}

/// Fold a visual scale into the element's own size so transforms never compound.
///
/// Text: `fontSize = round(fontSize * max(sx, sy))`, `width = round(width * sx)`.
/// Other kinds: `width * sx`, `height * sy`.
pub fn normalize_transform(
    element: &Element,
    x: f64,
    y: f64,
    scale_x: f64,
    scale_y: f64,
    rotation: f64,
) -> Geometry {
    let base = element.base();
    let sx = finite_or(scale_x, 1.0).abs();
    let sy = finite_or(scale_y, 1.0).abs();
    let x = finite_or(x, base.x);
    let y = finite_or(y, base.y);
    let rotation = Some(finite_or(rotation, base.rotation));

    match element {
        Element::Text(text) => Geometry {
            x,
            y,
            width: base.width.map(|w| (w * sx).round()),
            height: None,
            font_size: Some((text.font_size * sx.max(sy)).round()),
            rotation,
        },
        _ => Geometry {
            x,
            y,
            width: base.width.map(|w| w * sx),
            height: base.height.map(|h| h * sy),
            font_size: None,
            rotation,
        },
    }
}
