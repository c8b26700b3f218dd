//! Paint instructions produced by the element renderer.
//!
//! A [`PaintTree`] is plain data. Drawing surfaces walk it in order; the
//! geometry inside each [`PaintNode`] is in element-local units and the node
//! carries the transform, rotation and opacity applied at paint time.

use crate::effects::{ShadowParams, StrokeParams};
use crate::element::{ElementId, ElementKind};
use crate::geometry::element_transform;
use crate::text::{FontSpec, TextAlign, TextDecoration, VerticalAlign};
use kurbo::{Affine, Point, Rect, RoundedRect, Size};
use peniko::Color;

/// Handle to a decoded bitmap owned by the host's asset layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageResource {
    /// Lookup key (usually the source URL).
    pub key: String,
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
}

impl ImageResource {
    pub fn new(key: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            key: key.into(),
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    /// No pixels to draw.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Which pointer interactions a node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interactivity {
    /// Receives click/tap (selection) and double-click events.
    pub listening: bool,
    /// The node as a whole can be dragged and transformed.
    pub draggable: bool,
    /// The image inside a slot can be panned.
    pub image_draggable: bool,
}

impl Interactivity {
    /// Frozen: painted only.
    pub const NONE: Self = Self {
        listening: false,
        draggable: false,
        image_draggable: false,
    };

    /// Selectable, draggable and transformable.
    pub const FULL: Self = Self {
        listening: true,
        draggable: true,
        image_draggable: false,
    };

    /// Image-within-slot mode: the slot only selects, the inner image pans.
    pub const IMAGE_PAN: Self = Self {
        listening: true,
        draggable: false,
        image_draggable: true,
    };
}

/// Wrapped text paint with resolved typography and effects.
#[derive(Debug, Clone)]
pub struct TextPaint {
    /// Display text after substitution and case transform.
    pub text: String,
    /// Layout box; text wraps to its width.
    pub rect: Rect,
    /// Font at the final (possibly auto-fitted) size.
    pub font: FontSpec,
    pub align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub decoration: TextDecoration,
    /// Glyph fill, `None` for hollow effects.
    pub fill: Option<Color>,
    pub stroke: Option<StrokeParams>,
    pub shadow: Option<ShadowParams>,
}

/// A single drawing instruction.
#[derive(Debug, Clone)]
pub enum PaintOp {
    FillRect {
        rect: Rect,
        radius: f64,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        radius: f64,
        width: f64,
        color: Color,
    },
    /// Draw a bitmap stretched to `rect`.
    Image { resource: ImageResource, rect: Rect },
    /// Paint `children` clipped to `shape`.
    Clip {
        shape: RoundedRect,
        children: Vec<PaintOp>,
    },
    Text(TextPaint),
}

impl PaintOp {
    /// Visit this op and every op nested in clips, in paint order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a PaintOp)) {
        f(self);
        if let PaintOp::Clip { children, .. } = self {
            for child in children {
                child.visit(f);
            }
        }
    }
}

/// Paint output of one element.
#[derive(Debug, Clone)]
pub struct PaintNode {
    pub element_id: ElementId,
    pub kind: ElementKind,
    /// Element top-left in canvas units.
    pub origin: Point,
    /// Rotation in degrees around `origin`.
    pub rotation: f64,
    pub opacity: f64,
    pub interactivity: Interactivity,
    /// Drawing instructions in element-local units.
    pub ops: Vec<PaintOp>,
}

impl PaintNode {
    /// Element-local to canvas transform.
    pub fn transform(&self) -> Affine {
        element_transform(self.origin, self.rotation)
    }

    /// All ops including those nested in clips, in paint order.
    pub fn flatten(&self) -> Vec<&PaintOp> {
        let mut out = Vec::new();
        for op in &self.ops {
            op.visit(&mut |op| out.push(op));
        }
        out
    }

    /// Every text paint of this node.
    pub fn texts(&self) -> impl Iterator<Item = &TextPaint> {
        self.flatten().into_iter().filter_map(|op| match op {
            PaintOp::Text(text) => Some(text),
            _ => None,
        })
    }
}

/// Paint output of a whole scene. Node order is z-order, first = bottom.
#[derive(Debug, Clone)]
pub struct PaintTree {
    pub size: Size,
    pub background: Option<Color>,
    pub nodes: Vec<PaintNode>,
}

impl PaintTree {
    pub fn node(&self, id: &ElementId) -> Option<&PaintNode> {
        self.nodes.iter().find(|node| &node.element_id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_descends_into_clips() {
        let node = PaintNode {
            element_id: ElementId::from("slot"),
            kind: ElementKind::ImageSlot,
            origin: Point::new(10.0, 20.0),
            rotation: 0.0,
            opacity: 1.0,
            interactivity: Interactivity::FULL,
            ops: vec![PaintOp::Clip {
                shape: RoundedRect::new(0.0, 0.0, 50.0, 50.0, 4.0),
                children: vec![
                    PaintOp::FillRect {
                        rect: Rect::new(0.0, 0.0, 50.0, 50.0),
                        radius: 0.0,
                        color: Color::WHITE,
                    },
                    PaintOp::Image {
                        resource: ImageResource::new("a.png", 100, 100),
                        rect: Rect::new(0.0, 0.0, 50.0, 50.0),
                    },
                ],
            }],
        };
        let ops = node.flatten();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], PaintOp::Clip { .. }));
        assert!(matches!(ops[2], PaintOp::Image { .. }));
        assert_eq!(node.texts().count(), 0);
        assert_eq!(node.transform() * Point::ZERO, Point::new(10.0, 20.0));
    }
}
