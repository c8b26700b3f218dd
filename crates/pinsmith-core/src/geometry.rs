//! Fit geometry: cover-fit of images into slots, zoom/pan composition, clip paths.
//!
//! Everything here is a pure function of its inputs. Degenerate sizes (zero,
//! negative or non-finite) produce zero-area results instead of NaN.

use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Size, Vec2};

/// Replace a non-finite value with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Clamp to `>= 0`, mapping non-finite values to 0.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn is_degenerate(size: Size) -> bool {
    !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0)
}

/// Result of covering a slot with an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    /// Uniform scale from image pixels to slot units.
    pub scale: f64,
    /// Scaled image width.
    pub width: f64,
    /// Scaled image height.
    pub height: f64,
    /// Image left edge relative to the slot's origin.
    pub offset_x: f64,
    /// Image top edge relative to the slot's origin.
    pub offset_y: f64,
}

impl CoverFit {
    /// Neutral geometry for a slot with no usable image.
    pub fn placeholder(slot: Size) -> Self {
        Self {
            scale: 1.0,
            width: non_negative(slot.width),
            height: non_negative(slot.height),
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    fn empty() -> Self {
        Self {
            scale: 0.0,
            width: 0.0,
            height: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Scale an image uniformly so it covers `slot`, centered on the overflowing axis.
///
/// `image` is the intrinsic pixel size, `None` when no image is bound.
pub fn fit_image_to_slot(image: Option<Size>, slot: Size) -> CoverFit {
    if is_degenerate(slot) {
        return CoverFit::empty();
    }
    let Some(image) = image.filter(|size| !is_degenerate(*size)) else {
        return CoverFit::placeholder(slot);
    };

    let image_aspect = image.width / image.height;
    let slot_aspect = slot.width / slot.height;

    if image_aspect > slot_aspect {
        // Wider than the slot: match heights, overflow horizontally.
        let scale = slot.height / image.height;
        let width = image.width * scale;
        CoverFit {
            scale,
            width,
            height: slot.height,
            offset_x: (slot.width - width) / 2.0,
            offset_y: 0.0,
        }
    } else {
        let scale = slot.width / image.width;
        let height = image.height * scale;
        CoverFit {
            scale,
            width: slot.width,
            height,
            offset_x: 0.0,
            offset_y: (slot.height - height) / 2.0,
        }
    }
}

/// Final image rectangle inside a slot after user zoom and pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ImagePlacement {
    /// Draw rectangle in slot-local coordinates.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y,
            self.offset_x + self.width,
            self.offset_y + self.height,
        )
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.offset_x, self.offset_y)
    }
}

/// Zoom the cover-fit image about its center, then add the raw pan offset.
///
/// The zoom and pan contributions are additive and independent. No clamping
/// happens here; see [`clamp_image_position`].
pub fn apply_zoom_pan(fit: &CoverFit, zoom: f64, pan: Vec2) -> ImagePlacement {
    let zoom = if zoom.is_finite() { zoom.max(0.0) } else { 1.0 };
    let pan = Vec2::new(finite_or(pan.x, 0.0), finite_or(pan.y, 0.0));

    let width = fit.width * zoom;
    let height = fit.height * zoom;
    let zoom_offset_x = (width - fit.width) / 2.0;
    let zoom_offset_y = (height - fit.height) / 2.0;

    ImagePlacement {
        width,
        height,
        offset_x: fit.offset_x - zoom_offset_x + pan.x,
        offset_y: fit.offset_y - zoom_offset_y + pan.y,
    }
}

/// Image origin (before pan) after zooming the cover fit about its center.
pub fn zoomed_origin(fit: &CoverFit, zoom: f64) -> Point {
    apply_zoom_pan(fit, zoom, Vec2::ZERO).origin()
}

fn clamp_axis(position: f64, slot: f64, image: f64) -> f64 {
    let edge = slot - image;
    position.clamp(edge.min(0.0), edge.max(0.0))
}

/// Keep an image of `image` size positioned so it never exposes empty slot area.
///
/// For an image at least as large as the slot the allowed range on each axis
/// is `[slot - image, 0]`. A smaller image (zoomed out) stays inside the slot.
pub fn clamp_image_position(position: Point, slot: Size, image: Size) -> Point {
    Point::new(
        clamp_axis(finite_or(position.x, 0.0), non_negative(slot.width), non_negative(image.width)),
        clamp_axis(finite_or(position.y, 0.0), non_negative(slot.height), non_negative(image.height)),
    )
}

/// Apply [`clamp_image_position`] to a placement.
pub fn clamp_placement(placement: ImagePlacement, slot: Size) -> ImagePlacement {
    let origin = clamp_image_position(placement.origin(), slot, placement.size());
    ImagePlacement {
        offset_x: origin.x,
        offset_y: origin.y,
        ..placement
    }
}

/// Clamp a user pan so the zoomed image keeps covering the slot.
///
/// Returns the pan that, fed back into [`apply_zoom_pan`], yields a clamped placement.
pub fn clamp_pan(fit: &CoverFit, zoom: f64, pan: Vec2, slot: Size) -> Vec2 {
    let placement = clamp_placement(apply_zoom_pan(fit, zoom, pan), slot);
    placement.origin() - zoomed_origin(fit, zoom)
}

/// Corner radius clamped to `[0, min(width, height) / 2]`.
pub fn clamp_radius(width: f64, height: f64, radius: f64) -> f64 {
    let max = non_negative(width).min(non_negative(height)) / 2.0;
    non_negative(radius).min(max)
}

/// Clip boundary for a `width` × `height` rectangle at the local origin.
pub fn rounded_rect_clip(width: f64, height: f64, radius: f64) -> RoundedRect {
    let width = non_negative(width);
    let height = non_negative(height);
    RoundedRect::new(0.0, 0.0, width, height, clamp_radius(width, height, radius))
}

/// Rounded rectangle built from lines and quadratic corners, for surfaces
/// without a native rounded-rect primitive. A zero radius gives a plain rectangle.
pub fn rounded_rect_quad_path(rect: Rect, radius: f64) -> BezPath {
    let rect = rect.abs();
    let r = clamp_radius(rect.width(), rect.height(), radius);
    let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);

    let mut path = BezPath::new();
    if r <= 0.0 {
        path.move_to((x0, y0));
        path.line_to((x1, y0));
        path.line_to((x1, y1));
        path.line_to((x0, y1));
        path.close_path();
        return path;
    }

    path.move_to((x0 + r, y0));
    path.line_to((x1 - r, y0));
    path.quad_to((x1, y0), (x1, y0 + r));
    path.line_to((x1, y1 - r));
    path.quad_to((x1, y1), (x1 - r, y1));
    path.line_to((x0 + r, y1));
    path.quad_to((x0, y1), (x0, y1 - r));
    path.line_to((x0, y0 + r));
    path.quad_to((x0, y0), (x0 + r, y0));
    path.close_path();
    path
}

/// Element-local to canvas transform: translate to `origin`, rotate about it.
pub fn element_transform(origin: Point, rotation_degrees: f64) -> Affine {
    Affine::translate(origin.to_vec2()) * Affine::rotate(finite_or(rotation_degrees, 0.0).to_radians())
}

/// Map a canvas-space point into an element's local (unrotated) space.
pub fn to_local(point: Point, origin: Point, rotation_degrees: f64) -> Point {
    element_transform(origin, rotation_degrees).inverse() * point
}
