//! Text measurement with parley, wrapping exactly as the Vello backend paints.

use parley::{FontContext, Layout, LayoutContext, StyleProperty};
use peniko::Brush;
use pinsmith_core::text::FontStyle;
use pinsmith_core::{FontSpec, MeasureError, TextMeasurer};
use std::cell::RefCell;

/// Build and line-break a layout for `text`. Line height is not set on the
/// layout; callers space lines by [`FontSpec::line_advance`].
pub(crate) fn build_layout(
    font_cx: &mut FontContext,
    layout_cx: &mut LayoutContext<Brush>,
    text: &str,
    font: &FontSpec,
    max_width: Option<f64>,
    brush: Brush,
) -> Layout<Brush> {
    let mut builder = layout_cx.ranged_builder(font_cx, text, 1.0, false);
    builder.push_default(StyleProperty::FontSize(font.size as f32));
    builder.push_default(StyleProperty::Brush(brush));
    builder.push_default(StyleProperty::FontWeight(parley::FontWeight::new(font.weight.0 as f32)));
    if font.style == FontStyle::Italic {
        builder.push_default(StyleProperty::FontStyle(parley::FontStyle::Italic));
    }
    if font.letter_spacing != 0.0 {
        builder.push_default(StyleProperty::LetterSpacing(font.letter_spacing as f32));
    }
    builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
        parley::FontFamily::Named(font.family.as_str().into()),
    )));
    let mut layout = builder.build(text);
    layout.break_all_lines(max_width.map(|w| w as f32));
    layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());
    layout
}

/// [`TextMeasurer`] backed by parley line breaking and system fonts.
pub struct ParleyMeasurer {
    contexts: RefCell<(FontContext, LayoutContext<Brush>)>,
}

impl Default for ParleyMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParleyMeasurer {
    pub fn new() -> Self {
        Self {
            contexts: RefCell::new((FontContext::new(), LayoutContext::new())),
        }
    }

    /// Number of lines `text` wraps to.
    pub fn line_count(&self, text: &str, max_width: f64, font: &FontSpec) -> Result<usize, MeasureError> {
        let mut contexts = self
            .contexts
            .try_borrow_mut()
            .map_err(|_| MeasureError::Failed("measurer is already in use".to_string()))?;
        let (font_cx, layout_cx) = &mut *contexts;
        let layout = build_layout(font_cx, layout_cx, text, font, Some(max_width), Brush::default());
        Ok(layout.lines().count().max(1))
    }
}

impl TextMeasurer for ParleyMeasurer {
    fn measure_height(&self, text: &str, max_width: f64, font: &FontSpec) -> Result<f64, MeasureError> {
        if !(font.size.is_finite() && font.size > 0.0) {
            return Err(MeasureError::Failed(format!("invalid font size {}", font.size)));
        }
        Ok(self.line_count(text, max_width, font)? as f64 * font.line_advance())
    }
}
