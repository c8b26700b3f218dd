//! Typography: text styling enums, variable detection, measurement and font-size auto-fit.

use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Smallest font size the auto-fit search will shrink to.
pub const DEFAULT_MIN_FONT_SIZE: f64 = 10.0;

/// Case transform applied to display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    /// Apply the transform to a string.
    pub fn apply(self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => {
                // First letter of every whitespace-separated word; the rest is untouched.
                let mut out = String::with_capacity(text.len());
                let mut at_word_start = true;
                for ch in text.chars() {
                    if at_word_start && ch.is_alphabetic() {
                        out.extend(ch.to_uppercase());
                        at_word_start = false;
                    } else {
                        out.push(ch);
                        at_word_start = ch.is_whitespace();
                    }
                }
                out
            }
        }
    }
}

/// Horizontal text alignment within the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment within the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Line decoration drawn with the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

/// Font slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Numeric font weight (100..=900). Accepts `"bold"`, `"normal"` or a number in scene data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "FontWeightRepr", into = "u16")]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    /// Whether the weight renders as bold.
    pub fn is_bold(self) -> bool {
        self.0 >= 600
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FontWeightRepr {
    Number(u16),
    Name(String),
}

impl From<FontWeightRepr> for FontWeight {
    fn from(repr: FontWeightRepr) -> Self {
        match repr {
            FontWeightRepr::Number(n) => FontWeight(n.clamp(1, 1000)),
            FontWeightRepr::Name(name) => match name.trim().to_lowercase().as_str() {
                "bold" | "bolder" => FontWeight::BOLD,
                "light" | "lighter" => FontWeight(300),
                "normal" | "" => FontWeight::NORMAL,
                other => other
                    .parse::<u16>()
                    .map(|n| FontWeight(n.clamp(1, 1000)))
                    .unwrap_or_else(|_| {
                        log::warn!("Unknown font weight {:?}; using normal", other);
                        FontWeight::NORMAL
                    }),
            },
        }
    }
}

impl From<FontWeight> for u16 {
    fn from(weight: FontWeight) -> Self {
        weight.0
    }
}

/// Complete font description used for measurement and painting.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Font family name.
    pub family: String,
    /// Font size in canvas units.
    pub size: f64,
    pub weight: FontWeight,
    pub style: FontStyle,
    /// Extra spacing between characters, in canvas units.
    pub letter_spacing: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
}

impl FontSpec {
    /// The same font at a different size.
    pub fn with_size(&self, size: f64) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Distance between consecutive baselines.
    pub fn line_advance(&self) -> f64 {
        self.size * self.line_height
    }
}

/// Whether `text` contains at least one `{{variable}}` token.
pub fn contains_variables(text: &str) -> bool {
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) if !after[..end].trim().is_empty() => return true,
            Some(end) => rest = &after[end + 2..],
            None => return false,
        }
    }
    false
}

/// Replace every `{{name}}` token using `lookup`. Unknown names are left verbatim.
pub fn substitute_variables(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Expands `{{variable}}` tokens in text content. Supplied by the host editor.
pub trait VariableResolver {
    fn substitute(&self, template: &str) -> String;
}

/// Resolver that leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariables;

impl VariableResolver for NoVariables {
    fn substitute(&self, template: &str) -> String {
        template.to_string()
    }
}

impl VariableResolver for HashMap<String, String> {
    fn substitute(&self, template: &str) -> String {
        substitute_variables(template, |name| self.get(name).cloned())
    }
}

/// Resolver backed by a closure.
pub struct ResolverFn<F>(pub F);

impl<F> VariableResolver for ResolverFn<F>
where
    F: Fn(&str) -> String,
{
    fn substitute(&self, template: &str) -> String {
        (self.0)(template)
    }
}

/// Auto-fit mode for a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoFit {
    /// Always shrink to fit.
    On,
    /// Never shrink.
    Off,
    /// Shrink only when the content contains `{{variable}}` tokens.
    #[default]
    Auto,
}

impl AutoFit {
    /// Build from the optional `autoFit` flag stored in scene data.
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => AutoFit::On,
            Some(false) => AutoFit::Off,
            None => AutoFit::Auto,
        }
    }

    /// Whether auto-fit applies to the given (unsubstituted) content.
    pub fn is_enabled(self, content: &str) -> bool {
        match self {
            AutoFit::On => true,
            AutoFit::Off => false,
            AutoFit::Auto => contains_variables(content),
        }
    }
}

/// Text measurement errors.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("Measurement failed: {0}")]
    Failed(String),
    #[error("Invalid measured height: {0}")]
    InvalidHeight(f64),
}

/// Measures the height of word-wrapped text. Supplied by the drawing surface.
///
/// Implementations must wrap the same way the surface paints, otherwise the
/// auto-fit result and the painted text disagree.
pub trait TextMeasurer {
    /// Height of `text` wrapped to `max_width` with `font`.
    fn measure_height(&self, text: &str, max_width: f64, font: &FontSpec) -> Result<f64, MeasureError>;
}

/// Font-agnostic measurer using an average glyph advance per font size.
#[derive(Debug, Clone, Copy)]
pub struct ApproximateMeasurer {
    /// Average glyph advance as a fraction of the font size.
    pub char_width_factor: f64,
}

impl Default for ApproximateMeasurer {
    fn default() -> Self {
        Self {
            char_width_factor: 0.55,
        }
    }
}

impl ApproximateMeasurer {
    fn char_advance(&self, font: &FontSpec) -> f64 {
        let factor = if font.weight.is_bold() {
            self.char_width_factor + 0.05
        } else {
            self.char_width_factor
        };
        font.size * factor + font.letter_spacing
    }

    /// Width of a single unwrapped line.
    pub fn text_width(&self, line: &str, font: &FontSpec) -> f64 {
        line.chars().count() as f64 * self.char_advance(font)
    }

    /// Greedy word wrap. Explicit newlines always break; a word wider than
    /// `max_width` gets a line of its own.
    pub fn wrap_lines(&self, text: &str, max_width: f64, font: &FontSpec) -> Vec<String> {
        let advance = self.char_advance(font);
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            let mut line_width = 0.0;
            for word in paragraph.split_whitespace() {
                let word_width = word.chars().count() as f64 * advance;
                if line.is_empty() {
                    line_width = word_width;
                } else if line_width + advance + word_width <= max_width {
                    line_width += advance + word_width;
                    line.push(' ');
                } else {
                    lines.push(std::mem::take(&mut line));
                    line_width = word_width;
                }
                line.push_str(word);
            }
            lines.push(line);
        }
        lines
    }

    /// Number of lines [`wrap_lines`](Self::wrap_lines) produces.
    pub fn line_count(&self, text: &str, max_width: f64, font: &FontSpec) -> usize {
        self.wrap_lines(text, max_width, font).len()
    }
}

impl TextMeasurer for ApproximateMeasurer {
    fn measure_height(&self, text: &str, max_width: f64, font: &FontSpec) -> Result<f64, MeasureError> {
        Ok(self.line_count(text, max_width, font) as f64 * font.line_advance())
    }
}

/// Largest font size in `[min_size, font.size]` whose wrapped height fits `box_size`.
///
/// The base size is returned unchanged when it already fits, or when the
/// measurer fails or reports a non-finite height. Otherwise integers are
/// binary-searched until the interval narrows to 1 and the largest fitting
/// size is returned (`min_size` when nothing fits).
pub fn auto_fit_font_size(
    measurer: &dyn TextMeasurer,
    text: &str,
    box_size: Size,
    font: &FontSpec,
    min_size: f64,
) -> f64 {
    let base = font.size;
    if !base.is_finite() || !box_size.width.is_finite() || !box_size.height.is_finite() {
        return base;
    }
    if base <= min_size {
        return base;
    }

    let fits = |size: f64| -> Result<bool, MeasureError> {
        let height = measurer.measure_height(text, box_size.width, &font.with_size(size))?;
        if !height.is_finite() || height < 0.0 {
            return Err(MeasureError::InvalidHeight(height));
        }
        Ok(height <= box_size.height)
    };

    match fits(base) {
        Ok(true) => return base,
        Ok(false) => {}
        Err(e) => {
            log::warn!("Auto-fit measurement failed: {}; keeping base size {}", e, base);
            return base;
        }
    }

    let upper = base.floor();
    if upper <= min_size {
        return min_size;
    }

    let mut min = min_size;
    let mut max = upper;
    while max - min > 1.0 {
        let mid = ((min + max) / 2.0).floor();
        match fits(mid) {
            Ok(true) => min = mid,
            Ok(false) => max = mid,
            Err(e) => {
                log::warn!("Auto-fit measurement failed: {}; keeping base size {}", e, base);
                return base;
            }
        }
    }
    log::trace!("Auto-fit {:?}: {} -> {}", text, base, min);
    min
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FitKey {
    text: String,
    family: String,
    weight: u16,
    italic: bool,
    // f64 bit patterns
    width: u64,
    height: u64,
    base: u64,
    min: u64,
    letter_spacing: u64,
    line_height: u64,
}

/// Memoizes auto-fit results by every input that affects them.
///
/// During a pure drag only position changes, so every frame after the first is a hit.
#[derive(Debug, Clone)]
pub struct FontSizeCache {
    entries: HashMap<FitKey, f64>,
    capacity: usize,
    hits: u64,
}

impl FontSizeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            hits: 0,
        }
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached [`auto_fit_font_size`].
    pub fn fit(
        &mut self,
        measurer: &dyn TextMeasurer,
        text: &str,
        box_size: Size,
        font: &FontSpec,
        min_size: f64,
    ) -> f64 {
        let key = FitKey {
            text: text.to_string(),
            family: font.family.clone(),
            weight: font.weight.0,
            italic: font.style == FontStyle::Italic,
            width: box_size.width.to_bits(),
            height: box_size.height.to_bits(),
            base: font.size.to_bits(),
            min: min_size.to_bits(),
            letter_spacing: font.letter_spacing.to_bits(),
            line_height: font.line_height.to_bits(),
        };
        if let Some(size) = self.entries.get(&key) {
            self.hits += 1;
            return *size;
        }
        let size = auto_fit_font_size(measurer, text, box_size, font, min_size);
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        self.entries.insert(key, size);
        size
    }
}
