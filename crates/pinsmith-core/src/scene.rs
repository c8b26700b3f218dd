//! Template scene: canvas size plus the ordered element list.

use crate::element::{Element, ElementId, ElementKind};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scene loading errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid scene: {0}")]
    InvalidScene(String),
}

/// Default pin canvas size (2:3 portrait).
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(1000.0, 1500.0);

/// A pin template. Element order is paint order (first = bottom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    /// CSS color painted beneath all elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE)
    }
}

impl Scene {
    /// Create an empty scene.
    pub fn new(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            background: None,
            elements: Vec::new(),
        }
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Append an element on top of the existing ones.
    pub fn push(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize the scene to JSON.
    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a scene, skipping elements of unknown `type`.
    ///
    /// Elements are parsed one at a time so data written by a newer editor
    /// still loads. A known element that fails to parse is an error.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let data: serde_json::Value = serde_json::from_str(json)?;

        let dimension = |key: &str| -> Result<f64, SceneError> {
            match data.get(key) {
                None => Ok(match key {
                    "width" => DEFAULT_CANVAS_SIZE.width,
                    _ => DEFAULT_CANVAS_SIZE.height,
                }),
                Some(value) => value
                    .as_f64()
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .ok_or_else(|| SceneError::InvalidScene(format!("'{}' must be a positive number", key))),
            }
        };
        let width = dimension("width")?;
        let height = dimension("height")?;

        let background = match data.get("background") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(
                value
                    .as_str()
                    .ok_or_else(|| SceneError::InvalidScene("'background' must be a string".to_string()))?
                    .to_string(),
            ),
        };

        let raw_elements = match data.get("elements") {
            None => &[][..],
            Some(value) => value
                .as_array()
                .ok_or_else(|| SceneError::InvalidScene("'elements' must be an array".to_string()))?
                .as_slice(),
        };

        let mut elements: Vec<Element> = Vec::with_capacity(raw_elements.len());
        for (index, raw) in raw_elements.iter().enumerate() {
            let tag = raw.get("type").and_then(|t| t.as_str()).unwrap_or("");
            if ElementKind::from_tag(tag).is_none() {
                log::warn!("Skipping element {} with unknown type {:?}", index, tag);
                continue;
            }
            let element = Element::deserialize(raw).map_err(|e| {
                SceneError::InvalidScene(format!("element {} ({}): {}", index, tag, e))
            })?;
            if elements.iter().any(|existing| existing.id() == element.id()) {
                return Err(SceneError::InvalidScene(format!("duplicate element id '{}'", element.id())));
            }
            elements.push(element);
        }

        log::debug!("Loaded scene {}x{} with {} elements", width, height, elements.len());
        Ok(Self {
            width,
            height,
            background,
            elements,
        })
    }
}

macro_rules! impl_into_element {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Element {
                fn from(value: $ty) -> Self {
                    Element::$variant(value)
                }
            }
        )*
    };
}

impl_into_element! {
    ImageSlot => crate::element::ImageSlot,
    Text => crate::element::TextElement,
    Shape => crate::element::ShapeElement,
    Logo => crate::element::LogoElement,
    Overlay => crate::element::OverlayElement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ShapeElement, TextElement};

    #[test]
    fn test_from_json_skips_unknown_types() {
        let json = r##"{
            "width": 1000, "height": 1500, "background": "#fafafa",
            "elements": [
                {"type": "shape", "id": "a", "width": 10, "height": 10},
                {"type": "video", "id": "b", "src": "clip.mp4"},
                {"type": "text", "id": "c", "content": "Hi", "width": 100, "height": 40}
            ]
        }"##;
        let scene = Scene::from_json(json).unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.elements[0].id().as_str(), "a");
        assert_eq!(scene.elements[1].id().as_str(), "c");
        assert_eq!(scene.background.as_deref(), Some("#fafafa"));
    }

    #[test]
    fn test_from_json_defaults_size() {
        let scene = Scene::from_json(r#"{"elements": []}"#).unwrap();
        assert_eq!(scene.size(), DEFAULT_CANVAS_SIZE);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_element() {
        let json = r#"{"elements": [{"type": "shape", "id": "a", "x": "left"}]}"#;
        assert!(matches!(Scene::from_json(json), Err(SceneError::InvalidScene(_))));
    }

    #[test]
    fn test_from_json_rejects_duplicate_ids() {
        let json = r#"{"elements": [
            {"type": "shape", "id": "a"},
            {"type": "logo", "id": "a"}
        ]}"#;
        assert!(matches!(Scene::from_json(json), Err(SceneError::InvalidScene(_))));
    }

    #[test]
    fn test_from_json_invalid_json() {
        assert!(matches!(Scene::from_json("{"), Err(SceneError::Json(_))));
    }

    #[test]
    fn test_roundtrip() {
        let mut scene = Scene::new(Size::new(600.0, 900.0)).with_background("white");
        scene.push(ShapeElement::new("band", 0.0, 0.0, 600.0, 80.0).with_fill("#222"));
        scene.push(TextElement::new("title", "{{title}}", 40.0, 100.0, 520.0, 200.0));
        let json = scene.to_json().unwrap();
        let back = Scene::from_json(&json).unwrap();
        assert_eq!(back, scene);
        assert!(back.get(&ElementId::from("title")).is_some());
    }
}
