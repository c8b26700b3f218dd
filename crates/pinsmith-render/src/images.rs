//! Decoded bitmap storage shared by the render context and drawing surfaces.

use crate::renderer::{RenderResult, RendererError};
use peniko::Blob;
use pinsmith_core::{ImageResource, RenderContext};
use std::collections::HashMap;
use std::sync::Arc;

/// A decoded RGBA8 bitmap (unpremultiplied, row-major).
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub resource: ImageResource,
    pub pixels: Blob<u8>,
}

/// Bitmaps keyed by their source (usually the URL the editor loaded them from).
#[derive(Debug, Default)]
pub struct ImageStore {
    images: HashMap<String, DecodedImage>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode PNG, JPEG or WebP bytes and store them under `key`.
    pub fn decode(&mut self, key: impl Into<String>, bytes: &[u8]) -> RenderResult<ImageResource> {
        let key = key.into();
        let decoded = ::image::load_from_memory(bytes).map_err(|e| {
            log::warn!("Failed to decode image {}: {}", key, e);
            RendererError::ImageDecode(format!("{}: {}", key, e))
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        self.insert_rgba(key, width, height, rgba.into_vec())
    }

    /// Store already-decoded RGBA8 pixels.
    pub fn insert_rgba(
        &mut self,
        key: impl Into<String>,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> RenderResult<ImageResource> {
        let key = key.into();
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(RendererError::ImageDecode(format!(
                "{}: {}x{} image needs {} bytes, got {}",
                key,
                width,
                height,
                expected,
                rgba.len()
            )));
        }
        let resource = ImageResource::new(key.clone(), width, height);
        log::debug!("Stored image {} ({}x{})", key, width, height);
        self.images.insert(
            key,
            DecodedImage {
                resource: resource.clone(),
                pixels: Blob::new(Arc::new(rgba)),
            },
        );
        Ok(resource)
    }

    pub fn get(&self, key: &str) -> Option<&DecodedImage> {
        self.images.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<DecodedImage> {
        self.images.remove(key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Make every stored bitmap available to the element renderer.
    pub fn register(&self, ctx: &mut RenderContext) {
        for image in self.images.values() {
            ctx.images.insert(image.resource.key.clone(), image.resource.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinsmith_core::ApproximateMeasurer;
    use std::io::Cursor;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ::image::RgbaImage::from_pixel(width, height, ::image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ::image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let mut store = ImageStore::new();
        let resource = store.decode("hero.png", &png_bytes(4, 2)).unwrap();
        assert_eq!((resource.width, resource.height), (4, 2));
        let image = store.get("hero.png").unwrap();
        assert_eq!(image.pixels.data().len(), 4 * 2 * 4);
        assert_eq!(&image.pixels.data()[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        init_logger();
        let mut store = ImageStore::new();
        let result = store.decode("broken.jpg", b"definitely not an image");
        assert!(matches!(result, Err(RendererError::ImageDecode(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_rgba_checks_length() {
        let mut store = ImageStore::new();
        assert!(store.insert_rgba("a", 2, 2, vec![0; 15]).is_err());
        assert!(store.insert_rgba("a", 0, 2, Vec::new()).is_err());
        assert!(store.insert_rgba("a", 2, 2, vec![0; 16]).is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_into_context() {
        let mut store = ImageStore::new();
        store.decode("logo.png", &png_bytes(8, 8)).unwrap();
        let measurer = ApproximateMeasurer::default();
        let mut ctx = RenderContext::new(&measurer);
        store.register(&mut ctx);
        assert_eq!(ctx.image(Some("logo.png")).map(|r| r.width), Some(8));
        assert!(ctx.image(Some("missing.png")).is_none());
    }
}
