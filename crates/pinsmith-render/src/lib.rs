//! Pinsmith Render Library
//!
//! Drawing-surface adapters for the paint trees produced by `pinsmith-core`.
//! [`CommandRecorder`] emits canvas-2D style commands; the default
//! [`VelloRenderer`] builds a Vello scene for GPU rendering.

mod renderer;
pub mod commands;
pub mod images;

#[cfg(feature = "vello-renderer")]
pub mod measure;
#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use commands::{CommandRecorder, DrawCommand};
pub use images::{DecodedImage, ImageStore};
pub use renderer::{FrameContext, RenderResult, Renderer, RendererError, SurfaceCapabilities};

#[cfg(feature = "vello-renderer")]
pub use measure::ParleyMeasurer;
#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloRenderer;
