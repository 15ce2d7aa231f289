//! Image codec capability trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between rendition logic and pixel
//! work. It exposes the five steps the resizer needs: measure a source,
//! decode it, strip ancillary metadata, scale, and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests drive the service through `MockBackend`, which records calls
//! instead of touching pixels.

use super::params::{ImageFormat, Quality, ScaleParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Encode failed: {0}")]
    EncodeFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Codec capability used by the renderer and the resize service.
///
/// `Image` is the backend's decoded pixel buffer. It never leaves the
/// backend except to be handed back to it.
pub trait ImageBackend: Send + Sync {
    type Image;

    /// Read the source's pixel width without a full decode where possible.
    fn measure_width(&self, path: &Path) -> Result<u32, BackendError>;

    /// Decode a source file into a pixel buffer.
    fn decode(&self, path: &Path) -> Result<Self::Image, BackendError>;

    /// Dimensions of a decoded buffer.
    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    /// Drop colour profiles, comments and other non-pixel data.
    fn strip_metadata(&self, image: Self::Image) -> Self::Image;

    /// Resample to the given dimensions, sharpening afterwards if requested.
    fn scale(&self, image: Self::Image, params: &ScaleParams) -> Result<Self::Image, BackendError>;

    /// Encode a buffer into `format`. `quality` applies to lossy formats only.
    fn encode(
        &self,
        image: &Self::Image,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
