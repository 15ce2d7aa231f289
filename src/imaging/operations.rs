//! Rendition rendering.
//!
//! Combines the quality calculation with backend execution: decode, strip
//! metadata, pick the quality from the source's width, scale down to the
//! breakpoint, encode. Nothing here touches the cache; the caller decides
//! where the bytes go.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{MAX_QUALITY, compression_quality, scaled_dimensions};
use super::params::{ImageFormat, Quality, ScaleParams, Sharpening};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Everything the renderer needs to produce one rendition.
#[derive(Debug, Clone)]
pub struct RenderParams<'a> {
    pub source: &'a Path,
    pub format: ImageFormat,
    pub target_width: u32,
    /// Widest breakpoint; the quality policy is relative to it.
    pub ladder_max: u32,
    pub quality_floor: u32,
    pub sharpening: Option<Sharpening>,
}

/// An encoded rendition, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Render `params.source` at `params.target_width`.
///
/// Sources already at or below the target width are re-encoded at their own
/// size; sharpening only applies when pixels were actually resampled.
pub fn render(backend: &impl ImageBackend, params: &RenderParams<'_>) -> Result<RenderedImage> {
    let image = backend.decode(params.source)?;
    let image = backend.strip_metadata(image);

    let source_dims = backend.dimensions(&image);
    let quality = compression_quality(
        source_dims.width,
        params.ladder_max,
        params.quality_floor,
        MAX_QUALITY,
    );

    let (width, height) = scaled_dimensions(
        (source_dims.width, source_dims.height),
        params.target_width,
    );
    let image = if width < source_dims.width {
        backend.scale(
            image,
            &ScaleParams {
                width,
                height,
                sharpening: params.sharpening,
            },
        )?
    } else {
        image
    };

    let bytes = backend.encode(&image, params.format, quality)?;
    Ok(RenderedImage {
        bytes,
        width,
        height,
        quality,
    })
}
