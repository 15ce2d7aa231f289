//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Measure | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` |
//! | Scale | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Sharpening | `DynamicImage::unsharpen` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` |
//! | Encode → WebP | `WebPEncoder::new_lossless` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ImageFormat, Quality, ScaleParams};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageReader};
use std::borrow::Cow;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(e) => BackendError::Io(e),
        ImageError::Unsupported(e) => {
            BackendError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        }
        other => BackendError::DecodeFailed(format!("{}: {}", path.display(), other)),
    }
}

fn encode_error(format: ImageFormat, err: ImageError) -> BackendError {
    BackendError::EncodeFailed(format!("{format:?}: {err}"))
}

/// Narrow a buffer to a colour type the target encoder accepts.
fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    match (format, image) {
        (ImageFormat::Jpeg, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) => {
            Cow::Borrowed(image)
        }
        (ImageFormat::Jpeg, _) => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        (ImageFormat::WebP, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) => {
            Cow::Borrowed(image)
        }
        (ImageFormat::WebP, _) => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        (ImageFormat::Png | ImageFormat::Gif, _) => Cow::Borrowed(image),
    }
}

impl ImageBackend for RustBackend {
    type Image = DynamicImage;

    fn measure_width(&self, path: &Path) -> Result<u32, BackendError> {
        let (width, _) = image::image_dimensions(path).map_err(|e| decode_error(path, e))?;
        Ok(width)
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| decode_error(path, e))
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        Dimensions {
            width: image.width(),
            height: image.height(),
        }
    }

    /// A decoded `DynamicImage` holds pixels only: EXIF, ICC profiles and
    /// comments are dropped by the decoder, and the encoders below write none.
    fn strip_metadata(&self, image: DynamicImage) -> DynamicImage {
        image
    }

    fn scale(
        &self,
        image: DynamicImage,
        params: &ScaleParams,
    ) -> Result<DynamicImage, BackendError> {
        let resized = image.resize_exact(params.width, params.height, FilterType::Lanczos3);
        Ok(match params.sharpening {
            Some(s) => resized.unsharpen(s.sigma, s.threshold),
            None => resized,
        })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let image = encodable(image, format);
        let mut bytes = Vec::new();
        let result = match format {
            ImageFormat::Jpeg => image.write_with_encoder(JpegEncoder::new_with_quality(
                &mut bytes,
                quality.value() as u8,
            )),
            ImageFormat::Png => image.write_with_encoder(PngEncoder::new(&mut bytes)),
            ImageFormat::WebP => image.write_with_encoder(WebPEncoder::new_lossless(&mut bytes)),
            ImageFormat::Gif => {
                return Err(BackendError::UnsupportedFormat(
                    "GIF renditions are not produced".to_string(),
                ));
            }
        };
        result.map_err(|e| encode_error(format, e))?;
        Ok(bytes)
    }
}
