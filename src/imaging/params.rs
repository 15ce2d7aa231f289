//! Parameter types for image operations.
//!
//! These describe *what* to produce, not *how*. The
//! [`operations`](super::operations) module fills them in from the request and
//! hands them to the [`backend`](super::backend), which does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters applied after a downscale.
//! - [`ImageFormat`]: Formats we serve; all but GIF are decoded and re-encoded.
//! - [`ScaleParams`]: Target dimensions plus optional sharpening.

use serde::Serialize;
use std::path::Path;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening that restores edge contrast lost to downsampling.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Image formats served by the resizer. Renditions keep the source's format.
///
/// GIF is served but never resized: re-encoding would drop every frame
/// after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl ImageFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// `Content-Type` header value.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Whether renditions can be produced for this format.
    pub fn is_resizable(self) -> bool {
        !matches!(self, Self::Gif)
    }
}

/// Parameters for a proportional scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParams {
    pub width: u32,
    pub height: u32,
    pub sharpening: Option<Sharpening>,
}
