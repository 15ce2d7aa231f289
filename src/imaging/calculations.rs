//! Pure calculation functions for rendition quality and dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Quality;

/// Upper bound of the quality scale.
pub const MAX_QUALITY: u32 = 100;

/// Pick the compression quality for an image of `current_width` pixels.
///
/// Images at least as wide as the widest breakpoint get `min_quality`; they
/// carry enough redundant detail at display size to survive hard compression.
/// Narrower images interpolate linearly towards `max_quality` as they shrink,
/// so small sources are compressed gently.
///
/// # Arguments
/// * `current_width` - Pixel width of the decoded source, before scaling
/// * `max_ladder_width` - Widest entry of the breakpoint ladder
/// * `min_quality` / `max_quality` - Bounds of the quality range
///
/// # Examples
/// ```
/// # use adaptive_images::imaging::compression_quality;
/// assert_eq!(compression_quality(2000, 1200, 85, 100).value(), 85);
/// assert_eq!(compression_quality(600, 1200, 80, 100).value(), 90);
/// ```
pub fn compression_quality(
    current_width: u32,
    max_ladder_width: u32,
    min_quality: u32,
    max_quality: u32,
) -> Quality {
    if max_ladder_width == 0 || current_width >= max_ladder_width {
        return Quality::new(min_quality);
    }
    let ratio = current_width as f64 / max_ladder_width as f64;
    let span = max_quality as f64 - min_quality as f64;
    let quality = min_quality as f64 + (1.0 - ratio) * span;
    Quality::new(quality.round().max(0.0) as u32)
}

/// Calculate output dimensions for a proportional downscale to `target_width`.
///
/// Height follows the source aspect ratio. Sources that are already at most
/// `target_width` wide keep their dimensions; we never upscale.
///
/// # Returns
/// * `(width, height)` - Output dimensions, height at least 1
pub fn scaled_dimensions(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w <= target_width || src_w == 0 {
        return source;
    }
    let ratio = target_width as f64 / src_w as f64;
    let height = (src_h as f64 * ratio).round().max(1.0) as u32;
    (target_width, height)
}
