//! Image processing in pure Rust, on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Measure** | `image::image_dimensions` |
//! | **Decode** | `image::ImageReader` |
//! | **Scale** | Lanczos3 + optional `unsharpen` |
//! | **Encode** | JPEG (quality-driven), PNG, lossless WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for quality and dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`render`], which drives a backend through one rendition

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{MAX_QUALITY, compression_quality, scaled_dimensions};
pub use operations::{RenderParams, RenderedImage, render};
pub use params::{ImageFormat, Quality, ScaleParams, Sharpening};
pub use rust_backend::RustBackend;
