//! Shared test utilities: synthetic images and throwaway document roots.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let root = DocumentRoot::new();
//! let source = root.write("photos/a.jpg", b"bytes");
//! let config = root.config();
//! ```

use crate::config::ServerConfig;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Write a small valid JPEG with a gradient so encoders have real work to do.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid RGBA PNG.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, ((x + y) % 256) as u8])
    });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Backdate a file's modification time.
pub fn age_file(path: &Path, by: Duration) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - by)
        .unwrap();
}

/// A temporary document root. Dropped with the test.
pub struct DocumentRoot {
    tmp: TempDir,
}

impl DocumentRoot {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    /// Write raw bytes at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.tmp.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Stock config pointed at this root.
    pub fn config(&self) -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            document_root: self.tmp.path().to_path_buf(),
            ..ServerConfig::default()
        })
    }

    /// Every file under the cache directory, relative to it.
    pub fn cached_files(&self) -> Vec<PathBuf> {
        let cache = self.tmp.path().join("cache");
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&cache)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(&cache).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }
}
