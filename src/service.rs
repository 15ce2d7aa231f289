//! Per-request resize orchestration.
//!
//! ```text
//! Validating ──► SourceTooNarrow ─────────────────────────► Emit original
//!     │
//!     └──► Selecting ──► CacheCheck ──► Hit ──────────────► Emit rendition
//!                            │
//!                            └──► Miss/Stale ──► Rendering ► Emit rendition
//! ```
//!
//! Every failure is terminal for the request and comes back as a
//! [`ResizeError`]; the HTTP layer maps it to a status code. Nothing here
//! retries, falls back to another rendition or touches the response.

use crate::breakpoints::{Selection, is_mobile_user_agent, select};
use crate::cache::{CacheError, CacheStatus, CacheStore, ensure_directory};
use crate::config::ServerConfig;
use crate::imaging::{
    BackendError, ImageBackend, ImageFormat, MAX_QUALITY, Quality, RenderParams, Sharpening,
    compression_quality, render,
};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Forbidden: {}", .0.display())]
    Forbidden(PathBuf),
    #[error("Unsupported image format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Cannot decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("Cannot encode {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
    #[error("Cache failure: {0}")]
    Cache(#[from] CacheError),
}

impl ResizeError {
    fn from_backend(path: &Path, err: BackendError) -> Self {
        let path = path.to_path_buf();
        match err {
            BackendError::Io(e) if e.kind() == io::ErrorKind::NotFound => Self::NotFound(path),
            BackendError::Io(_) => Self::Forbidden(path),
            BackendError::UnsupportedFormat(_) => Self::UnsupportedFormat(path),
            BackendError::DecodeFailed(message) => Self::Decode { path, message },
            BackendError::EncodeFailed(message) => Self::Encode { path, message },
        }
    }
}

/// An inbound image request, already stripped of HTTP framing.
#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    /// URI path, still percent-encoded, e.g. `/photos/a%20b.jpg`.
    pub path: String,
    pub viewport_hint: Option<i64>,
    pub user_agent: Option<String>,
}

/// Everything decided about a rendition before any pixels move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub source_path: PathBuf,
    /// Source directory relative to the document root.
    pub source_dir: PathBuf,
    pub file_name: String,
    pub format: ImageFormat,
    pub source_width: u32,
    pub target_width: u32,
    pub quality: Quality,
    pub cache_root: PathBuf,
    pub rendition_path: PathBuf,
}

/// Outcome of validation and selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Serve the file as-is.
    Passthrough {
        source_path: PathBuf,
        format: ImageFormat,
        selection: Option<Selection>,
    },
    /// Serve, or first produce, a rendition.
    Render {
        selection: Selection,
        request: RenderRequest,
        /// State of the rendition on disk when the plan was made.
        cache: CacheStatus,
    },
}

/// How a delivered file came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Passthrough,
    CacheHit,
    Rendered,
}

/// A file ready to be emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub disposition: Disposition,
}

/// Request orchestrator. Holds only immutable state and is shared by all
/// concurrent requests.
pub struct ResizeService<B> {
    config: Arc<ServerConfig>,
    cache: CacheStore,
    backend: B,
}

impl<B: ImageBackend> ResizeService<B> {
    pub fn new(config: Arc<ServerConfig>, backend: B) -> Self {
        let cache = CacheStore::new(config.cache_root(), config.watch_cache);
        Self {
            config,
            cache,
            backend,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Serve one request end to end.
    pub fn handle(&self, request: &ImageRequest) -> Result<Delivery, ResizeError> {
        match self.plan(request)? {
            Plan::Passthrough {
                source_path,
                format,
                ..
            } => Ok(Delivery {
                path: source_path,
                format,
                disposition: Disposition::Passthrough,
            }),
            Plan::Render { request, .. } => self.deliver(&request),
        }
    }

    /// Validate the source and select a width. Reads the cache state but
    /// never renders or creates directories.
    pub fn plan(&self, request: &ImageRequest) -> Result<Plan, ResizeError> {
        let relative = resolve_relative_path(&request.path)?;
        let source = self.config.document_root.join(&relative);
        validate_source(&source)?;
        let format = ImageFormat::from_path(&source)
            .ok_or_else(|| ResizeError::UnsupportedFormat(source.clone()))?;

        if relative.starts_with(&self.config.cache_directory_name) {
            debug!(path = %source.display(), "serving cache file directly");
            return Ok(Plan::Passthrough {
                source_path: source,
                format,
                selection: None,
            });
        }

        if !format.is_resizable() {
            debug!(path = %source.display(), ?format, "format is never resized, passing through");
            return Ok(Plan::Passthrough {
                source_path: source,
                format,
                selection: None,
            });
        }

        let source_width = self
            .backend
            .measure_width(&source)
            .map_err(|e| ResizeError::from_backend(&source, e))?;
        let is_mobile = request
            .user_agent
            .as_deref()
            .is_some_and(is_mobile_user_agent);
        let selection = select(&self.config.breakpoints, request.viewport_hint, is_mobile);

        if i64::from(source_width) < selection.max_screen_width {
            debug!(
                path = %source.display(),
                source_width,
                max_screen_width = selection.max_screen_width,
                "source narrower than viewport, passing through"
            );
            return Ok(Plan::Passthrough {
                source_path: source,
                format,
                selection: Some(selection),
            });
        }

        let request =
            self.render_request(&relative, format, source_width, selection.desired_width);
        let cache = self
            .cache
            .status(&request.source_path, &request.rendition_path);
        Ok(Plan::Render {
            selection,
            request,
            cache,
        })
    }

    /// Build the render request for `relative` at `target_width`.
    pub fn render_request(
        &self,
        relative: &Path,
        format: ImageFormat,
        source_width: u32,
        target_width: u32,
    ) -> RenderRequest {
        let source_path = self.config.document_root.join(relative);
        let source_dir = relative.parent().unwrap_or(Path::new("")).to_path_buf();
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let quality = compression_quality(
            source_width,
            self.config.breakpoints.max(),
            self.config.compression_quality_floor,
            MAX_QUALITY,
        );
        let rendition_path = self
            .cache
            .rendition_path(target_width, &source_dir, &file_name);

        RenderRequest {
            source_path,
            source_dir,
            file_name,
            format,
            source_width,
            target_width,
            quality,
            cache_root: self.cache.root().to_path_buf(),
            rendition_path,
        }
    }

    /// Serve a fresh rendition, rendering it first on a miss or when stale.
    pub fn deliver(&self, request: &RenderRequest) -> Result<Delivery, ResizeError> {
        if let Some(dir) = request.rendition_path.parent() {
            ensure_directory(dir)?;
        }

        let status = self
            .cache
            .status(&request.source_path, &request.rendition_path);
        let disposition = match status {
            CacheStatus::Fresh => {
                debug!(rendition = %request.rendition_path.display(), "cache hit");
                Disposition::CacheHit
            }
            CacheStatus::Missing | CacheStatus::Stale => {
                self.render_and_store(request, status)?;
                Disposition::Rendered
            }
        };

        Ok(Delivery {
            path: request.rendition_path.clone(),
            format: request.format,
            disposition,
        })
    }

    fn render_and_store(
        &self,
        request: &RenderRequest,
        status: CacheStatus,
    ) -> Result<(), ResizeError> {
        let started = Instant::now();
        let params = RenderParams {
            source: &request.source_path,
            format: request.format,
            target_width: request.target_width,
            ladder_max: self.config.breakpoints.max(),
            quality_floor: self.config.compression_quality_floor,
            sharpening: self.config.sharpen.then(Sharpening::light),
        };

        let rendered = render(&self.backend, &params).map_err(|e| {
            warn!(source = %request.source_path.display(), error = %e, "render failed");
            ResizeError::from_backend(&request.source_path, e)
        })?;
        self.cache.store(&request.rendition_path, &rendered.bytes)?;

        info!(
            source = %request.source_path.display(),
            rendition = %request.rendition_path.display(),
            ?status,
            width = rendered.width,
            height = rendered.height,
            quality = rendered.quality.value(),
            bytes = rendered.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered"
        );
        Ok(())
    }
}

/// Turn a request path into a path relative to the document root.
///
/// Percent-escapes are decoded first; anything other than plain names
/// (`..`, `.`, a root or a drive prefix) is refused.
pub fn resolve_relative_path(request_path: &str) -> Result<PathBuf, ResizeError> {
    let decoded = urlencoding::decode(request_path)
        .map_err(|_| ResizeError::NotFound(PathBuf::from(request_path)))?;
    let trimmed = decoded.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ResizeError::NotFound(PathBuf::from(request_path)));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return Err(ResizeError::Forbidden(PathBuf::from(trimmed))),
        }
    }
    Ok(relative)
}

/// The source must be an existing, readable regular file.
fn validate_source(source: &Path) -> Result<(), ResizeError> {
    let metadata = fs::metadata(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ResizeError::NotFound(source.to_path_buf()),
        _ => ResizeError::Forbidden(source.to_path_buf()),
    })?;
    if !metadata.is_file() {
        return Err(ResizeError::NotFound(source.to_path_buf()));
    }
    fs::File::open(source).map_err(|_| ResizeError::Forbidden(source.to_path_buf()))?;
    Ok(())
}
