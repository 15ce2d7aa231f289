//! Filesystem rendition cache.
//!
//! Renditions live at
//!
//! ```text
//! <cache_root>/<width>/<source relative dir>/<file name>
//! ```
//!
//! mirroring the source tree once per breakpoint. The filesystem is the whole
//! store: there is no index, no lock and no eviction.
//!
//! ## Freshness
//!
//! A rendition is fresh iff it exists and its modification time is not older
//! than its source's. A missing rendition is never fresh. With cache watching
//! turned off, existence alone counts as fresh.
//!
//! ## Concurrency
//!
//! Concurrent requests are not coordinated. Two misses for the same pair may
//! both render and both write; the last rename wins. Writes go to a temp file
//! in the target directory and are renamed into place, so readers never see a
//! partially written rendition.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cannot create cache directory {path}: {source}")]
    DirectoryCreate { path: PathBuf, source: io::Error },
    #[error("cannot write rendition {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// State of a rendition relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Stale,
    Missing,
}

/// Rendition store rooted at `<document_root>/<cache_directory_name>`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    watch: bool,
}

impl CacheStore {
    /// `watch` enables the timestamp comparison; without it any existing
    /// rendition is served.
    pub fn new(root: impl Into<PathBuf>, watch: bool) -> Self {
        Self {
            root: root.into(),
            watch,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the rendition of `relative_dir/file_name` at `width` lives.
    pub fn rendition_path(&self, width: u32, relative_dir: &Path, file_name: &str) -> PathBuf {
        rendition_path(&self.root, width, relative_dir, file_name)
    }

    /// Classify the rendition at `rendition` against `source`.
    pub fn status(&self, source: &Path, rendition: &Path) -> CacheStatus {
        if !rendition.is_file() {
            CacheStatus::Missing
        } else if !self.watch || is_fresh(source, rendition) {
            CacheStatus::Fresh
        } else {
            CacheStatus::Stale
        }
    }

    /// Persist rendition bytes. The directory must already exist; see
    /// [`ensure_directory`].
    pub fn store(&self, rendition: &Path, bytes: &[u8]) -> Result<(), CacheError> {
        write_atomic(rendition, bytes)
    }
}

/// Resolve a rendition path. Pure path arithmetic, no filesystem access.
pub fn rendition_path(
    cache_root: &Path,
    width: u32,
    relative_dir: &Path,
    file_name: &str,
) -> PathBuf {
    cache_root
        .join(width.to_string())
        .join(relative_dir)
        .join(file_name)
}

/// Create `path` and its parents.
///
/// A failed attempt is only an error if the directory still does not exist
/// afterwards; another request may have created it in between.
/// `create_dir_all` already absorbs `AlreadyExists` for each component, so
/// the recheck only matters for failures that race with a successful
/// creation elsewhere (a parent briefly missing, EEXIST on odd filesystems).
pub fn ensure_directory(path: &Path) -> Result<(), CacheError> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(source) => Err(CacheError::DirectoryCreate {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// True iff `rendition` exists and is at least as new as `source`.
pub fn is_fresh(source: &Path, rendition: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified());
    match (modified(source), modified(rendition)) {
        (Ok(source_time), Ok(rendition_time)) => rendition_time >= source_time,
        _ => false,
    }
}

/// Write via a sibling temp file and rename over `path`.
///
/// The temp file is created with the mode a plain `fs::write` would get
/// (0666 minus umask), so renditions stay readable by other users the way
/// their sources are.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let write_err = |source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = temp_file_builder().tempfile_in(dir).map_err(write_err)?;
    file.write_all(bytes).map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn temp_file_builder() -> Builder<'static, 'static> {
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder
}

/// Summary of cache outcomes across a warm-up run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub fresh: u32,
    pub rendered: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.fresh + self.rendered + self.skipped + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} fresh, {} skipped",
            self.rendered, self.fresh, self.skipped
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}
