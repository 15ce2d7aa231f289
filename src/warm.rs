//! Cache warming.
//!
//! Pre-renders every rendition a client could ask for, so the first visitor
//! at each breakpoint does not pay for the encode. Walks the document root
//! (skipping the cache itself), and for each supported image renders every
//! breakpoint that is not wider than the source. Wider breakpoints are
//! skipped: requests for them pass the original through.
//!
//! Renditions go through [`ResizeService::deliver`], so warming and serving
//! share paths, freshness rules and quality policy. Fresh renditions are
//! left alone. Images are processed in parallel with rayon.

use crate::cache::CacheStats;
use crate::imaging::{ImageBackend, ImageFormat};
use crate::service::{Disposition, ResizeService};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WarmError {
    #[error("Cannot walk document root: {0}")]
    Walk(#[from] walkdir::Error),
}

/// What happened to one breakpoint of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidthStatus {
    Fresh,
    Rendered,
    /// Breakpoint wider than the source.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthOutcome {
    pub width: u32,
    pub status: WidthStatus,
}

/// Per-image progress, sent as each image completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmEvent {
    ImageWarmed {
        /// Path relative to the document root.
        source: PathBuf,
        source_width: u32,
        widths: Vec<WidthOutcome>,
    },
    ImageFailed {
        source: PathBuf,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmReport {
    pub images: usize,
    pub stats: CacheStats,
}

/// Resizable images under the document root, relative to it, sorted.
pub fn discover_sources(
    document_root: &Path,
    cache_root: &Path,
) -> Result<Vec<PathBuf>, WarmError> {
    let mut sources = Vec::new();
    let walker = WalkDir::new(document_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != cache_root);

    for entry in walker {
        let entry = entry?;
        let format = ImageFormat::from_path(entry.path());
        if !entry.file_type().is_file() || !format.is_some_and(ImageFormat::is_resizable) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(document_root) {
            sources.push(relative.to_path_buf());
        }
    }
    Ok(sources)
}

/// Warm the cache for every image under the service's document root.
pub fn warm<B: ImageBackend>(
    service: &ResizeService<B>,
    events: Option<Sender<WarmEvent>>,
) -> Result<WarmReport, WarmError> {
    let config = service.config();
    let sources = discover_sources(&config.document_root, service.cache().root())?;
    debug!(count = sources.len(), "warming cache");

    let events: Vec<WarmEvent> = sources
        .par_iter()
        .map_with(events, |tx, relative| {
            let event = warm_image(service, relative);
            if let Some(tx) = tx {
                tx.send(event.clone()).ok();
            }
            event
        })
        .collect();

    let mut stats = CacheStats::default();
    for event in &events {
        match event {
            WarmEvent::ImageWarmed { widths, .. } => {
                for outcome in widths {
                    match outcome.status {
                        WidthStatus::Fresh => stats.fresh += 1,
                        WidthStatus::Rendered => stats.rendered += 1,
                        WidthStatus::Skipped => stats.skipped += 1,
                        WidthStatus::Failed(_) => stats.failed += 1,
                    }
                }
            }
            WarmEvent::ImageFailed { .. } => stats.failed += 1,
        }
    }

    Ok(WarmReport {
        images: events.len(),
        stats,
    })
}

fn warm_image<B: ImageBackend>(service: &ResizeService<B>, relative: &Path) -> WarmEvent {
    let source_path = service.config().document_root.join(relative);
    let format = ImageFormat::from_path(relative);
    let Some(format) = format.filter(|f| f.is_resizable()) else {
        return WarmEvent::ImageFailed {
            source: relative.to_path_buf(),
            message: "unsupported format".to_string(),
        };
    };
    let source_width = match service.backend().measure_width(&source_path) {
        Ok(width) => width,
        Err(e) => {
            warn!(source = %source_path.display(), error = %e, "cannot measure source");
            return WarmEvent::ImageFailed {
                source: relative.to_path_buf(),
                message: e.to_string(),
            };
        }
    };

    let mut ladder = service.config().breakpoints.widths().to_vec();
    ladder.sort_unstable_by(|a, b| b.cmp(a));
    ladder.dedup();

    let widths = ladder
        .into_iter()
        .map(|width| {
            if width > source_width {
                return WidthOutcome {
                    width,
                    status: WidthStatus::Skipped,
                };
            }
            let request = service.render_request(relative, format, source_width, width);
            let status = match service.deliver(&request) {
                Ok(delivery) if delivery.disposition == Disposition::CacheHit => WidthStatus::Fresh,
                Ok(_) => WidthStatus::Rendered,
                Err(e) => WidthStatus::Failed(e.to_string()),
            };
            WidthOutcome { width, status }
        })
        .collect();

    WarmEvent::ImageWarmed {
        source: relative.to_path_buf(),
        source_width,
        widths,
    }
}
