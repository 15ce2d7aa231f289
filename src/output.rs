//! CLI output formatting.
//!
//! Each command has a `format_*` function returning `Vec<String>` for
//! testability and, where useful, a `print_*` wrapper that writes to stdout.
//! Format functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Warm
//!
//! ```text
//! photos/dawn.jpg (2400px)
//!     1200px: rendered
//!     992px: fresh
//!     320px: fresh
//! icons/logo.png (300px)
//!     1200px: skipped
//!     ...
//! corrupt.jpg
//!     failed: Decode failed: ...
//!
//! Warmed 3 images: 4 rendered, 2 fresh, 5 skipped, 1 failed (12 total)
//! ```
//!
//! ## Check
//!
//! ```text
//! Document root: public
//! Cache:         public/cache
//! Breakpoints:   1200, 992, 768, 480, 320
//! Quality:       85-100
//! Browser cache: 604800s
//! Sharpen:       on
//! Watch cache:   on
//! Cookie:        resolution
//! Listen:        127.0.0.1:8080
//! ```

use crate::config::ServerConfig;
use crate::imaging::MAX_QUALITY;
use crate::warm::{WarmEvent, WarmReport, WidthStatus};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

// ============================================================================
// Warm
// ============================================================================

/// Format one warmed image: a header line plus one line per breakpoint.
pub fn format_warm_event(event: &WarmEvent) -> Vec<String> {
    match event {
        WarmEvent::ImageWarmed {
            source,
            source_width,
            widths,
        } => {
            let mut lines = vec![format!("{} ({}px)", source.display(), source_width)];
            for outcome in widths {
                let status = match &outcome.status {
                    WidthStatus::Fresh => "fresh".to_string(),
                    WidthStatus::Rendered => "rendered".to_string(),
                    WidthStatus::Skipped => "skipped".to_string(),
                    WidthStatus::Failed(message) => format!("failed: {message}"),
                };
                lines.push(format!("{}{}px: {}", indent(1), outcome.width, status));
            }
            lines
        }
        WarmEvent::ImageFailed { source, message } => vec![
            source.display().to_string(),
            format!("{}failed: {}", indent(1), message),
        ],
    }
}

/// Closing summary line of a warm run.
pub fn format_warm_summary(report: &WarmReport) -> String {
    let noun = if report.images == 1 { "image" } else { "images" };
    format!("Warmed {} {}: {}", report.images, noun, report.stats)
}

// ============================================================================
// Check
// ============================================================================

/// Resolved configuration, one aligned line per setting.
pub fn format_config(config: &ServerConfig) -> Vec<String> {
    let breakpoints = config
        .breakpoints
        .widths()
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        format!("Document root: {}", config.document_root.display()),
        format!("Cache:         {}", config.cache_root().display()),
        format!("Breakpoints:   {}", breakpoints),
        format!(
            "Quality:       {}-{}",
            config.compression_quality_floor, MAX_QUALITY
        ),
        format!("Browser cache: {}s", config.browser_cache_seconds),
        format!("Sharpen:       {}", on_off(config.sharpen)),
        format!("Watch cache:   {}", on_off(config.watch_cache)),
        format!("Cookie:        {}", config.viewport_cookie),
        format!("Listen:        {}", config.server.listen),
    ]
}

pub fn print_config(config: &ServerConfig) {
    for line in format_config(config) {
        println!("{}", line);
    }
}
