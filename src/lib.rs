//! # Adaptive Images
//!
//! Serves device-appropriate, size-reduced copies of raster images and keeps
//! every resized copy on disk so the same (image, width) pair is encoded at
//! most once per source change.
//!
//! # Request Lifecycle
//!
//! ```text
//! GET /photos/dawn.jpg  + Cookie: resolution=1024 + User-Agent
//!   1. Validate   source exists, is a readable file, has a supported extension
//!   2. Select     widest breakpoint ≤ viewport (narrowest if none fits)
//!   3. Cache      <root>/cache/<width>/photos/dawn.jpg fresh? serve it
//!   4. Render     decode → strip → scale → encode at width-dependent quality
//!   5. Emit       Content-Type, Cache-Control, Expires, Content-Length + bytes
//! ```
//!
//! Sources narrower than the viewport skip steps 3 and 4 and are served as-is.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`breakpoints`] | Breakpoint ladder, width selection, device classification, viewport cookie |
//! | [`imaging`] | Quality policy, the `ImageBackend` capability and the renderer built on it |
//! | [`cache`] | Rendition paths, freshness checks and atomic writes |
//! | [`service`] | Per-request orchestration: validate, select, hit or render |
//! | [`response`] | Caching headers, status codes and error bodies |
//! | [`server`] | axum entry point running the service on the blocking pool |
//! | [`config`] | `config.toml` loading and validation |
//! | [`warm`] | Pre-rendering every breakpoint ahead of traffic |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## The Filesystem Is the Cache
//!
//! Renditions mirror the source tree under one directory per breakpoint. There
//! is no index to rebuild, no lock to contend on and nothing to lose on
//! restart: deleting the cache directory is a full reset, and any web server
//! can serve renditions directly if it wants to.
//!
//! ## Breakpoints, Not Exact Widths
//!
//! Clients only ever receive one of a handful of widths. A phone at 375px and
//! one at 390px share the 320px rendition, which keeps the cache small and the
//! hit rate high.
//!
//! ## Uncoordinated Concurrency
//!
//! Concurrent misses for the same rendition may both render it. Both produce
//! the same bytes and writes are renamed into place, so the last writer wins
//! and readers never observe a partial file.

pub mod breakpoints;
pub mod cache;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod response;
pub mod server;
pub mod service;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
