//! Breakpoint selection.
//!
//! Maps a client's viewport hint onto a fixed ladder of rendition widths.
//! Everything here is pure: no I/O, no clock, never an error. The worst case
//! is the narrowest breakpoint.
//!
//! ```text
//! hint present      → max_screen_width = hint
//! hint absent       → max_screen_width = min(ladder) on mobile, max(ladder) otherwise
//! desired_width     = widest breakpoint ≤ max_screen_width, else min(ladder)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stock breakpoints, widest first.
pub const DEFAULT_BREAKPOINTS: [u32; 5] = [1200, 992, 768, 480, 320];

/// Case-insensitive user-agent fragments that identify handheld devices.
const MOBILE_TOKENS: &[&str] = &[
    "android",
    "blackberry",
    "iphone",
    "ipod",
    "ipad",
    "opera mini",
    "opera mobi",
    "iemobile",
    "windows phone",
    "palm",
    "webos",
    "kindle",
    "silk",
    "symbian",
    "nokia",
    "fennec",
    "maemo",
    "meego",
    "playbook",
    "tablet",
    "mobile",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LadderError {
    #[error("breakpoints must not be empty")]
    Empty,
    #[error("breakpoints must be positive widths, got 0")]
    ZeroWidth,
}

/// Ordered, non-empty set of positive rendition widths.
///
/// Order is preserved as configured (widest first by convention) but no
/// operation depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct BreakpointLadder(Vec<u32>);

impl BreakpointLadder {
    pub fn new(widths: Vec<u32>) -> Result<Self, LadderError> {
        if widths.is_empty() {
            return Err(LadderError::Empty);
        }
        if widths.contains(&0) {
            return Err(LadderError::ZeroWidth);
        }
        Ok(Self(widths))
    }

    pub fn widths(&self) -> &[u32] {
        &self.0
    }

    pub fn min(&self) -> u32 {
        self.0.iter().copied().min().unwrap_or_default()
    }

    pub fn max(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or_default()
    }
}

impl Default for BreakpointLadder {
    fn default() -> Self {
        Self(DEFAULT_BREAKPOINTS.to_vec())
    }
}

impl TryFrom<Vec<u32>> for BreakpointLadder {
    type Error = LadderError;

    fn try_from(widths: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(widths)
    }
}

impl From<BreakpointLadder> for Vec<u32> {
    fn from(ladder: BreakpointLadder) -> Self {
        ladder.0
    }
}

/// Outcome of a breakpoint selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Effective viewport width. Sources narrower than this pass through.
    pub max_screen_width: i64,
    /// Breakpoint the rendition is rendered at.
    pub desired_width: u32,
}

/// Select the rendition width for a viewport hint.
pub fn select(ladder: &BreakpointLadder, hint: Option<i64>, is_mobile: bool) -> Selection {
    let max_screen_width = match hint {
        Some(width) => width,
        None if is_mobile => i64::from(ladder.min()),
        None => i64::from(ladder.max()),
    };

    let desired_width = ladder
        .widths()
        .iter()
        .copied()
        .filter(|&w| i64::from(w) <= max_screen_width)
        .max()
        .unwrap_or_else(|| ladder.min());

    Selection {
        max_screen_width,
        desired_width,
    }
}

/// Whether a user-agent string belongs to a phone or tablet.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_TOKENS.iter().any(|token| ua.contains(token))
}

/// Parse the viewport cookie value: `"<width>"` or `"<width>,<density>"`.
///
/// The width is coerced loosely: leading whitespace, an optional sign and the
/// leading digits count, anything else makes it 0. A pixel density above 1
/// multiplies the width so high-DPI screens get the sharper breakpoint.
pub fn parse_viewport_cookie(value: &str) -> i64 {
    let (width, density) = match value.split_once(',') {
        Some((width, density)) => (width, Some(density)),
        None => (value, None),
    };
    let width = loose_integer(width);

    let density = density
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 1.0);

    match density {
        Some(d) => (width as f64 * d).round() as i64,
        None => width,
    }
}

fn loose_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
    if negative { -magnitude } else { magnitude }
}
