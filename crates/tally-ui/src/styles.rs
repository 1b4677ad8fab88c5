//! Color styling for rollup reports.
//!
//! Uses the Ayu Dark palette. Only values that need attention get color:
//! confidence bands, skips, and overdue remaining time.

use owo_colors::OwoColorize;
use tally_core::skip::{Skip, SkipReason};

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

// Confidence bands
const CONFIDENCE_HIGH: f64 = 70.0;
const CONFIDENCE_LOW: f64 = 40.0;

pub const ICON_WARN: &str = "\u{26A0}";
pub const ICON_FAIL: &str = "\u{2716}";
pub const ICON_SKIP: &str = "-";

// Tree characters for hierarchical display
pub const TREE_CHILD: &str = "\u{251C}\u{2500} ";
pub const TREE_LAST: &str = "\u{2514}\u{2500} ";

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Core semantic render helpers
// ---------------------------------------------------------------------------

pub fn render_pass(s: &str) -> String {
    color_str(s, PASS)
}

pub fn render_warn(s: &str) -> String {
    color_str(s, WARN)
}

pub fn render_fail(s: &str) -> String {
    color_str(s, FAIL)
}

pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

/// Renders text in bold.
pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Renders a section header in uppercase with accent color and bold.
pub fn render_category(s: &str) -> String {
    color_bold_str(&s.to_uppercase(), ACCENT)
}


// ---------------------------------------------------------------------------
// Domain renderers
// ---------------------------------------------------------------------------

/// Formats an hour/point value with two decimals.
pub fn format_time(value: f64) -> String {
    format!("{value:.2}")
}

/// Renders a confidence percentage, colored by band.
pub fn render_confidence(confidence: f64) -> String {
    let text = format!("{confidence:.2}%");
    if confidence >= CONFIDENCE_HIGH {
        render_pass(&text)
    } else if confidence >= CONFIDENCE_LOW {
        render_warn(&text)
    } else {
        render_fail(&text)
    }
}

/// Renders an unestimated count, highlighted when nonzero.
pub fn render_unestimated(count: u32) -> String {
    if count == 0 {
        render_muted("0")
    } else {
        render_warn(&count.to_string())
    }
}

/// Icon for a skip record: access failures are errors, date gaps warnings.
pub fn render_skip_icon(reason: SkipReason) -> String {
    match reason {
        SkipReason::Access => color_str(ICON_FAIL, FAIL),
        SkipReason::ChildFetch => color_str(ICON_WARN, WARN),
        SkipReason::DateResolutionGap => color_str(ICON_SKIP, MUTED),
    }
}

/// One report line for a skip record.
pub fn render_skip(skip: &Skip) -> String {
    format!(
        "{} {} {}",
        render_skip_icon(skip.reason),
        render_bold(&skip.key),
        render_muted(&format!("({}) {}", skip.reason, skip.detail))
    )
}
