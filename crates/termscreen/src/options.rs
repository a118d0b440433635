#![forbid(unsafe_code)]

//! Session policy knobs.
//!
//! Everything the resolver, dispatcher, and session guard treat as a choice
//! rather than a fact about the terminal lives in [`ScreenOptions`].
//!
//! # Example
//!
//! ```
//! use termscreen::options::{HighlightPolicy, Quiet, ScreenOptions};
//!
//! let opts = ScreenOptions {
//!     quiet: Quiet::VeryQuiet,
//!     highlight: HighlightPolicy::Always,
//!     ..Default::default()
//! };
//! assert!(!opts.no_init);
//! ```

/// Environment variable prefix for per-capability overrides.
pub const DEFAULT_OVERRIDE_PREFIX: &str = "LESS_TERMCAP_";

/// Terminal name used when `TERM` is unset.
#[cfg(not(windows))]
pub const DEFAULT_TERM: &str = "unknown";
#[cfg(windows)]
pub const DEFAULT_TERM: &str = "ansi";

/// How the bell primitive behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quiet {
    /// Ring the audible bell.
    #[default]
    Normal,
    /// The pager suppresses bells itself; the primitive still rings.
    Quiet,
    /// Flash the screen instead, when the terminal can.
    VeryQuiet,
}

/// Whether search-match highlighting is safe on this terminal.
///
/// Terminals where entering or leaving an attribute occupies screen columns
/// ("magic cookie" terminals) desynchronize the renderer's column tracking.
/// How wide a cookie has to be before that matters depends on the terminal,
/// so the threshold is policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightPolicy {
    /// Highlight regardless of attribute widths.
    Always,
    /// Disable highlighting when any attribute is wider than this many columns.
    MaxCookieWidth(u16),
}

impl Default for HighlightPolicy {
    fn default() -> Self {
        Self::MaxCookieWidth(0)
    }
}

impl HighlightPolicy {
    /// Apply the policy to the widest attribute cookie of a terminal.
    #[must_use]
    pub const fn allows(self, widest_cookie: u16) -> bool {
        match self {
            Self::Always => true,
            Self::MaxCookieWidth(max) => widest_cookie <= max,
        }
    }
}

/// CGA palette index pair (foreground, background).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub fg: u8,
    pub bg: u8,
}

impl ColorPair {
    #[must_use]
    pub const fn new(fg: u8, bg: u8) -> Self {
        Self { fg, bg }
    }
}

/// Colors the direct-console path uses in place of attribute sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleColors {
    pub normal: ColorPair,
    pub bold: ColorPair,
    pub underline: ColorPair,
    pub standout: ColorPair,
    pub blink: ColorPair,
}

impl Default for ConsoleColors {
    fn default() -> Self {
        Self {
            normal: ColorPair::new(7, 0),
            bold: ColorPair::new(15, 0),
            underline: ColorPair::new(9, 0),
            standout: ColorPair::new(0, 7),
            blink: ColorPair::new(12, 0),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ScreenOptions {
    /// Prefix of the per-capability override variables (`<prefix><code>`).
    pub override_prefix: String,
    /// Terminal name assumed when `TERM` is unset or empty.
    pub default_term: String,
    /// Skip the terminal init/deinit and keypad sequences.
    pub no_init: bool,
    /// Bell behaviour.
    pub quiet: Quiet,
    /// Search highlight safety threshold.
    pub highlight: HighlightPolicy,
    /// Console palette (direct-console output only).
    pub console_colors: ConsoleColors,
    /// Register SIGINT/SIGTERM/SIGWINCH handling for the session.
    pub handle_signals: bool,
    /// Terminal names starting with this prefix get placeholder sequences
    /// that make renderer output readable.
    pub debug_term_prefix: Option<String>,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            override_prefix: DEFAULT_OVERRIDE_PREFIX.to_owned(),
            default_term: DEFAULT_TERM.to_owned(),
            no_init: false,
            quiet: Quiet::Normal,
            highlight: HighlightPolicy::default(),
            console_colors: ConsoleColors::default(),
            handle_signals: true,
            debug_term_prefix: None,
        }
    }
}

impl ScreenOptions {
    /// Whether `term` selects the debug profile.
    #[must_use]
    pub fn is_debug_term(&self, term: &str) -> bool {
        self.debug_term_prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.is_empty() && term.starts_with(prefix))
    }
}
