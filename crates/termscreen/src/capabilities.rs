#![forbid(unsafe_code)]

//! Resolved terminal capabilities.
//!
//! [`TerminalCapabilities`] is the immutable result of capability
//! resolution: geometry, behaviour flags, attribute cookie widths, and every
//! control string the screen primitives emit. It is built once per session
//! by [`resolve`](crate::resolver::resolve) and shared by reference with the
//! dispatcher and the key-table builder.
//!
//! # Invariants
//!
//! 1. `geometry.width > 0 && geometry.height > 0`.
//! 2. Every control string is a valid, possibly empty byte sequence. An empty
//!    string means "nothing to send"; a capability that had to be replaced by
//!    a fallback is recorded in [`missing`](TerminalCapabilities::missing).
//! 3. `no_back_scroll` is set exactly when `add_line` is empty.
//!
//! # Profiles
//!
//! | Constructor | Source |
//! |-------------|--------|
//! | [`resolve`](crate::resolver::resolve) | terminfo database + overrides |
//! | [`TerminalCapabilities::hardcopy`] | no usable description |
//! | [`TerminalCapabilities::debug`] | readable placeholder strings |
//! | [`TerminalCapabilities::console`] | direct console calls, no strings |

use bitflags::bitflags;

use crate::attr::{AttrPair, AttrWidths, Attributes};
use crate::cost::Padding;

/// Screen dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    /// Fallback dimensions for terminals that report none.
    pub const DEFAULT: Self = Self::new(80, 24);
    /// Fallback dimensions on the direct console, whose default text mode is
    /// 25 rows.
    pub const CONSOLE_DEFAULT: Self = Self::new(80, 25);

    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

bitflags! {
    /// Operationally required capabilities that were replaced by a fallback.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Missing: u8 {
        /// `ce` undefined; clear-to-eol sends nothing.
        const CLEAR_EOL = 1 << 0;
        /// `cd` undefined on a terminal that retains content below.
        const CLEAR_EOS = 1 << 1;
        /// `cl` undefined; clearing scrolls two blank lines instead.
        const CLEAR_SCREEN = 1 << 2;
        /// Neither `ho` nor `cm`.
        const HOME = 1 << 3;
        /// Neither `ll` nor `cm`.
        const LOWER_LEFT = 1 << 4;
        /// Neither `al` nor `sr`.
        const ADD_LINE = 1 << 5;
    }
}

/// Where a capability set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapSource {
    /// Host terminal description, possibly with overrides.
    Database,
    /// No usable description; only overrides apply.
    Hardcopy,
    /// Placeholder strings for tracing renderer output.
    Debug,
    /// Operations are performed through console calls.
    Console,
}

/// Escape sequences reported by special keys, as the terminal describes
/// them. `None` when the key is undefined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStrings {
    pub right: Option<Vec<u8>>,
    pub left: Option<Vec<u8>>,
    pub up: Option<Vec<u8>>,
    pub down: Option<Vec<u8>>,
    pub page_up: Option<Vec<u8>>,
    pub page_down: Option<Vec<u8>>,
    pub home: Option<Vec<u8>>,
    pub end: Option<Vec<u8>>,
    pub delete: Option<Vec<u8>>,
    pub back_tab: Option<Vec<u8>>,
}

/// Immutable, fully resolved capability set for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCapabilities {
    /// Terminal name the set was resolved for.
    pub term: String,
    pub source: CapSource,
    pub geometry: Geometry,

    /// Writing the last column wraps to the next line (`am`).
    pub auto_wrap: bool,
    /// A newline right after an automatic wrap is ignored (`xn`).
    pub ignore_wrap_newline: bool,
    /// Content scrolled off the top may come back (`da`).
    pub memory_above: bool,
    /// Content scrolled off the bottom may come back (`db`).
    pub memory_below: bool,
    /// The cursor can be addressed directly.
    pub can_goto_line: bool,

    pub attr_widths: AttrWidths,
    pub attributes: Attributes,

    pub home: Vec<u8>,
    pub lower_left: Vec<u8>,
    pub add_line: Vec<u8>,
    pub clear: Vec<u8>,
    pub clear_eol: Vec<u8>,
    pub clear_eos: Vec<u8>,
    /// Parameterized cursor address template (row, column).
    pub cursor_move: Vec<u8>,
    pub visual_bell: Vec<u8>,
    pub backspace: Vec<u8>,
    pub keypad_on: Vec<u8>,
    pub keypad_off: Vec<u8>,
    pub init: Vec<u8>,
    pub deinit: Vec<u8>,
    /// Raw `ll`, kept so lower-left can be re-chosen after a resize.
    pub cursor_to_ll: Vec<u8>,

    pub keys: KeyStrings,
    pub padding: Padding,

    pub missing: Missing,
    /// Backward scrolling must repaint; no way to insert a top line.
    pub no_back_scroll: bool,
    /// Search matches may be highlighted without corrupting column math.
    pub search_highlight: bool,
}

/// Expand a cursor address template for (row, column), both zero based.
///
/// Expansion failures yield an empty sequence, which callers treat like an
/// undefined capability.
#[must_use]
pub fn cursor_to(template: &[u8], row: u16, col: u16) -> Vec<u8> {
    if template.is_empty() {
        return Vec::new();
    }
    match terminfo::expand!(template; i32::from(row), i32::from(col)) {
        Ok(seq) => seq,
        Err(err) => {
            tracing::warn!(row, col, error = %err, "cursor address expansion failed");
            Vec::new()
        }
    }
}

impl TerminalCapabilities {
    /// Capability set for a terminal with no usable description.
    ///
    /// Only the built-in fallbacks remain: clear scrolls with newlines,
    /// home and lower-left are approximations, and nothing can be inserted at
    /// the top.
    #[must_use]
    pub fn hardcopy(term: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            term: term.into(),
            source: CapSource::Hardcopy,
            geometry,
            auto_wrap: false,
            ignore_wrap_newline: false,
            memory_above: false,
            memory_below: false,
            can_goto_line: false,
            attr_widths: AttrWidths::default(),
            attributes: Attributes::default(),
            home: b"|\x08^".to_vec(),
            lower_left: b"\r".to_vec(),
            add_line: Vec::new(),
            clear: b"\n\n".to_vec(),
            clear_eol: Vec::new(),
            clear_eos: Vec::new(),
            cursor_move: Vec::new(),
            visual_bell: Vec::new(),
            backspace: b"\x08".to_vec(),
            keypad_on: Vec::new(),
            keypad_off: Vec::new(),
            init: Vec::new(),
            deinit: Vec::new(),
            cursor_to_ll: Vec::new(),
            keys: KeyStrings::default(),
            padding: Padding::NONE,
            missing: Missing::CLEAR_EOL
                | Missing::CLEAR_SCREEN
                | Missing::HOME
                | Missing::LOWER_LEFT
                | Missing::ADD_LINE,
            no_back_scroll: true,
            search_highlight: true,
        }
    }

    /// Placeholder profile: every sequence is a readable tag such as
    /// `(ClearEOL)`, so captured renderer output can be inspected.
    #[must_use]
    pub fn debug(term: impl Into<String>, geometry: Geometry) -> Self {
        let tag = |s: &str| s.as_bytes().to_vec();
        Self {
            term: term.into(),
            source: CapSource::Debug,
            geometry,
            auto_wrap: true,
            ignore_wrap_newline: true,
            memory_above: false,
            memory_below: false,
            can_goto_line: true,
            attr_widths: AttrWidths::default(),
            attributes: Attributes {
                standout: AttrPair::new(tag("(SO+)"), tag("(SO-)")),
                underline: AttrPair::new(tag("(UL+)"), tag("(UL-)")),
                bold: AttrPair::new(tag("(BO+)"), tag("(BO-)")),
                blink: AttrPair::new(tag("(BL+)"), tag("(BL-)")),
            },
            home: tag("(Home)"),
            lower_left: tag("(LL)"),
            add_line: tag("(AddLine)"),
            clear: tag("(ClearScreen)"),
            clear_eol: tag("(ClearEOL)"),
            clear_eos: tag("(ClearEOS)"),
            cursor_move: tag("(Move<%p1%d,%p2%d>)"),
            visual_bell: tag("(VBell)"),
            backspace: tag("(BS)"),
            keypad_on: tag("(InitKey)"),
            keypad_off: tag("(DeinitKey)"),
            init: tag("(InitTerm)"),
            deinit: tag("(DeinitTerm)"),
            cursor_to_ll: tag("(LL)"),
            keys: KeyStrings::default(),
            padding: Padding::NONE,
            missing: Missing::empty(),
            no_back_scroll: false,
            search_highlight: true,
        }
    }

    /// Profile for the direct console. Control strings stay empty; the
    /// dispatcher performs each operation through console calls.
    #[must_use]
    pub fn console(geometry: Geometry) -> Self {
        Self {
            term: "console".to_owned(),
            source: CapSource::Console,
            geometry,
            auto_wrap: true,
            ignore_wrap_newline: false,
            memory_above: false,
            memory_below: false,
            can_goto_line: true,
            attr_widths: AttrWidths::default(),
            attributes: Attributes::default(),
            home: Vec::new(),
            lower_left: Vec::new(),
            add_line: Vec::new(),
            clear: Vec::new(),
            clear_eol: Vec::new(),
            clear_eos: Vec::new(),
            cursor_move: Vec::new(),
            visual_bell: Vec::new(),
            backspace: b"\x08".to_vec(),
            keypad_on: Vec::new(),
            keypad_off: Vec::new(),
            init: Vec::new(),
            deinit: Vec::new(),
            cursor_to_ll: Vec::new(),
            keys: KeyStrings::default(),
            padding: Padding::NONE,
            missing: Missing::empty(),
            no_back_scroll: false,
            search_highlight: true,
        }
    }

    /// Whether any required capability was replaced by a fallback.
    #[must_use]
    pub fn missing_cap(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Width in columns.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.geometry.width
    }

    /// Height in rows.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.geometry.height
    }

    /// Cursor address sequence for `line` (zero based), column 0.
    #[must_use]
    pub fn goto_line_sequence(&self, line: u16) -> Vec<u8> {
        cursor_to(&self.cursor_move, line, 0)
    }

    /// The same capabilities on a resized screen.
    ///
    /// Only geometry-dependent strings are recomputed; nothing is re-read
    /// from the database.
    #[must_use]
    pub fn resized(&self, geometry: Geometry) -> Self {
        let mut next = self.clone();
        next.geometry = geometry;
        if self.source == CapSource::Database {
            let via_move = cursor_to(&self.cursor_move, geometry.height.saturating_sub(1), 0);
            let pick = crate::cost::select_cheaper(
                &self.cursor_to_ll,
                &via_move,
                b"\r",
                geometry.height,
                &self.padding,
            );
            next.lower_left = pick.bytes().to_vec();
            next.missing.set(Missing::LOWER_LEFT, pick.is_default());
        }
        tracing::debug!(
            width = geometry.width,
            height = geometry.height,
            "capabilities resized"
        );
        next
    }
}
