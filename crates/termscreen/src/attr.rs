#![forbid(unsafe_code)]

//! Text attribute enter/exit pairs and their fallback chains.
//!
//! Terminals describe standout fully but often omit dedicated sequences for
//! the other attributes. Resolution runs a three-level chain per attribute:
//!
//! ```text
//! specific pair ──(enter undefined)──▶ standout pair ──▶ empty pair
//!      │
//!      └─(exit undefined)──▶ enter + `me` ──(no `me`)──▶ enter + ""
//! ```
//!
//! Standout itself falls back to the empty pair. Underline, bold, and blink
//! fall back to the resolved standout pair.

/// Highlight attribute kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Standout,
    Underline,
    Bold,
    Blink,
}

impl AttrKind {
    pub const ALL: [Self; 4] = [Self::Standout, Self::Underline, Self::Bold, Self::Blink];
}

/// Resolved enter/exit sequences for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrPair {
    pub enter: Vec<u8>,
    pub exit: Vec<u8>,
}

impl AttrPair {
    #[must_use]
    pub fn new(enter: impl Into<Vec<u8>>, exit: impl Into<Vec<u8>>) -> Self {
        Self {
            enter: enter.into(),
            exit: exit.into(),
        }
    }
}

/// Resolve one attribute pair.
///
/// `None` means the capability is undefined. A defined but empty string is
/// still defined.
#[must_use]
pub fn resolve_pair(
    enter: Option<&[u8]>,
    exit: Option<&[u8]>,
    exit_all: Option<&[u8]>,
    fallback: &AttrPair,
) -> AttrPair {
    let Some(enter) = enter else {
        return fallback.clone();
    };
    let exit = exit.or(exit_all).unwrap_or_default();
    AttrPair::new(enter, exit)
}

/// The four resolved pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub standout: AttrPair,
    pub underline: AttrPair,
    pub bold: AttrPair,
    pub blink: AttrPair,
}

impl Attributes {
    #[must_use]
    pub fn get(&self, kind: AttrKind) -> &AttrPair {
        match kind {
            AttrKind::Standout => &self.standout,
            AttrKind::Underline => &self.underline,
            AttrKind::Bold => &self.bold,
            AttrKind::Blink => &self.blink,
        }
    }
}

/// Columns each attribute's enter/exit sequence occupies on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttrWidths {
    pub standout: u16,
    pub underline: u16,
    pub bold: u16,
    pub blink: u16,
}

impl AttrWidths {
    /// Every attribute with the same width.
    #[must_use]
    pub const fn uniform(width: u16) -> Self {
        Self {
            standout: width,
            underline: width,
            bold: width,
            blink: width,
        }
    }

    #[must_use]
    pub const fn get(&self, kind: AttrKind) -> u16 {
        match kind {
            AttrKind::Standout => self.standout,
            AttrKind::Underline => self.underline,
            AttrKind::Bold => self.bold,
            AttrKind::Blink => self.blink,
        }
    }

    /// The widest cookie of any attribute.
    #[must_use]
    pub fn widest(&self) -> u16 {
        AttrKind::ALL
            .iter()
            .map(|&kind| self.get(kind))
            .max()
            .unwrap_or(0)
    }
}
