#![forbid(unsafe_code)]

//! Host capability database access.
//!
//! The resolver never talks to terminfo directly. It goes through
//! [`CapabilityDatabase`], which the compiled-terminfo backend
//! ([`TerminfoDatabase`]) implements and tests can implement with fixed
//! tables.
//!
//! Every capability the crate reads is named by a [`Cap`]: the two-letter
//! termcap code (which is what override variables are keyed on, e.g.
//! `LESS_TERMCAP_md`) and the terminfo long name the database is queried by.

use std::fmt;

use terminfo::Value;

/// A named terminal capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cap {
    /// Two-letter termcap code.
    pub code: &'static str,
    /// Terminfo long name.
    pub name: &'static str,
}

impl Cap {
    #[must_use]
    pub const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }
}

impl fmt::Display for Cap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// Capabilities consulted during resolution.
pub mod caps {
    use super::Cap;

    // Flags
    pub const AUTO_WRAP: Cap = Cap::new("am", "auto_right_margin");
    pub const IGNORE_WRAP_NEWLINE: Cap = Cap::new("xn", "eat_newline_glitch");
    pub const MEMORY_ABOVE: Cap = Cap::new("da", "memory_above");
    pub const MEMORY_BELOW: Cap = Cap::new("db", "memory_below");
    pub const HARDCOPY: Cap = Cap::new("hc", "hard_copy");
    pub const BACKSPACES_WITH_BS: Cap = Cap::new("bs", "backspaces_with_bs");
    pub const NO_PAD_CHAR: Cap = Cap::new("NP", "no_pad_char");

    // Numbers
    pub const LINES: Cap = Cap::new("li", "lines");
    pub const COLUMNS: Cap = Cap::new("co", "columns");
    pub const COOKIE_WIDTH: Cap = Cap::new("sg", "magic_cookie_glitch");
    pub const PADDING_BAUD: Cap = Cap::new("pb", "padding_baud_rate");

    // Strings
    pub const PAD_CHAR: Cap = Cap::new("pc", "pad_char");
    pub const KEYPAD_XMIT: Cap = Cap::new("ks", "keypad_xmit");
    pub const KEYPAD_LOCAL: Cap = Cap::new("ke", "keypad_local");
    pub const ENTER_CA: Cap = Cap::new("ti", "enter_ca_mode");
    pub const EXIT_CA: Cap = Cap::new("te", "exit_ca_mode");
    pub const CLR_EOL: Cap = Cap::new("ce", "clr_eol");
    pub const CLR_EOS: Cap = Cap::new("cd", "clr_eos");
    pub const CLEAR_SCREEN: Cap = Cap::new("cl", "clear_screen");
    pub const CURSOR_ADDRESS: Cap = Cap::new("cm", "cursor_address");
    pub const CURSOR_HOME: Cap = Cap::new("ho", "cursor_home");
    pub const CURSOR_TO_LL: Cap = Cap::new("ll", "cursor_to_ll");
    pub const INSERT_LINE: Cap = Cap::new("al", "insert_line");
    pub const SCROLL_REVERSE: Cap = Cap::new("sr", "scroll_reverse");
    pub const ENTER_STANDOUT: Cap = Cap::new("so", "enter_standout_mode");
    pub const EXIT_STANDOUT: Cap = Cap::new("se", "exit_standout_mode");
    pub const ENTER_UNDERLINE: Cap = Cap::new("us", "enter_underline_mode");
    pub const EXIT_UNDERLINE: Cap = Cap::new("ue", "exit_underline_mode");
    pub const ENTER_BOLD: Cap = Cap::new("md", "enter_bold_mode");
    pub const ENTER_BLINK: Cap = Cap::new("mb", "enter_blink_mode");
    pub const EXIT_ATTRIBUTES: Cap = Cap::new("me", "exit_attribute_mode");
    pub const FLASH_SCREEN: Cap = Cap::new("vb", "flash_screen");
    pub const BACKSPACE_CHAR: Cap = Cap::new("bc", "backspace_if_not_bs");

    // Keys
    pub const KEY_RIGHT: Cap = Cap::new("kr", "key_right");
    pub const KEY_LEFT: Cap = Cap::new("kl", "key_left");
    pub const KEY_UP: Cap = Cap::new("ku", "key_up");
    pub const KEY_DOWN: Cap = Cap::new("kd", "key_down");
    pub const KEY_PPAGE: Cap = Cap::new("kP", "key_ppage");
    pub const KEY_NPAGE: Cap = Cap::new("kN", "key_npage");
    pub const KEY_HOME: Cap = Cap::new("kh", "key_home");
    pub const KEY_END: Cap = Cap::new("@7", "key_end");
    pub const KEY_DELETE: Cap = Cap::new("kD", "key_dc");
    pub const KEY_BACKTAB: Cap = Cap::new("kB", "key_btab");
}

/// Read access to a terminal description.
pub trait CapabilityDatabase {
    /// Canonical name of the described terminal.
    fn terminal_name(&self) -> &str;

    /// Whether a boolean capability is present.
    fn flag(&self, cap: Cap) -> bool;

    /// A numeric capability, if defined.
    fn number(&self, cap: Cap) -> Option<i32>;

    /// A string capability, if defined.
    fn string(&self, cap: Cap) -> Option<&[u8]>;
}

/// Compiled terminfo description.
#[derive(Debug)]
pub struct TerminfoDatabase {
    inner: terminfo::Database,
}

impl TerminfoDatabase {
    /// Load the description for `term` from the host terminfo directories.
    ///
    /// Returns `None` when no entry exists (or it cannot be parsed); the
    /// caller treats that as a hardcopy terminal.
    #[must_use]
    pub fn load(term: &str) -> Option<Self> {
        match terminfo::Database::from_name(term) {
            Ok(inner) => Some(Self { inner }),
            Err(err) => {
                tracing::debug!(term, error = %err, "no terminfo entry");
                None
            }
        }
    }
}

impl From<terminfo::Database> for TerminfoDatabase {
    fn from(inner: terminfo::Database) -> Self {
        Self { inner }
    }
}

impl CapabilityDatabase for TerminfoDatabase {
    fn terminal_name(&self) -> &str {
        self.inner.name()
    }

    fn flag(&self, cap: Cap) -> bool {
        matches!(self.inner.raw(cap.name), Some(Value::True))
    }

    fn number(&self, cap: Cap) -> Option<i32> {
        match self.inner.raw(cap.name) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    fn string(&self, cap: Cap) -> Option<&[u8]> {
        match self.inner.raw(cap.name) {
            Some(Value::String(s)) => Some(s.as_slice()),
            _ => None,
        }
    }
}
