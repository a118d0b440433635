#![forbid(unsafe_code)]

//! Capability resolution.
//!
//! Resolution is split the same way as environment detection elsewhere in
//! this workspace: [`ResolveInputs::from_env`] snapshots everything read from
//! the process environment and the device, and [`resolve`] is a pure
//! function of that snapshot, a database, and [`ScreenOptions`]. Tests drive
//! `resolve` with hand-built inputs and in-memory databases.
//!
//! # Lookup order
//!
//! For every capability:
//!
//! 1. The override variable `<prefix><code>` (e.g. `LESS_TERMCAP_so`), if set.
//! 2. Nothing, if the terminal is hardcopy.
//! 3. The terminal database.
//!
//! Override flags are true unless empty or `"0"`. Override numbers are parsed
//! like C `atoi` (leading integer, 0 when none).
//!
//! # Geometry order
//!
//! Direct device query, then `LINES`/`COLUMNS`, then `li`/`co`, then the
//! default (80x24, or 80x25 on the direct console). Each dimension resolves
//! independently and non-positive values fall through.
//!
//! # Failure Modes
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | `TERM` unset | `options.default_term` |
//! | No database entry, or `hc` set | [`CapSource::Hardcopy`] |
//! | `ce`, `cl`, (`cd` with `db`) undefined | fallback + [`Missing`] flag |
//! | No `ho`/`ll`/`al`/`sr` alternatives | fallback + [`Missing`] flag |
//! | `cm` undefined | `can_goto_line = false` |

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;

use crate::attr::{AttrPair, AttrWidths, Attributes, resolve_pair};
use crate::capabilities::{
    CapSource, Geometry, KeyStrings, Missing, TerminalCapabilities, cursor_to,
};
use crate::cost::{Padding, select_cheaper};
use crate::database::{Cap, CapabilityDatabase, TerminfoDatabase, caps};
use crate::options::ScreenOptions;

/// Everything resolution reads from the outside world.
#[derive(Debug, Clone, Default)]
pub struct ResolveInputs {
    /// `TERM`, if set and non-empty.
    pub term: Option<String>,
    /// `LINES`, raw.
    pub lines: Option<String>,
    /// `COLUMNS`, raw.
    pub columns: Option<String>,
    /// Device-reported `(columns, rows)`; zero components count as unknown.
    pub direct_size: Option<(u16, u16)>,
    /// Override values keyed by termcap code.
    pub overrides: HashMap<String, Vec<u8>>,
    /// Output speed in bits per second, 0 when unknown.
    pub baud: u32,
}

#[cfg(unix)]
fn os_bytes(value: OsString) -> Vec<u8> {
    use std::os::unix::ffi::OsStringExt;
    value.into_vec()
}

#[cfg(not(unix))]
fn os_bytes(value: OsString) -> Vec<u8> {
    value.to_string_lossy().into_owned().into_bytes()
}

impl ResolveInputs {
    /// Snapshot the environment and query the device size.
    #[must_use]
    pub fn from_env(options: &ScreenOptions) -> Self {
        let prefix = options.override_prefix.as_str();
        let overrides = if prefix.is_empty() {
            HashMap::new()
        } else {
            env::vars_os()
                .filter_map(|(key, value)| {
                    let key = key.into_string().ok()?;
                    let code = key.strip_prefix(prefix)?;
                    Some((code.to_owned(), os_bytes(value)))
                })
                .collect()
        };
        Self {
            term: env::var("TERM").ok().filter(|t| !t.is_empty()),
            lines: env::var("LINES").ok(),
            columns: env::var("COLUMNS").ok(),
            direct_size: query_device_size(),
            overrides,
            baud: 0,
        }
    }

    /// Same inputs with a known output speed.
    #[must_use]
    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    /// Add an override as if `<prefix><code>` were set.
    #[must_use]
    pub fn with_override(mut self, code: &str, value: impl Into<Vec<u8>>) -> Self {
        self.overrides.insert(code.to_owned(), value.into());
        self
    }

    /// Terminal name to resolve, applying the default.
    #[must_use]
    pub fn terminal_name<'a>(&'a self, options: &'a ScreenOptions) -> &'a str {
        self.term.as_deref().unwrap_or(&options.default_term)
    }
}

/// Query the device for its size, `(columns, rows)`.
pub fn query_device_size() -> Option<(u16, u16)> {
    match crossterm::terminal::size() {
        Ok(size) => Some(size),
        Err(err) => {
            tracing::debug!(error = %err, "device size query failed");
            None
        }
    }
}

/// Leading-integer parse: optional whitespace, optional sign, digits.
/// Anything unparsable yields 0.
fn parse_leading_int(s: &[u8]) -> i32 {
    let mut bytes = s
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .peekable();
    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };
    let mut value: i32 = 0;
    for &b in bytes.take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i32::from(b - b'0'));
    }
    if negative { -value } else { value }
}

/// Capability lookup with overrides layered over an optional database.
/// A `None` database means the terminal is hardcopy.
struct Lookup<'a> {
    db: Option<&'a dyn CapabilityDatabase>,
    overrides: &'a HashMap<String, Vec<u8>>,
}

impl<'a> Lookup<'a> {
    fn override_for(&self, cap: Cap) -> Option<&'a [u8]> {
        self.overrides.get(cap.code).map(Vec::as_slice)
    }

    fn flag(&self, cap: Cap) -> bool {
        if let Some(value) = self.override_for(cap) {
            return !value.is_empty() && value != b"0";
        }
        self.db.is_some_and(|db| db.flag(cap))
    }

    fn number(&self, cap: Cap) -> Option<i32> {
        if let Some(value) = self.override_for(cap) {
            return Some(parse_leading_int(value));
        }
        self.db.and_then(|db| db.number(cap))
    }

    fn string(&self, cap: Cap) -> Option<&'a [u8]> {
        if let Some(value) = self.override_for(cap) {
            return Some(value);
        }
        self.db.and_then(|db| db.string(cap))
    }

    /// String capability where undefined and empty are the same.
    fn string_or_empty(&self, cap: Cap) -> &'a [u8] {
        self.string(cap).unwrap_or_default()
    }
}

fn positive(value: i64) -> Option<u16> {
    u16::try_from(value).ok().filter(|&v| v > 0)
}

fn geometry_with(
    inputs: &ResolveInputs,
    lookup: &Lookup<'_>,
    fallback: Geometry,
) -> Geometry {
    let (direct_cols, direct_rows) = inputs.direct_size.unwrap_or((0, 0));
    let env_dim = |raw: &Option<String>| {
        raw.as_deref()
            .and_then(|s| positive(i64::from(parse_leading_int(s.as_bytes()))))
    };
    let db_dim = |cap| lookup.number(cap).and_then(|n| positive(i64::from(n)));

    let height = positive(i64::from(direct_rows))
        .or_else(|| env_dim(&inputs.lines))
        .or_else(|| db_dim(caps::LINES))
        .unwrap_or(fallback.height);
    let width = positive(i64::from(direct_cols))
        .or_else(|| env_dim(&inputs.columns))
        .or_else(|| db_dim(caps::COLUMNS))
        .unwrap_or(fallback.width);
    Geometry::new(width, height)
}

/// Resolve screen geometry.
///
/// Used at startup and again on every resize; it never re-reads string
/// capabilities.
#[must_use]
pub fn resolve_geometry(
    inputs: &ResolveInputs,
    db: Option<&dyn CapabilityDatabase>,
    fallback: Geometry,
) -> Geometry {
    let lookup = Lookup {
        db,
        overrides: &inputs.overrides,
    };
    geometry_with(inputs, &lookup, fallback)
}

fn key_strings(lookup: &Lookup<'_>) -> KeyStrings {
    let key = |cap| lookup.string(cap).filter(|s| !s.is_empty()).map(<[u8]>::to_vec);
    KeyStrings {
        right: key(caps::KEY_RIGHT),
        left: key(caps::KEY_LEFT),
        up: key(caps::KEY_UP),
        down: key(caps::KEY_DOWN),
        page_up: key(caps::KEY_PPAGE),
        page_down: key(caps::KEY_NPAGE),
        home: key(caps::KEY_HOME),
        end: key(caps::KEY_END),
        delete: key(caps::KEY_DELETE),
        back_tab: key(caps::KEY_BACKTAB),
    }
}

/// Resolve the full capability set for the terminal named in `inputs`.
///
/// `db` is the description found for that name, if any. Pass `None` for an
/// unknown terminal.
#[must_use]
pub fn resolve(
    inputs: &ResolveInputs,
    db: Option<&dyn CapabilityDatabase>,
    options: &ScreenOptions,
) -> TerminalCapabilities {
    let term = inputs.terminal_name(options).to_owned();
    let _span = tracing::debug_span!("resolve_capabilities", term = %term).entered();

    let probe = Lookup {
        db,
        overrides: &inputs.overrides,
    };
    let hardcopy = db.is_none() || probe.flag(caps::HARDCOPY);
    let lookup = Lookup {
        db: if hardcopy { None } else { db },
        overrides: &inputs.overrides,
    };
    if hardcopy {
        tracing::warn!(term = %term, "no usable terminal description, treating as hardcopy");
    }

    let geometry = geometry_with(inputs, &lookup, Geometry::DEFAULT);
    tracing::debug!(width = geometry.width, height = geometry.height, "screen size");

    if options.is_debug_term(&term) {
        tracing::info!(term = %term, "using placeholder capability profile");
        return TerminalCapabilities::debug(term, geometry);
    }

    let mut missing = Missing::empty();

    let auto_wrap = lookup.flag(caps::AUTO_WRAP);
    let ignore_wrap_newline = lookup.flag(caps::IGNORE_WRAP_NEWLINE);
    let memory_above = lookup.flag(caps::MEMORY_ABOVE);
    let memory_below = lookup.flag(caps::MEMORY_BELOW);

    let cookie = lookup
        .number(caps::COOKIE_WIDTH)
        .map_or(0, |n| u16::try_from(n.max(0)).unwrap_or(u16::MAX));
    let attr_widths = AttrWidths::uniform(cookie);
    let search_highlight = options.highlight.allows(attr_widths.widest());
    if !search_highlight {
        tracing::info!(cookie, "attribute sequences occupy columns, search highlight disabled");
    }

    let padding = Padding {
        baud: inputs.baud,
        threshold: lookup
            .number(caps::PADDING_BAUD)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        pad_char: lookup
            .string(caps::PAD_CHAR)
            .and_then(|s| s.first().copied())
            .unwrap_or(0),
        no_pad_char: lookup.flag(caps::NO_PAD_CHAR),
    };

    let keypad_on = lookup.string_or_empty(caps::KEYPAD_XMIT).to_vec();
    let keypad_off = lookup.string_or_empty(caps::KEYPAD_LOCAL).to_vec();
    let init = lookup.string_or_empty(caps::ENTER_CA).to_vec();
    let deinit = lookup.string_or_empty(caps::EXIT_CA).to_vec();

    let clear_eol = lookup.string_or_empty(caps::CLR_EOL).to_vec();
    if clear_eol.is_empty() {
        missing |= Missing::CLEAR_EOL;
    }

    let clear_eos = lookup.string_or_empty(caps::CLR_EOS).to_vec();
    if memory_below && clear_eos.is_empty() {
        missing |= Missing::CLEAR_EOS;
    }

    let mut clear = lookup.string_or_empty(caps::CLEAR_SCREEN).to_vec();
    if clear.is_empty() {
        missing |= Missing::CLEAR_SCREEN;
        clear = b"\n\n".to_vec();
    }

    let cursor_move = lookup.string_or_empty(caps::CURSOR_ADDRESS).to_vec();
    let can_goto_line = !cursor_move.is_empty();

    let exit_all = lookup.string(caps::EXIT_ATTRIBUTES);
    let standout = resolve_pair(
        lookup.string(caps::ENTER_STANDOUT),
        lookup.string(caps::EXIT_STANDOUT),
        exit_all,
        &AttrPair::default(),
    );
    let attributes = Attributes {
        underline: resolve_pair(
            lookup.string(caps::ENTER_UNDERLINE),
            lookup.string(caps::EXIT_UNDERLINE),
            exit_all,
            &standout,
        ),
        bold: resolve_pair(
            lookup.string(caps::ENTER_BOLD),
            exit_all,
            exit_all,
            &standout,
        ),
        blink: resolve_pair(
            lookup.string(caps::ENTER_BLINK),
            exit_all,
            exit_all,
            &standout,
        ),
        standout,
    };

    let visual_bell = lookup.string_or_empty(caps::FLASH_SCREEN).to_vec();

    let backspace = if lookup.flag(caps::BACKSPACES_WITH_BS) {
        b"\x08".to_vec()
    } else {
        match lookup.string(caps::BACKSPACE_CHAR) {
            Some(bc) if !bc.is_empty() => bc.to_vec(),
            _ => b"\x08".to_vec(),
        }
    };

    let affected = geometry.height;

    let origin = cursor_to(&cursor_move, 0, 0);
    let home_pick = select_cheaper(
        lookup.string_or_empty(caps::CURSOR_HOME),
        &origin,
        b"|\x08^",
        affected,
        &padding,
    );
    if home_pick.is_default() {
        missing |= Missing::HOME;
    }
    let home = home_pick.bytes().to_vec();

    let cursor_to_ll = lookup.string_or_empty(caps::CURSOR_TO_LL).to_vec();
    let bottom = cursor_to(&cursor_move, geometry.height.saturating_sub(1), 0);
    let ll_pick = select_cheaper(&cursor_to_ll, &bottom, b"\r", affected, &padding);
    if ll_pick.is_default() {
        missing |= Missing::LOWER_LEFT;
    }
    let lower_left = ll_pick.bytes().to_vec();

    let insert_line = lookup.string_or_empty(caps::INSERT_LINE);
    let add_line = if memory_above {
        insert_line.to_vec()
    } else {
        let pick = select_cheaper(
            insert_line,
            lookup.string_or_empty(caps::SCROLL_REVERSE),
            b"",
            affected,
            &padding,
        );
        if pick.is_default() {
            missing |= Missing::ADD_LINE;
        }
        pick.bytes().to_vec()
    };
    let no_back_scroll = add_line.is_empty();
    if no_back_scroll {
        tracing::info!("no way to insert a top line, backward scrolling will repaint");
    }

    if !missing.is_empty() {
        tracing::warn!(?missing, "terminal lacks capabilities, using fallbacks");
    }

    TerminalCapabilities {
        term,
        source: if hardcopy {
            CapSource::Hardcopy
        } else {
            CapSource::Database
        },
        geometry,
        auto_wrap,
        ignore_wrap_newline,
        memory_above,
        memory_below,
        can_goto_line,
        attr_widths,
        attributes,
        home,
        lower_left,
        add_line,
        clear,
        clear_eol,
        clear_eos,
        cursor_move,
        visual_bell,
        backspace,
        keypad_on,
        keypad_off,
        init,
        deinit,
        cursor_to_ll,
        keys: key_strings(&lookup),
        padding,
        missing,
        no_back_scroll,
        search_highlight,
    }
}

/// Capability set for the direct console: geometry only.
#[must_use]
pub fn resolve_console(inputs: &ResolveInputs) -> TerminalCapabilities {
    let geometry = resolve_geometry(inputs, None, Geometry::CONSOLE_DEFAULT);
    tracing::debug!(
        width = geometry.width,
        height = geometry.height,
        "console screen size"
    );
    TerminalCapabilities::console(geometry)
}

impl TerminalCapabilities {
    /// Resolve capabilities for the current process environment.
    ///
    /// On platforms with a capability database this loads the terminfo
    /// description named by `TERM`; on the direct console only geometry is
    /// queried.
    #[must_use]
    pub fn detect(options: &ScreenOptions, baud: u32) -> Self {
        let inputs = ResolveInputs::from_env(options).with_baud(baud);
        if cfg!(windows) {
            return resolve_console(&inputs);
        }
        let db = TerminfoDatabase::load(inputs.terminal_name(options));
        resolve(
            &inputs,
            db.as_ref().map(|d| d as &dyn CapabilityDatabase),
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::HighlightPolicy;

    fn vt100ish() -> TerminfoDatabase {
        let mut b = terminfo::Database::new();
        b.name("vt100ish")
            .raw("am", ())
            .raw("xn", ())
            .raw("lines", 24i32)
            .raw("columns", 80i32)
            .raw("clear_screen", "\x1b[H\x1b[J")
            .raw("clr_eol", "\x1b[K")
            .raw("clr_eos", "\x1b[J")
            .raw("cursor_address", "\x1b[%i%p1%d;%p2%dH")
            .raw("cursor_home", "\x1b[H")
            .raw("enter_standout_mode", "\x1b[7m")
            .raw("exit_standout_mode", "\x1b[27m")
            .raw("enter_underline_mode", "\x1b[4m")
            .raw("exit_underline_mode", "\x1b[24m")
            .raw("enter_bold_mode", "\x1b[1m")
            .raw("exit_attribute_mode", "\x1b[m")
            .raw("scroll_reverse", "\x1bM")
            .raw("key_up", "\x1bOA")
            .raw("key_down", "\x1bOB");
        TerminfoDatabase::from(b.build().expect("named"))
    }

    fn inputs() -> ResolveInputs {
        ResolveInputs {
            term: Some("vt100ish".into()),
            ..Default::default()
        }
    }

    fn resolve_with(inputs: &ResolveInputs, db: &TerminfoDatabase) -> TerminalCapabilities {
        resolve(inputs, Some(db as &dyn CapabilityDatabase), &ScreenOptions::default())
    }

    #[test]
    fn leading_int_parse() {
        assert_eq!(parse_leading_int(b"42"), 42);
        assert_eq!(parse_leading_int(b"  -7x"), -7);
        assert_eq!(parse_leading_int(b"+3"), 3);
        assert_eq!(parse_leading_int(b"abc"), 0);
        assert_eq!(parse_leading_int(b""), 0);
    }

    #[test]
    fn resolves_database_terminal() {
        let caps = resolve_with(&inputs(), &vt100ish());
        assert_eq!(caps.source, CapSource::Database);
        assert_eq!(caps.geometry, Geometry::new(80, 24));
        assert!(caps.auto_wrap && caps.ignore_wrap_newline);
        assert!(caps.can_goto_line);
        assert_eq!(caps.clear_eol, b"\x1b[K");
        assert_eq!(caps.home, b"\x1b[H");
        assert_eq!(caps.lower_left, b"\x1b[24;1H");
        assert_eq!(caps.add_line, b"\x1bM");
        assert!(!caps.no_back_scroll);
        assert!(!caps.missing_cap());
        assert!(caps.search_highlight);
        assert_eq!(caps.keys.up.as_deref(), Some(&b"\x1bOA"[..]));
        assert_eq!(caps.keys.left, None);
    }

    #[test]
    fn attribute_chains() {
        let caps = resolve_with(&inputs(), &vt100ish());
        assert_eq!(caps.attributes.standout.exit, b"\x1b[27m");
        assert_eq!(caps.attributes.underline.exit, b"\x1b[24m");
        assert_eq!(caps.attributes.bold.enter, b"\x1b[1m");
        assert_eq!(caps.attributes.bold.exit, b"\x1b[m");
        // No `mb`: blink falls back to standout.
        assert_eq!(caps.attributes.blink, caps.attributes.standout);
    }

    #[test]
    fn unknown_terminal_is_hardcopy() {
        let caps = resolve(&inputs(), None, &ScreenOptions::default());
        assert_eq!(caps.source, CapSource::Hardcopy);
        assert_eq!(caps.clear, b"\n\n");
        assert!(caps.missing.contains(Missing::CLEAR_SCREEN | Missing::CLEAR_EOL));
        assert!(caps.no_back_scroll);
        assert!(!caps.can_goto_line);
        assert_eq!(caps.geometry, Geometry::DEFAULT);
    }

    #[test]
    fn hc_flag_forces_hardcopy() {
        let inputs = inputs().with_override("hc", "1");
        let caps = resolve_with(&inputs, &vt100ish());
        assert_eq!(caps.source, CapSource::Hardcopy);
        assert!(caps.clear_eol.is_empty());
    }

    #[test]
    fn overrides_beat_database() {
        let inputs = inputs()
            .with_override("so", "<SO>")
            .with_override("am", "0")
            .with_override("li", "50");
        let caps = resolve_with(&inputs, &vt100ish());
        assert_eq!(caps.attributes.standout.enter, b"<SO>");
        assert!(!caps.auto_wrap);
        assert_eq!(caps.geometry.height, 50);
    }

    #[test]
    fn overrides_apply_to_hardcopy() {
        let inputs = inputs().with_override("ce", "<CE>").with_override("xn", "yes");
        let caps = resolve(&inputs, None, &ScreenOptions::default());
        assert_eq!(caps.clear_eol, b"<CE>");
        assert!(caps.ignore_wrap_newline);
        assert!(!caps.missing.contains(Missing::CLEAR_EOL));
    }

    #[test]
    fn empty_override_flag_is_false() {
        let inputs = inputs().with_override("xn", "");
        let caps = resolve_with(&inputs, &vt100ish());
        assert!(!caps.ignore_wrap_newline);
    }

    #[test]
    fn geometry_order() {
        let db = vt100ish();
        let mut inputs = inputs();
        inputs.lines = Some("40".into());
        inputs.columns = Some("0".into());
        let g = resolve_geometry(&inputs, Some(&db as &dyn CapabilityDatabase), Geometry::DEFAULT);
        assert_eq!(g, Geometry::new(80, 40));

        inputs.direct_size = Some((132, 0));
        let g = resolve_geometry(&inputs, Some(&db as &dyn CapabilityDatabase), Geometry::DEFAULT);
        assert_eq!(g, Geometry::new(132, 40));
    }

    #[test]
    fn bad_environment_size_falls_through_to_database() {
        let db = vt100ish();
        let mut inputs = inputs().with_override("li", "30").with_override("co", "100");
        inputs.lines = Some("-5".into());
        inputs.columns = Some("wide".into());
        let g = resolve_geometry(&inputs, Some(&db as &dyn CapabilityDatabase), Geometry::DEFAULT);
        assert_eq!(g, Geometry::new(100, 30));
    }

    #[test]
    fn geometry_defaults_without_sources() {
        let inputs = ResolveInputs::default();
        assert_eq!(
            resolve_geometry(&inputs, None, Geometry::DEFAULT),
            Geometry::new(80, 24)
        );
        assert_eq!(resolve_console(&inputs).geometry, Geometry::new(80, 25));
    }

    #[test]
    fn missing_add_line_disables_back_scroll() {
        let inputs = inputs().with_override("sr", "");
        let caps = resolve_with(&inputs, &vt100ish());
        assert!(caps.add_line.is_empty());
        assert!(caps.no_back_scroll);
        assert!(caps.missing.contains(Missing::ADD_LINE));
        assert!(caps.missing_cap());
    }

    #[test]
    fn memory_above_uses_insert_line_only() {
        let inputs = inputs().with_override("da", "1");
        let caps = resolve_with(&inputs, &vt100ish());
        assert!(caps.add_line.is_empty());
        assert!(caps.no_back_scroll);
        assert!(!caps.missing.contains(Missing::ADD_LINE));
    }

    #[test]
    fn missing_eos_only_matters_with_memory_below() {
        let inputs = inputs().with_override("cd", "");
        assert!(!resolve_with(&inputs, &vt100ish()).missing_cap());
        let inputs = inputs.with_override("db", "1");
        let caps = resolve_with(&inputs, &vt100ish());
        assert!(caps.missing.contains(Missing::CLEAR_EOS));
        assert_eq!(caps.clear_eol, b"\x1b[K");
    }

    #[test]
    fn missing_move_disables_goto() {
        let inputs = inputs().with_override("cm", "");
        let caps = resolve_with(&inputs, &vt100ish());
        assert!(!caps.can_goto_line);
        // `ho` is still there; lower-left has nothing.
        assert_eq!(caps.home, b"\x1b[H");
        assert_eq!(caps.lower_left, b"\r");
        assert!(caps.missing.contains(Missing::LOWER_LEFT));
    }

    #[test]
    fn cookie_width_controls_highlight() {
        let inputs = inputs().with_override("sg", "1");
        let caps = resolve_with(&inputs, &vt100ish());
        assert_eq!(caps.attr_widths, AttrWidths::uniform(1));
        assert!(!caps.search_highlight);

        let lenient = ScreenOptions {
            highlight: HighlightPolicy::MaxCookieWidth(1),
            ..Default::default()
        };
        let db = vt100ish();
        assert!(resolve(&inputs, Some(&db as &dyn CapabilityDatabase), &lenient).search_highlight);

        let negative = inputs.with_override("sg", "-1");
        assert_eq!(
            resolve_with(&negative, &vt100ish()).attr_widths,
            AttrWidths::default()
        );
    }

    #[test]
    fn backspace_selection() {
        let caps = resolve_with(&inputs().with_override("bc", "<BC>"), &vt100ish());
        assert_eq!(caps.backspace, b"<BC>");
        let caps = resolve_with(
            &inputs().with_override("bc", "<BC>").with_override("bs", "1"),
            &vt100ish(),
        );
        assert_eq!(caps.backspace, b"\x08");
        assert_eq!(resolve_with(&inputs(), &vt100ish()).backspace, b"\x08");
    }

    #[test]
    fn debug_prefix_selects_placeholders() {
        let options = ScreenOptions {
            debug_term_prefix: Some("LESSDEBUG".into()),
            ..Default::default()
        };
        let inputs = ResolveInputs {
            term: Some("LESSDEBUG-x".into()),
            ..Default::default()
        };
        let caps = resolve(&inputs, None, &options);
        assert_eq!(caps.source, CapSource::Debug);
        assert_eq!(caps.clear, b"(ClearScreen)");
    }

    #[test]
    fn unset_term_uses_default() {
        let options = ScreenOptions::default();
        let inputs = ResolveInputs::default();
        assert_eq!(inputs.terminal_name(&options), options.default_term);
    }
}
