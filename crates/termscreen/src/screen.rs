#![forbid(unsafe_code)]

//! Screen primitives for the renderer.
//!
//! [`Screen`] turns each primitive into output. Capability sets that carry
//! control strings (database, hardcopy, debug) write the resolved sequence
//! with its delay directives expanded to pad characters. The direct console
//! has no control strings; its primitives are crossterm commands instead.
//!
//! | Primitive | Lines affected for padding |
//! |-----------|----------------------------|
//! | `init`, `deinit`, `clear`, `add_line`, `vbell` | screen height |
//! | everything else | 1 |
//!
//! # Failure Modes
//!
//! | Failure | Result |
//! |---------|--------|
//! | Writer error | [`ScreenError::Io`](crate::ScreenError::Io) |
//! | Console cursor query error | [`ScreenError::Io`](crate::ScreenError::Io) |
//! | Capability undefined | Nothing is written; no error |

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crossterm::style::{Color, Colors, ResetColor, SetColors};
use crossterm::{cursor, queue, terminal};

use crate::attr::AttrKind;
use crate::capabilities::{CapSource, TerminalCapabilities};
use crate::cost::write_padded;
use crate::error::Result;
use crate::options::{ColorPair, Quiet, ScreenOptions};
use crate::state::SessionState;

const BEL: u8 = 0x07;

/// How long the console inverts the screen for a visual bell.
const CONSOLE_FLASH: Duration = Duration::from_millis(100);

/// Map a CGA palette index to a crossterm color. Indices above 15 wrap.
fn cga_color(index: u8) -> Color {
    match index & 0x0f {
        0 => Color::Black,
        1 => Color::DarkBlue,
        2 => Color::DarkGreen,
        3 => Color::DarkCyan,
        4 => Color::DarkRed,
        5 => Color::DarkMagenta,
        6 => Color::DarkYellow,
        7 => Color::Grey,
        8 => Color::DarkGrey,
        9 => Color::Blue,
        10 => Color::Green,
        11 => Color::Cyan,
        12 => Color::Red,
        13 => Color::Magenta,
        14 => Color::Yellow,
        _ => Color::White,
    }
}

fn console_colors(pair: ColorPair) -> Colors {
    Colors::new(cga_color(pair.fg), cga_color(pair.bg))
}

/// Whether the console interprets VT sequences such as DECSCNM.
#[cfg(windows)]
fn console_handles_vt() -> bool {
    crossterm::ansi_support::supports_ansi()
}

#[cfg(not(windows))]
fn console_handles_vt() -> bool {
    true
}

/// Reports the cursor as `(column, row)`, zero based.
pub type CursorQuery = fn() -> io::Result<(u16, u16)>;

/// Primitive dispatcher over a writer.
///
/// Borrowing the capability set and the session state keeps the primitives
/// free of hidden globals; the only state written is `init_done`.
pub struct Screen<'a, W: Write> {
    caps: &'a TerminalCapabilities,
    options: &'a ScreenOptions,
    state: &'a mut SessionState,
    out: &'a mut W,
    cursor_query: CursorQuery,
}

impl<'a, W: Write> Screen<'a, W> {
    pub fn new(
        caps: &'a TerminalCapabilities,
        options: &'a ScreenOptions,
        state: &'a mut SessionState,
        out: &'a mut W,
    ) -> Self {
        Self {
            caps,
            options,
            state,
            out,
            cursor_query: cursor::position,
        }
    }

    /// Replace the console cursor-position query.
    #[must_use]
    pub fn with_cursor_query(mut self, query: CursorQuery) -> Self {
        self.cursor_query = query;
        self
    }

    #[must_use]
    pub fn capabilities(&self) -> &TerminalCapabilities {
        self.caps
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        self.state
    }

    fn is_console(&self) -> bool {
        self.caps.source == CapSource::Console
    }

    fn emit(&mut self, seq: &[u8], affected: u16) -> Result<()> {
        write_padded(&mut *self.out, seq, affected, &self.caps.padding)?;
        Ok(())
    }

    fn emit_full(&mut self, seq: &[u8]) -> Result<()> {
        let height = self.caps.height();
        self.emit(seq, height)
    }

    /// Send the terminal and keypad init sequences.
    ///
    /// Does nothing when init is disabled by option.
    pub fn init(&mut self) -> Result<()> {
        if self.options.no_init {
            return Ok(());
        }
        if self.is_console() {
            let normal = console_colors(self.options.console_colors.normal);
            queue!(self.out, SetColors(normal))?;
        } else {
            let caps = self.caps;
            self.emit_full(&caps.init)?;
            self.emit_full(&caps.keypad_on)?;
        }
        self.state.init_done = true;
        tracing::debug!(term = %self.caps.term, "terminal initialized");
        Ok(())
    }

    /// Undo [`init`](Self::init). Does nothing unless init ran.
    pub fn deinit(&mut self) -> Result<()> {
        if self.options.no_init || !self.state.init_done {
            return Ok(());
        }
        if self.is_console() {
            queue!(self.out, ResetColor)?;
            self.out.write_all(b"\n")?;
        } else {
            let caps = self.caps;
            self.emit_full(&caps.keypad_off)?;
            self.emit_full(&caps.deinit)?;
        }
        self.state.init_done = false;
        tracing::debug!(term = %self.caps.term, "terminal deinitialized");
        Ok(())
    }

    /// Cursor to the upper left corner.
    pub fn home(&mut self) -> Result<()> {
        if self.is_console() {
            queue!(self.out, cursor::MoveTo(0, 0))?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit(&caps.home, 1)
    }

    /// Insert a blank line at the top, scrolling the display down. The
    /// cursor must be at home.
    pub fn add_line(&mut self) -> Result<()> {
        if self.is_console() {
            queue!(self.out, terminal::ScrollDown(1), cursor::MoveTo(0, 0))?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit_full(&caps.add_line)
    }

    /// Cursor to the start of the bottom line.
    pub fn lower_left(&mut self) -> Result<()> {
        if self.is_console() {
            let last = self.caps.height().saturating_sub(1);
            queue!(self.out, cursor::MoveTo(0, last))?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit(&caps.lower_left, 1)
    }

    /// Cursor to the start of screen line `line`, zero based.
    pub fn goto_line(&mut self, line: u16) -> Result<()> {
        if self.is_console() {
            queue!(self.out, cursor::MoveTo(0, line))?;
            return Ok(());
        }
        let seq = self.caps.goto_line_sequence(line);
        self.emit(&seq, 1)
    }

    /// Clear the whole screen.
    pub fn clear(&mut self) -> Result<()> {
        if self.is_console() {
            queue!(
                self.out,
                terminal::Clear(terminal::ClearType::All),
                cursor::MoveTo(0, 0)
            )?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit_full(&caps.clear)
    }

    /// Clear from the cursor to the end of its line. The cursor does not move.
    pub fn clear_eol(&mut self) -> Result<()> {
        if self.is_console() {
            queue!(self.out, terminal::Clear(terminal::ClearType::UntilNewLine))?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit(&caps.clear_eol, 1)
    }

    /// Clear the bottom line and leave the cursor at its start.
    ///
    /// Terminals that keep content below the screen are cleared to the end
    /// of the display so nothing stale scrolls back in.
    pub fn clear_bot(&mut self) -> Result<()> {
        self.lower_left()?;
        if self.caps.memory_below && !self.is_console() {
            let caps = self.caps;
            self.emit(&caps.clear_eos, 1)
        } else {
            self.clear_eol()
        }
    }

    /// Begin an attribute.
    pub fn attr_enter(&mut self, kind: AttrKind) -> Result<()> {
        if self.is_console() {
            let colors = &self.options.console_colors;
            let pair = match kind {
                AttrKind::Standout => colors.standout,
                AttrKind::Underline => colors.underline,
                AttrKind::Bold => colors.bold,
                AttrKind::Blink => colors.blink,
            };
            queue!(self.out, SetColors(console_colors(pair)))?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit(&caps.attributes.get(kind).enter, 1)
    }

    /// End an attribute.
    pub fn attr_exit(&mut self, kind: AttrKind) -> Result<()> {
        if self.is_console() {
            let normal = console_colors(self.options.console_colors.normal);
            queue!(self.out, SetColors(normal))?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit(&caps.attributes.get(kind).exit, 1)
    }

    pub fn so_enter(&mut self) -> Result<()> {
        self.attr_enter(AttrKind::Standout)
    }

    pub fn so_exit(&mut self) -> Result<()> {
        self.attr_exit(AttrKind::Standout)
    }

    pub fn ul_enter(&mut self) -> Result<()> {
        self.attr_enter(AttrKind::Underline)
    }

    pub fn ul_exit(&mut self) -> Result<()> {
        self.attr_exit(AttrKind::Underline)
    }

    pub fn bo_enter(&mut self) -> Result<()> {
        self.attr_enter(AttrKind::Bold)
    }

    pub fn bo_exit(&mut self) -> Result<()> {
        self.attr_exit(AttrKind::Bold)
    }

    pub fn bl_enter(&mut self) -> Result<()> {
        self.attr_enter(AttrKind::Blink)
    }

    pub fn bl_exit(&mut self) -> Result<()> {
        self.attr_exit(AttrKind::Blink)
    }

    /// Console cursor one cell left, optionally blanking that cell. Nothing
    /// happens in column 0.
    fn console_step_left(&mut self, erase: bool) -> Result<()> {
        self.out.flush()?;
        let (col, row) = (self.cursor_query)()?;
        let Some(col) = col.checked_sub(1) else {
            return Ok(());
        };
        queue!(self.out, cursor::MoveTo(col, row))?;
        if erase {
            self.out.write_all(b" ")?;
            queue!(self.out, cursor::MoveTo(col, row))?;
        }
        Ok(())
    }

    /// Erase the character left of the cursor by overstriking it with a
    /// space, leaving the cursor on the erased cell.
    pub fn backspace(&mut self) -> Result<()> {
        if self.is_console() {
            return self.console_step_left(true);
        }
        let caps = self.caps;
        self.emit(&caps.backspace, 1)?;
        self.out.write_all(b" ")?;
        self.emit(&caps.backspace, 1)
    }

    /// Move the cursor one column left without erasing.
    pub fn putbs(&mut self) -> Result<()> {
        if self.is_console() {
            return self.console_step_left(false);
        }
        let caps = self.caps;
        self.emit(&caps.backspace, 1)
    }

    /// Flash the screen. Does nothing on terminals without a visual bell.
    pub fn vbell(&mut self) -> Result<()> {
        if self.is_console() {
            if !console_handles_vt() {
                tracing::debug!("console cannot flash, visual bell skipped");
                return Ok(());
            }
            self.out.write_all(b"\x1b[?5h")?;
            self.out.flush()?;
            thread::sleep(CONSOLE_FLASH);
            self.out.write_all(b"\x1b[?5l")?;
            return Ok(());
        }
        let caps = self.caps;
        self.emit_full(&caps.visual_bell)
    }

    fn has_visual_bell(&self) -> bool {
        if self.is_console() {
            return console_handles_vt();
        }
        !self.caps.visual_bell.is_empty()
    }

    /// Ring the bell: a flash in very quiet mode when the terminal has one,
    /// the audible bell otherwise.
    pub fn bell(&mut self) -> Result<()> {
        if self.options.quiet == Quiet::VeryQuiet && self.has_visual_bell() {
            return self.vbell();
        }
        self.out.write_all(&[BEL])?;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Write for Screen<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Geometry;
    use crate::cost::Padding;

    fn run(
        caps: &TerminalCapabilities,
        options: &ScreenOptions,
        state: &mut SessionState,
        f: impl FnOnce(&mut Screen<'_, Vec<u8>>) -> Result<()>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut screen = Screen::new(caps, options, state, &mut out);
        f(&mut screen).unwrap();
        out
    }

    fn debug_caps() -> TerminalCapabilities {
        TerminalCapabilities::debug("debugterm", Geometry::DEFAULT)
    }

    #[test]
    fn init_and_deinit_pair_up() {
        let caps = debug_caps();
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();

        let out = run(&caps, &opts, &mut state, |s| s.init());
        assert_eq!(out, b"(InitTerm)(InitKey)");
        assert!(state.init_done);

        let out = run(&caps, &opts, &mut state, |s| s.deinit());
        assert_eq!(out, b"(DeinitKey)(DeinitTerm)");
        assert!(!state.init_done);

        let out = run(&caps, &opts, &mut state, |s| s.deinit());
        assert!(out.is_empty(), "deinit without init must be silent");
    }

    #[test]
    fn no_init_suppresses_both() {
        let caps = debug_caps();
        let opts = ScreenOptions {
            no_init: true,
            ..Default::default()
        };
        let mut state = SessionState::default();
        let out = run(&caps, &opts, &mut state, |s| {
            s.init()?;
            s.deinit()
        });
        assert!(out.is_empty());
        assert!(!state.init_done);
    }

    #[test]
    fn clear_bot_depends_on_memory_below() {
        let mut caps = debug_caps();
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();

        let out = run(&caps, &opts, &mut state, |s| s.clear_bot());
        assert_eq!(out, b"(LL)(ClearEOL)");

        caps.memory_below = true;
        let out = run(&caps, &opts, &mut state, |s| s.clear_bot());
        assert_eq!(out, b"(LL)(ClearEOS)");
    }

    #[test]
    fn cursor_primitives() {
        let caps = debug_caps();
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();
        let out = run(&caps, &opts, &mut state, |s| {
            s.home()?;
            s.goto_line(5)?;
            s.add_line()?;
            s.clear()?;
            s.lower_left()
        });
        assert_eq!(out, b"(Home)(Move<5,0>)(AddLine)(ClearScreen)(LL)");
    }

    #[test]
    fn attributes_and_backspace() {
        let caps = debug_caps();
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();
        let out = run(&caps, &opts, &mut state, |s| {
            s.so_enter()?;
            s.so_exit()?;
            s.ul_enter()?;
            s.ul_exit()?;
            s.bo_enter()?;
            s.bo_exit()?;
            s.bl_enter()?;
            s.bl_exit()?;
            s.backspace()?;
            s.putbs()
        });
        assert_eq!(
            out,
            b"(SO+)(SO-)(UL+)(UL-)(BO+)(BO-)(BL+)(BL-)(BS) (BS)(BS)".as_slice()
        );
    }

    #[test]
    fn bell_variants() {
        let mut caps = debug_caps();
        let mut state = SessionState::default();

        let normal = ScreenOptions::default();
        assert_eq!(run(&caps, &normal, &mut state, |s| s.bell()), [BEL]);

        let very_quiet = ScreenOptions {
            quiet: Quiet::VeryQuiet,
            ..Default::default()
        };
        assert_eq!(run(&caps, &very_quiet, &mut state, |s| s.bell()), b"(VBell)");

        caps.visual_bell.clear();
        assert_eq!(run(&caps, &very_quiet, &mut state, |s| s.bell()), [BEL]);
        assert!(run(&caps, &very_quiet, &mut state, |s| s.vbell()).is_empty());
    }

    #[test]
    fn per_line_padding_scales_with_height() {
        let mut caps = TerminalCapabilities::hardcopy("padded", Geometry::new(80, 10));
        caps.clear = b"\x1b[J$<1*>".to_vec();
        caps.clear_eol = b"\x1b[K$<1*>".to_vec();
        caps.padding = Padding::at_baud(100_000);
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();

        // 1 ms at 10_000 chars/s is 10 pads per line.
        let out = run(&caps, &opts, &mut state, |s| s.clear());
        assert_eq!(out.len(), 3 + 100);
        let out = run(&caps, &opts, &mut state, |s| s.clear_eol());
        assert_eq!(out.len(), 3 + 10);
    }

    #[test]
    fn hardcopy_primitives_degrade_quietly() {
        let caps = TerminalCapabilities::hardcopy("dumb", Geometry::DEFAULT);
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();
        let out = run(&caps, &opts, &mut state, |s| {
            s.clear_eol()?;
            s.add_line()?;
            s.goto_line(3)?;
            s.so_enter()
        });
        assert!(out.is_empty());
    }

    #[test]
    fn console_uses_colors_and_cursor_commands() {
        let caps = TerminalCapabilities::console(Geometry::CONSOLE_DEFAULT);
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();
        let out = run(&caps, &opts, &mut state, |s| {
            s.init()?;
            s.lower_left()
        });
        assert!(state.init_done);
        assert!(!out.is_empty());

        let out = run(&caps, &opts, &mut state, |s| s.deinit());
        assert!(out.ends_with(b"\n"));
        assert!(!state.init_done);
    }

    fn console_step(caps: &TerminalCapabilities, at: CursorQuery, erase: bool) -> Vec<u8> {
        let opts = ScreenOptions::default();
        let mut state = SessionState::default();
        let mut out = Vec::new();
        let mut screen = Screen::new(caps, &opts, &mut state, &mut out).with_cursor_query(at);
        if erase {
            screen.backspace().unwrap();
        } else {
            screen.putbs().unwrap();
        }
        out
    }

    #[test]
    fn console_backspace_moves_the_cursor() {
        let caps = TerminalCapabilities::console(Geometry::CONSOLE_DEFAULT);
        let at: CursorQuery = || Ok((5, 2));
        assert_eq!(console_step(&caps, at, true), b"\x1b[3;5H \x1b[3;5H");
        assert_eq!(console_step(&caps, at, false), b"\x1b[3;5H");
    }

    #[test]
    fn console_backspace_stops_at_column_zero() {
        let caps = TerminalCapabilities::console(Geometry::CONSOLE_DEFAULT);
        let at: CursorQuery = || Ok((0, 7));
        assert!(console_step(&caps, at, true).is_empty());
        assert!(console_step(&caps, at, false).is_empty());
    }

    #[test]
    fn console_very_quiet_bell_flashes() {
        let caps = TerminalCapabilities::console(Geometry::CONSOLE_DEFAULT);
        let opts = ScreenOptions {
            quiet: Quiet::VeryQuiet,
            ..Default::default()
        };
        let mut state = SessionState::default();
        let out = run(&caps, &opts, &mut state, |s| s.bell());
        assert_eq!(out, b"\x1b[?5h\x1b[?5l");
    }

    #[test]
    fn cga_palette_wraps() {
        assert_eq!(cga_color(0), Color::Black);
        assert_eq!(cga_color(7), Color::Grey);
        assert_eq!(cga_color(15), Color::White);
        assert_eq!(cga_color(16), Color::Black);
    }
}
