#![forbid(unsafe_code)]

//! Console without a line discipline.
//!
//! Keystrokes already arrive one at a time, so there is nothing to switch.
//! The edit characters are the console's fixed ones.

use super::{DriverKind, EditChars, RawSettings, TerminalDriver, CONTROL_W};
use crate::error::Result;

const ESC: u8 = 0x1b;

/// Mode driver that performs no device calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDriver {
    _private: (),
}

impl ConsoleDriver {
    /// Always succeeds; there is no device to open.
    pub fn open() -> Result<Self> {
        Ok(Self::default())
    }

    /// Edit characters of the console: backspace erases, escape kills the
    /// line, `^W` erases a word.
    #[must_use]
    pub const fn edit_chars() -> EditChars {
        EditChars {
            erase: 0x08,
            kill: ESC,
            werase: CONTROL_W,
        }
    }
}

impl TerminalDriver for ConsoleDriver {
    type Settings = ();

    fn kind(&self) -> DriverKind {
        DriverKind::DirectConsole
    }

    fn query(&mut self) -> Result<()> {
        Ok(())
    }

    fn apply(&mut self, _settings: &()) -> Result<()> {
        Ok(())
    }

    fn make_raw(&self, _current: &()) -> RawSettings<()> {
        RawSettings {
            settings: (),
            edit: Self::edit_chars(),
            baud: None,
        }
    }
}
