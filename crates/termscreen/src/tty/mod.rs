#![forbid(unsafe_code)]

//! Terminal mode control.
//!
//! A [`ModeController`] moves the terminal between [`TtyMode::Cooked`] (the
//! line discipline the user's shell left) and [`TtyMode::Raw`]
//! (keystroke-at-a-time input without echo). The device specifics sit behind
//! [`TerminalDriver`]; one driver is selected per platform as
//! [`PlatformDriver`].
//!
//! # State machine
//!
//! ```text
//!            set_mode(Raw)
//!   ┌────────┐ ───────────▶ ┌─────┐
//!   │ Cooked │              │ Raw │
//!   └────────┘ ◀─────────── └─────┘
//!            set_mode(Cooked)
//! ```
//!
//! Requests for the current mode are no-ops.
//!
//! # Invariants
//!
//! 1. The settings found on the first raw entry are saved, and only those.
//!    Later raw entries never overwrite the snapshot.
//! 2. Cooked entry applies the snapshot verbatim, including settings this
//!    crate does not interpret.
//! 3. A failed device query or update is returned as
//!    [`ScreenError::Mode`](crate::ScreenError::Mode) and leaves the
//!    controller's mode unchanged.

mod console;
mod legacy;
#[cfg(unix)]
mod termios;

pub use console::ConsoleDriver;
pub use legacy::{
    LegacyDevice, SgttyDriver, SgttySettings, TermioDriver, TermioSettings,
};
#[cfg(unix)]
pub use termios::TermiosDriver;

use std::fmt;

use crate::error::Result;
use crate::state::SessionState;

/// `^W`, the conventional word-erase character.
pub const CONTROL_W: u8 = 0x17;

/// Input line discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtyMode {
    /// Line-buffered with echo; the state the session started in.
    #[default]
    Cooked,
    /// One byte per read, no echo, no line editing.
    Raw,
}

/// Mode-control mechanism in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// POSIX termios.
    PosixTermios,
    /// System V `termio` ioctls.
    LegacyTermio,
    /// Version 7 / BSD `sgttyb` ioctls.
    LegacySgtty,
    /// Console without a line discipline.
    DirectConsole,
}

/// Line-editing characters in effect for the user's terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditChars {
    pub erase: u8,
    pub kill: u8,
    /// 0 when the terminal has no word-erase character.
    pub werase: u8,
}

impl Default for EditChars {
    fn default() -> Self {
        Self {
            erase: 0x08,
            kill: 0x15,
            werase: CONTROL_W,
        }
    }
}

/// Index into the classic output speed table.
///
/// | Index | Rate | | Index | Rate |
/// |------:|-----:|-|------:|-----:|
/// | 0 | 0 (hang up) | | 9 | 1200 |
/// | 1 | 50 | | 10 | 1800 |
/// | 2 | 75 | | 11 | 2400 |
/// | 3 | 110 | | 12 | 4800 |
/// | 4 | 134 | | 13 | 9600 |
/// | 5 | 150 | | 14 | 19200 (EXTA) |
/// | 6 | 200 | | 15 | 38400 (EXTB) |
/// | 7 | 300 | | 16 | 57600 |
/// | 8 | 600 | | 17 | 115200 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaudIndex(u8);

impl BaudIndex {
    const RATES: [u32; 18] = [
        0, 50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400,
        57600, 115200,
    ];

    /// Index for an exact rate in bits per second.
    #[must_use]
    pub fn from_rate(bps: u32) -> Option<Self> {
        Self::RATES
            .iter()
            .position(|&rate| rate == bps)
            .and_then(|idx| u8::try_from(idx).ok())
            .map(Self)
    }

    /// Wrap a raw table index.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        (usize::from(index) < Self::RATES.len()).then_some(Self(index))
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Rate in bits per second.
    #[must_use]
    pub const fn rate(self) -> u32 {
        Self::RATES[self.0 as usize]
    }
}

/// Raw-mode settings derived from the current ones, plus what the caller
/// needs to learn from them.
#[derive(Debug, Clone)]
pub struct RawSettings<S> {
    pub settings: S,
    pub edit: EditChars,
    pub baud: Option<BaudIndex>,
}

/// Device access for one mode-control mechanism.
pub trait TerminalDriver {
    /// Opaque snapshot of the device's line discipline.
    type Settings: Clone;

    fn kind(&self) -> DriverKind;

    /// Read the current settings.
    fn query(&mut self) -> Result<Self::Settings>;

    /// Apply settings, waiting for pending output to drain.
    fn apply(&mut self, settings: &Self::Settings) -> Result<()>;

    /// Derive raw-mode settings from `current`. Pure.
    fn make_raw(&self, current: &Self::Settings) -> RawSettings<Self::Settings>;

    /// A detached action that puts `saved` back on the device, for exit
    /// paths that cannot reach the driver (panic hook, signal thread).
    fn restorer(&self, _saved: &Self::Settings) -> Option<Restorer> {
        None
    }
}

/// Best-effort device restore runnable from any thread.
pub type Restorer = Box<dyn FnOnce() + Send>;

/// Driver for the current platform.
#[cfg(unix)]
pub type PlatformDriver = TermiosDriver;
#[cfg(not(unix))]
pub type PlatformDriver = ConsoleDriver;

/// Open the platform's mode-control driver.
pub fn open_platform_driver() -> Result<PlatformDriver> {
    PlatformDriver::open()
}

/// Raw/cooked state machine over a [`TerminalDriver`].
pub struct ModeController<D: TerminalDriver> {
    driver: D,
    saved: Option<D::Settings>,
    mode: TtyMode,
}

impl<D: TerminalDriver + fmt::Debug> fmt::Debug for ModeController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeController")
            .field("driver", &self.driver)
            .field("saved", &self.saved.is_some())
            .field("mode", &self.mode)
            .finish()
    }
}

impl<D: TerminalDriver> ModeController<D> {
    /// A controller in [`TtyMode::Cooked`] with nothing saved yet.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            saved: None,
            mode: TtyMode::Cooked,
        }
    }

    #[must_use]
    pub fn mode(&self) -> TtyMode {
        self.mode
    }

    /// The settings captured on the first raw entry.
    #[must_use]
    pub fn saved(&self) -> Option<&D::Settings> {
        self.saved.as_ref()
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Detached restore of the saved settings, once something is saved.
    #[must_use]
    pub fn restorer(&self) -> Option<Restorer> {
        self.saved.as_ref().and_then(|saved| self.driver.restorer(saved))
    }

    /// Switch modes. No-op when already in `mode`.
    ///
    /// Raw entry records the terminal's edit characters and output speed in
    /// `state`.
    ///
    /// # Errors
    ///
    /// [`ScreenError::Mode`](crate::ScreenError::Mode) when the device
    /// refuses the query or update.
    pub fn set_mode(&mut self, mode: TtyMode, state: &mut SessionState) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        match mode {
            TtyMode::Raw => {
                let current = self.driver.query()?;
                if self.saved.is_none() {
                    self.saved = Some(current.clone());
                }
                let raw = self.driver.make_raw(&current);
                self.driver.apply(&raw.settings)?;
                state.edit = raw.edit;
                state.baud = raw.baud;
            }
            TtyMode::Cooked => {
                if let Some(saved) = &self.saved {
                    self.driver.apply(saved)?;
                }
            }
        }
        self.mode = mode;
        state.mode = mode;
        tracing::info!(?mode, driver = ?self.driver.kind(), "terminal mode changed");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeDriver, FakeSettings};
    use super::*;

    #[test]
    fn baud_table() {
        assert_eq!(BaudIndex::from_rate(0).map(BaudIndex::index), Some(0));
        assert_eq!(BaudIndex::from_rate(9600).map(BaudIndex::index), Some(13));
        assert_eq!(BaudIndex::from_rate(19200).map(BaudIndex::index), Some(14));
        assert_eq!(BaudIndex::from_rate(115200).map(BaudIndex::index), Some(17));
        assert_eq!(BaudIndex::from_rate(230400), None);
        assert_eq!(BaudIndex::from_index(16).map(BaudIndex::rate), Some(57600));
        assert_eq!(BaudIndex::from_index(18), None);
    }

    #[test]
    fn raw_then_cooked_restores() {
        let mut ctl = ModeController::new(FakeDriver::new(FakeSettings::cooked()));
        let mut state = SessionState::default();

        ctl.set_mode(TtyMode::Raw, &mut state).unwrap();
        assert_eq!(ctl.mode(), TtyMode::Raw);
        assert_eq!(state.mode, TtyMode::Raw);
        assert!(!ctl.driver().device.echo);
        assert_eq!(state.edit.erase, 0x7f);
        assert_eq!(state.baud.map(BaudIndex::rate), Some(38400));

        ctl.set_mode(TtyMode::Cooked, &mut state).unwrap();
        assert_eq!(ctl.driver().device, FakeSettings::cooked());
        assert_eq!(state.mode, TtyMode::Cooked);
    }

    #[test]
    fn repeated_requests_are_noops() {
        let mut ctl = ModeController::new(FakeDriver::new(FakeSettings::cooked()));
        let mut state = SessionState::default();

        ctl.set_mode(TtyMode::Cooked, &mut state).unwrap();
        assert_eq!(ctl.driver().applies, 0);

        ctl.set_mode(TtyMode::Raw, &mut state).unwrap();
        ctl.set_mode(TtyMode::Raw, &mut state).unwrap();
        assert_eq!(ctl.driver().queries, 1);
        assert_eq!(ctl.driver().applies, 1);
    }

    #[test]
    fn snapshot_taken_once() {
        let mut ctl = ModeController::new(FakeDriver::new(FakeSettings::cooked()));
        let mut state = SessionState::default();

        ctl.set_mode(TtyMode::Raw, &mut state).unwrap();
        ctl.set_mode(TtyMode::Cooked, &mut state).unwrap();
        // Something else changes the device while we are suspended.
        ctl.driver_mut().device.opaque = 7;
        ctl.set_mode(TtyMode::Raw, &mut state).unwrap();
        assert_eq!(ctl.saved().map(|s| s.opaque), Some(0xdead_beef));
        ctl.set_mode(TtyMode::Cooked, &mut state).unwrap();
        assert_eq!(ctl.driver().device.opaque, 0xdead_beef);
    }

    #[test]
    fn query_failure_is_fatal_and_keeps_mode() {
        let mut driver = FakeDriver::new(FakeSettings::cooked());
        driver.fail_query = true;
        let mut ctl = ModeController::new(driver);
        let mut state = SessionState::default();

        let err = ctl.set_mode(TtyMode::Raw, &mut state).unwrap_err();
        assert!(err.is_mode_failure());
        assert_eq!(ctl.mode(), TtyMode::Cooked);
        assert!(ctl.saved().is_none());
    }

    #[test]
    fn apply_failure_keeps_mode() {
        let mut driver = FakeDriver::new(FakeSettings::cooked());
        driver.fail_apply = true;
        let mut ctl = ModeController::new(driver);
        let mut state = SessionState::default();

        assert!(ctl.set_mode(TtyMode::Raw, &mut state).is_err());
        assert_eq!(ctl.mode(), TtyMode::Cooked);
        assert_eq!(state.mode, TtyMode::Cooked);
    }
}
