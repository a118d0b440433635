#![forbid(unsafe_code)]

//! Pre-POSIX line disciplines: System V `termio` and Version 7 `sgttyb`.
//!
//! Both are modelled as plain-data settings records with the historical
//! field layout and flag values. Reading and writing the device is left to a
//! [`LegacyDevice`], since the ioctls involved (`TCGETA`/`TCSETAW`,
//! `TIOCGETP`/`TIOCSETN`) need raw pointer access that this crate forbids.
//!
//! | Discipline | Raw entry |
//! |------------|-----------|
//! | termio | clear `ICANON ECHO ECHOE ECHOK ECHONL`; set `OPOST ONLCR TAB3`; clear `OCRNL ONOCR ONLRET`; `VMIN=1 VTIME=0` |
//! | sgtty | set `CBREAK`; clear `ECHO XTABS` |

use std::io;

use super::{BaudIndex, CONTROL_W, DriverKind, EditChars, RawSettings, TerminalDriver};
use crate::error::{ModeOp, Result, ScreenError};

/// Device access for a legacy settings record.
pub trait LegacyDevice<S> {
    fn get(&mut self) -> io::Result<S>;
    fn set(&mut self, settings: &S) -> io::Result<()>;
}

// ── termio ──────────────────────────────────────────────────────────────

/// System V `struct termio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TermioSettings {
    pub iflag: u16,
    pub oflag: u16,
    pub cflag: u16,
    pub lflag: u16,
    pub line: u8,
    pub cc: [u8; TermioSettings::NCC],
}

impl TermioSettings {
    pub const NCC: usize = 8;

    pub const VERASE: usize = 2;
    pub const VKILL: usize = 3;
    /// Shares its slot with `VEOF` outside canonical mode.
    pub const VMIN: usize = 4;
    /// Shares its slot with `VEOL` outside canonical mode.
    pub const VTIME: usize = 5;

    pub const ICANON: u16 = 0o000002;
    pub const ECHO: u16 = 0o000010;
    pub const ECHOE: u16 = 0o000020;
    pub const ECHOK: u16 = 0o000040;
    pub const ECHONL: u16 = 0o000100;

    pub const OPOST: u16 = 0o000001;
    pub const ONLCR: u16 = 0o000004;
    pub const OCRNL: u16 = 0o000010;
    pub const ONOCR: u16 = 0o000020;
    pub const ONLRET: u16 = 0o000040;
    pub const TAB3: u16 = 0o014000;

    /// Speed bits of `cflag`.
    pub const CBAUD: u16 = 0o000017;
}

/// Mode driver for the System V `termio` interface.
#[derive(Debug)]
pub struct TermioDriver<D> {
    device: D,
}

impl<D: LegacyDevice<TermioSettings>> TermioDriver<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }
}

impl<D: LegacyDevice<TermioSettings>> TerminalDriver for TermioDriver<D> {
    type Settings = TermioSettings;

    fn kind(&self) -> DriverKind {
        DriverKind::LegacyTermio
    }

    fn query(&mut self) -> Result<TermioSettings> {
        self.device
            .get()
            .map_err(|err| ScreenError::mode(ModeOp::Query, err))
    }

    fn apply(&mut self, settings: &TermioSettings) -> Result<()> {
        self.device
            .set(settings)
            .map_err(|err| ScreenError::mode(ModeOp::Apply, err))
    }

    fn make_raw(&self, current: &TermioSettings) -> RawSettings<TermioSettings> {
        type T = TermioSettings;
        let mut raw = *current;
        raw.lflag &= !(T::ICANON | T::ECHO | T::ECHOE | T::ECHOK | T::ECHONL);
        raw.oflag |= T::OPOST | T::ONLCR | T::TAB3;
        raw.oflag &= !(T::OCRNL | T::ONOCR | T::ONLRET);
        raw.cc[T::VMIN] = 1;
        raw.cc[T::VTIME] = 0;

        let speed = current.cflag & T::CBAUD;
        RawSettings {
            settings: raw,
            edit: EditChars {
                erase: current.cc[T::VERASE],
                kill: current.cc[T::VKILL],
                werase: CONTROL_W,
            },
            baud: u8::try_from(speed).ok().and_then(BaudIndex::from_index),
        }
    }
}

// ── sgtty ───────────────────────────────────────────────────────────────

/// Version 7 `struct sgttyb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SgttySettings {
    pub ispeed: u8,
    pub ospeed: u8,
    pub erase: u8,
    pub kill: u8,
    pub flags: u16,
}

impl SgttySettings {
    pub const CBREAK: u16 = 0o000002;
    pub const ECHO: u16 = 0o000010;
    pub const CRMOD: u16 = 0o000020;
    pub const RAW: u16 = 0o000040;
    pub const XTABS: u16 = 0o006000;
}

/// Mode driver for the Version 7 `sgttyb` interface.
#[derive(Debug)]
pub struct SgttyDriver<D> {
    device: D,
}

impl<D: LegacyDevice<SgttySettings>> SgttyDriver<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }
}

impl<D: LegacyDevice<SgttySettings>> TerminalDriver for SgttyDriver<D> {
    type Settings = SgttySettings;

    fn kind(&self) -> DriverKind {
        DriverKind::LegacySgtty
    }

    fn query(&mut self) -> Result<SgttySettings> {
        self.device
            .get()
            .map_err(|err| ScreenError::mode(ModeOp::Query, err))
    }

    fn apply(&mut self, settings: &SgttySettings) -> Result<()> {
        self.device
            .set(settings)
            .map_err(|err| ScreenError::mode(ModeOp::Apply, err))
    }

    fn make_raw(&self, current: &SgttySettings) -> RawSettings<SgttySettings> {
        let mut raw = *current;
        raw.flags |= SgttySettings::CBREAK;
        raw.flags &= !(SgttySettings::ECHO | SgttySettings::XTABS);
        RawSettings {
            settings: raw,
            edit: EditChars {
                erase: current.erase,
                kill: current.kill,
                werase: CONTROL_W,
            },
            baud: BaudIndex::from_index(current.ospeed),
        }
    }
}
