#![forbid(unsafe_code)]

//! POSIX termios driver on the controlling terminal.

use std::fs::{File, OpenOptions};

use nix::sys::termios::{
    self, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices, Termios,
};

use super::{
    BaudIndex, DriverKind, EditChars, RawSettings, Restorer, TerminalDriver,
};
use crate::error::{ModeOp, Result, ScreenError};

#[cfg(any(target_os = "linux", target_os = "android"))]
const TAB_EXPANSION: OutputFlags = OutputFlags::XTABS;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
const TAB_EXPANSION: OutputFlags = OutputFlags::OXTABS;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
const TAB_EXPANSION: OutputFlags = OutputFlags::empty();

/// Output remappings raw mode turns off.
fn spurious_output_mappings() -> OutputFlags {
    #[allow(unused_mut)]
    let mut flags = OutputFlags::OCRNL | OutputFlags::ONOCR | OutputFlags::ONLRET;
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd"
    ))]
    {
        flags |= OutputFlags::ONOEOT;
    }
    flags
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn output_rate(settings: &Termios) -> u32 {
    use termios::BaudRate;
    match termios::cfgetospeed(settings) {
        BaudRate::B0 => 0,
        BaudRate::B50 => 50,
        BaudRate::B75 => 75,
        BaudRate::B110 => 110,
        BaudRate::B134 => 134,
        BaudRate::B150 => 150,
        BaudRate::B200 => 200,
        BaudRate::B300 => 300,
        BaudRate::B600 => 600,
        BaudRate::B1200 => 1200,
        BaudRate::B1800 => 1800,
        BaudRate::B2400 => 2400,
        BaudRate::B4800 => 4800,
        BaudRate::B9600 => 9600,
        BaudRate::B19200 => 19200,
        BaudRate::B38400 => 38400,
        BaudRate::B57600 => 57600,
        BaudRate::B115200 => 115200,
        _ => u32::MAX,
    }
}

// Speeds are plain numbers on the BSDs.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn output_rate(settings: &Termios) -> u32 {
    termios::cfgetospeed(settings)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn output_rate(_settings: &Termios) -> u32 {
    u32::MAX
}

fn cc(settings: &Termios, index: SpecialCharacterIndices) -> u8 {
    settings.control_chars[index as usize]
}

/// Raw-mode settings for keystroke input without echo.
pub(crate) fn raw_termios(current: &Termios) -> RawSettings<Termios> {
    let mut raw = current.clone();

    raw.local_flags &= !(LocalFlags::ICANON
        | LocalFlags::ECHO
        | LocalFlags::ECHOE
        | LocalFlags::ECHOK
        | LocalFlags::ECHONL);
    raw.output_flags |= OutputFlags::OPOST | OutputFlags::ONLCR | TAB_EXPANSION;
    raw.output_flags &= !spurious_output_mappings();

    raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    raw.control_chars[SpecialCharacterIndices::VLNEXT as usize] = 0;
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd"
    ))]
    {
        raw.control_chars[SpecialCharacterIndices::VDSUSP as usize] = 0;
    }

    // A disabled werase reads as 0 and stays 0, so no word-erase key is bound.
    let edit = EditChars {
        erase: cc(current, SpecialCharacterIndices::VERASE),
        kill: cc(current, SpecialCharacterIndices::VKILL),
        werase: cc(current, SpecialCharacterIndices::VWERASE),
    };

    RawSettings {
        settings: raw,
        edit,
        baud: BaudIndex::from_rate(output_rate(current)),
    }
}

/// Termios access to a terminal device.
#[derive(Debug)]
pub struct TermiosDriver {
    tty: File,
}

impl TermiosDriver {
    /// Open the controlling terminal.
    ///
    /// # Errors
    ///
    /// [`ScreenError::Mode`] when there is no controlling terminal.
    pub fn open() -> Result<Self> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .map_err(|err| ScreenError::mode(ModeOp::Query, err))?;
        Ok(Self { tty })
    }

    /// Drive an already open terminal device.
    #[must_use]
    pub fn from_file(tty: File) -> Self {
        Self { tty }
    }
}

impl TerminalDriver for TermiosDriver {
    type Settings = Termios;

    fn kind(&self) -> DriverKind {
        DriverKind::PosixTermios
    }

    fn query(&mut self) -> Result<Termios> {
        termios::tcgetattr(&self.tty).map_err(|errno| ScreenError::mode(ModeOp::Query, errno))
    }

    fn apply(&mut self, settings: &Termios) -> Result<()> {
        termios::tcsetattr(&self.tty, SetArg::TCSADRAIN, settings)
            .map_err(|errno| ScreenError::mode(ModeOp::Apply, errno))
    }

    fn make_raw(&self, current: &Termios) -> RawSettings<Termios> {
        raw_termios(current)
    }

    fn restorer(&self, saved: &Termios) -> Option<Restorer> {
        let tty = self.tty.try_clone().ok()?;
        let saved = saved.clone();
        Some(Box::new(move || {
            if let Err(errno) = termios::tcsetattr(&tty, SetArg::TCSANOW, &saved) {
                tracing::warn!(%errno, "emergency terminal restore failed");
            }
        }))
    }
}
