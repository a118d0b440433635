#![forbid(unsafe_code)]

//! Mutable per-session terminal state.

use crate::tty::{BaudIndex, EditChars, TtyMode};

/// What the session has learned from, and done to, the terminal.
///
/// Written by the mode controller (edit characters, speed, mode) and by the
/// screen dispatcher (`init_done`); read by everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub edit: EditChars,
    pub mode: TtyMode,
    /// The init sequences have been sent and deinit is owed.
    pub init_done: bool,
    /// Output speed learned on raw entry.
    pub baud: Option<BaudIndex>,
}

impl SessionState {
    /// Output speed in bits per second, 0 when unknown.
    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.baud.map_or(0, BaudIndex::rate)
    }

    /// Forget everything learned; used once the terminal is handed back.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_speed_is_zero() {
        let mut state = SessionState::default();
        assert_eq!(state.baud_rate(), 0);
        state.baud = BaudIndex::from_rate(2400);
        assert_eq!(state.baud_rate(), 2400);
        state.init_done = true;
        state.reset();
        assert_eq!(state, SessionState::default());
    }
}
