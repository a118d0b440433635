#![forbid(unsafe_code)]

//! Error taxonomy for terminal session control.
//!
//! Only failures that must abort a session surface here. Unresolvable
//! capabilities, unknown terminal types, and unavailable geometry are all
//! absorbed by the resolver and reported through
//! [`TerminalCapabilities::missing`](crate::TerminalCapabilities::missing)
//! or the default dimensions instead.

use std::io;

/// Which half of a device mode exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOp {
    /// Reading the current line discipline settings.
    Query,
    /// Applying new (or restored) settings.
    Apply,
}

impl std::fmt::Display for ModeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// Errors that can abort a terminal session.
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    /// The terminal device refused a mode query or update. Keystroke input
    /// cannot be trusted without raw mode, so the session cannot start.
    #[error("failed to {op} terminal mode: {source}")]
    Mode {
        op: ModeOp,
        #[source]
        source: io::Error,
    },

    /// Writing a control sequence to the output failed.
    #[error("terminal write failed: {0}")]
    Io(#[from] io::Error),

    /// Termination-signal handlers could not be registered.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),
}

impl ScreenError {
    pub(crate) fn mode(op: ModeOp, source: impl Into<io::Error>) -> Self {
        Self::Mode {
            op,
            source: source.into(),
        }
    }

    /// Returns `true` for failures of the device mode exchange.
    #[must_use]
    pub fn is_mode_failure(&self) -> bool {
        matches!(self, Self::Mode { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScreenError>;
