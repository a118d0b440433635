#![forbid(unsafe_code)]

//! Terminal control for a pager: capability resolution, raw/cooked mode
//! switching, key tables, and screen primitives.
//!
//! A [`session::ScreenSession`] ties the pieces together for the lifetime of
//! a pager run. The modules are usable on their own: [`resolver::resolve`]
//! is a pure function of its inputs, [`tty::ModeController`] works over any
//! [`tty::TerminalDriver`], and [`screen::Screen`] writes to any
//! [`std::io::Write`].

pub mod attr;
pub mod capabilities;
pub mod cost;
pub mod database;
pub mod error;
pub mod keys;
pub mod options;
pub mod resolver;
pub mod screen;
pub mod session;
pub mod state;
pub mod tty;

pub use capabilities::{CapSource, Geometry, Missing, TerminalCapabilities};
pub use error::{Result, ScreenError};
pub use keys::{CommandAction, EditAction, KeyMatch, KeyTables};
pub use options::ScreenOptions;
pub use screen::Screen;
pub use session::ScreenSession;
pub use state::SessionState;
