#![forbid(unsafe_code)]

//! Scoped ownership of the terminal for one pager session.
//!
//! [`ScreenSession`] enters raw mode, resolves capabilities at the speed the
//! line discipline reports, builds the key tables, and sends the terminal
//! init sequences. Everything it changed is put back when it goes away.
//!
//! # Lifecycle Guarantees
//!
//! 1. **Drop restores the terminal** - deinit sequences first, then the
//!    cooked line discipline saved on raw entry.
//! 2. **Cleanup runs once** - [`ScreenSession::close`], `Drop`, the panic
//!    hook, and the signal thread share one restored flag. Whichever runs
//!    first puts the terminal back; the others skip the device.
//! 3. **Panic safety** - a process-wide panic hook writes the deinit
//!    sequences to stdout and restores the saved settings before the
//!    previous hook runs, so the panic message lands on a cooked terminal.
//! 4. **Termination signals** - SIGINT and SIGTERM run the same emergency
//!    cleanup and exit with `128 + signal`. SIGWINCH only marks a resize.
//!
//! # Suspend / resume
//!
//! | Step | Suspend | Resume |
//! |------|---------|--------|
//! | 1 | deinit, flush | raw mode |
//! | 2 | cooked mode | init |
//!
//! The caller stops the process between the two.
//!
//! # Usage
//!
//! ```no_run
//! use termscreen::options::ScreenOptions;
//! use termscreen::session::ScreenSession;
//!
//! let mut session = ScreenSession::open(ScreenOptions::default())?;
//! let mut screen = session.screen();
//! screen.clear()?;
//! screen.so_enter()?;
//! std::io::Write::write_all(&mut screen, b"(END)")?;
//! screen.so_exit()?;
//! screen.flush()?;
//! drop(screen);
//! session.close()?;
//! # Ok::<(), termscreen::ScreenError>(())
//! ```

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

#[cfg(unix)]
use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGWINCH};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::capabilities::TerminalCapabilities;
use crate::error::{Result, ScreenError};
use crate::keys::KeyTables;
use crate::options::ScreenOptions;
use crate::resolver::{ResolveInputs, resolve_geometry};
use crate::screen::Screen;
use crate::state::SessionState;
use crate::tty::{
    ModeController, PlatformDriver, Restorer, TerminalDriver, TtyMode, open_platform_driver,
};

/// What the panic hook and signal thread undo when the session cannot.
struct EmergencyCleanup {
    deinit: Vec<u8>,
    restore: Option<Restorer>,
    restored: Arc<AtomicBool>,
}

/// One slot per process; the most recently armed session owns it.
static EMERGENCY: Mutex<Option<EmergencyCleanup>> = Mutex::new(None);

fn arm_emergency(cleanup: EmergencyCleanup) {
    *EMERGENCY.lock().unwrap_or_else(PoisonError::into_inner) = Some(cleanup);
}

fn disarm_emergency() {
    EMERGENCY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

fn best_effort_cleanup() {
    let pending = EMERGENCY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    let Some(pending) = pending else {
        return;
    };
    if pending.restored.swap(true, Ordering::AcqRel) {
        return;
    }
    let mut stdout = io::stdout();
    let _ = stdout.write_all(&pending.deinit);
    let _ = stdout.flush();
    if let Some(restore) = pending.restore {
        restore();
    }
}

#[cfg(unix)]
#[derive(Debug)]
struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalGuard {
    fn new(resize: Arc<AtomicBool>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGWINCH]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let thread = std::thread::spawn(move || {
            for signal in signals.forever() {
                match signal {
                    SIGWINCH => {
                        tracing::debug!("SIGWINCH received");
                        resize.store(true, Ordering::Release);
                    }
                    SIGINT | SIGTERM => {
                        tracing::warn!(signal, "termination signal received, restoring terminal");
                        best_effort_cleanup();
                        std::process::exit(128 + signal);
                    }
                    _ => {}
                }
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// The terminal, held in raw mode with init sent, for the guard's lifetime.
pub struct ScreenSession<W: Write, D: TerminalDriver> {
    options: ScreenOptions,
    caps: TerminalCapabilities,
    keys: KeyTables,
    state: SessionState,
    controller: ModeController<D>,
    out: W,
    resize: Arc<AtomicBool>,
    restored: Arc<AtomicBool>,
    #[cfg(unix)]
    signals: Option<SignalGuard>,
    closed: bool,
}

impl ScreenSession<io::Stdout, PlatformDriver> {
    /// Take over the controlling terminal, writing to stdout.
    ///
    /// # Errors
    ///
    /// [`ScreenError::Mode`] when the terminal cannot be put in raw mode,
    /// [`ScreenError::Signal`] when handlers cannot be installed, and
    /// [`ScreenError::Io`] when the init sequences cannot be written.
    pub fn open(options: ScreenOptions) -> Result<Self> {
        let driver = open_platform_driver()?;
        Self::with_parts(options, driver, io::stdout(), |opts, state| {
            TerminalCapabilities::detect(opts, state.baud_rate())
        })
    }
}

impl<W: Write, D: TerminalDriver> ScreenSession<W, D> {
    /// Build a session from explicit parts.
    ///
    /// `capabilities` runs once, after raw entry, so it can see the output
    /// speed the driver reported.
    ///
    /// # Errors
    ///
    /// As for [`ScreenSession::open`]. Any step that already changed the
    /// terminal is undone before the error is returned.
    pub fn with_parts(
        options: ScreenOptions,
        driver: D,
        out: W,
        capabilities: impl FnOnce(&ScreenOptions, &SessionState) -> TerminalCapabilities,
    ) -> Result<Self> {
        let mut controller = ModeController::new(driver);
        let mut state = SessionState::default();
        controller.set_mode(TtyMode::Raw, &mut state)?;

        let caps = capabilities(&options, &state);
        let keys = KeyTables::for_terminal(&caps, &state.edit);
        if caps.missing_cap() {
            tracing::warn!(term = %caps.term, missing = ?caps.missing, "terminal lacks capabilities");
        }

        let handle_signals = options.handle_signals;
        let mut session = Self {
            options,
            caps,
            keys,
            state,
            controller,
            out,
            resize: Arc::new(AtomicBool::new(false)),
            restored: Arc::new(AtomicBool::new(false)),
            #[cfg(unix)]
            signals: None,
            closed: false,
        };

        install_panic_hook();
        #[cfg(unix)]
        if handle_signals {
            let guard = SignalGuard::new(Arc::clone(&session.resize)).map_err(ScreenError::Signal)?;
            session.signals = Some(guard);
        }
        #[cfg(not(unix))]
        let _ = handle_signals;

        session.screen().init()?;
        session.out.flush()?;
        session.arm();
        tracing::info!(
            term = %session.caps.term,
            source = ?session.caps.source,
            width = session.caps.width(),
            height = session.caps.height(),
            "screen session opened"
        );
        Ok(session)
    }

    /// Primitive dispatcher writing to the session's output.
    pub fn screen(&mut self) -> Screen<'_, W> {
        Screen::new(&self.caps, &self.options, &mut self.state, &mut self.out)
    }

    #[must_use]
    pub fn capabilities(&self) -> &TerminalCapabilities {
        &self.caps
    }

    #[must_use]
    pub fn keys(&self) -> &KeyTables {
        &self.keys
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> &ScreenOptions {
        &self.options
    }

    #[must_use]
    pub fn mode(&self) -> TtyMode {
        self.controller.mode()
    }

    /// Shared flag the signal thread sets on SIGWINCH.
    #[must_use]
    pub fn resize_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.resize)
    }

    /// Consume a pending resize notification.
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::AcqRel)
    }

    /// Re-query the screen size. Returns `true` when it changed.
    pub fn refresh_geometry(&mut self) -> bool {
        let inputs = ResolveInputs::from_env(&self.options);
        self.refresh_geometry_with(&inputs)
    }

    /// Re-resolve the screen size from a given snapshot. Only geometry
    /// dependent strings change.
    pub fn refresh_geometry_with(&mut self, inputs: &ResolveInputs) -> bool {
        let geometry = resolve_geometry(inputs, None, self.caps.geometry);
        if geometry == self.caps.geometry {
            return false;
        }
        self.caps = self.caps.resized(geometry);
        true
    }

    /// Hand the terminal back before the process stops.
    ///
    /// # Errors
    ///
    /// [`ScreenError::Io`] or [`ScreenError::Mode`] from the deinit write or
    /// the cooked-mode restore.
    pub fn suspend(&mut self) -> Result<()> {
        disarm_emergency();
        self.screen().deinit()?;
        self.out.flush()?;
        self.controller.set_mode(TtyMode::Cooked, &mut self.state)?;
        tracing::info!("screen session suspended");
        Ok(())
    }

    /// Take the terminal back after [`suspend`](Self::suspend).
    ///
    /// # Errors
    ///
    /// As for [`suspend`](Self::suspend).
    pub fn resume(&mut self) -> Result<()> {
        self.controller.set_mode(TtyMode::Raw, &mut self.state)?;
        self.screen().init()?;
        self.out.flush()?;
        self.arm();
        tracing::info!("screen session resumed");
        Ok(())
    }

    /// Restore the terminal now and report failures, instead of leaving it to
    /// `Drop`.
    ///
    /// # Errors
    ///
    /// The first failure among deinit, flush, and cooked-mode restore.
    pub fn close(mut self) -> Result<()> {
        self.cleanup()
    }

    fn arm(&mut self) {
        let mut state = self.state.clone();
        let mut deinit = Vec::new();
        if Screen::new(&self.caps, &self.options, &mut state, &mut deinit)
            .deinit()
            .is_err()
        {
            deinit.clear();
        }
        arm_emergency(EmergencyCleanup {
            deinit,
            restore: self.controller.restorer(),
            restored: Arc::clone(&self.restored),
        });
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        disarm_emergency();

        if self.restored.swap(true, Ordering::AcqRel) {
            #[cfg(unix)]
            drop(self.signals.take());
            self.state.reset();
            tracing::debug!("terminal already restored by the emergency path");
            return Ok(());
        }

        let deinit = self
            .screen()
            .deinit()
            .and_then(|()| self.out.flush().map_err(ScreenError::from));
        let cooked = self.controller.set_mode(TtyMode::Cooked, &mut self.state);

        #[cfg(unix)]
        drop(self.signals.take());
        self.state.reset();
        tracing::info!("screen session closed");
        deinit.and(cooked)
    }
}

impl<W: Write, D: TerminalDriver> Drop for ScreenSession<W, D> {
    fn drop(&mut self) {
        if let Err(err) = self.cleanup() {
            tracing::warn!(error = %err, "terminal restore failed");
        }
    }
}
