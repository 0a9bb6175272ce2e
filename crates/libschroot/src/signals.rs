//! Cancellation requests delivered by signal.
//!
//! SIGINT, SIGTERM and SIGHUP set flags that the engine polls at safe
//! points; during command execution the pending signal is forwarded to the
//! child instead. Teardown never aborts on a signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

#[derive(Debug, Clone, Default)]
pub struct SignalState {
    int: Arc<AtomicBool>,
    term: Arc<AtomicBool>,
    hup: Arc<AtomicBool>,
}

impl SignalState {
    /// Install handlers for the cancellation signals.
    pub fn install() -> std::io::Result<Self> {
        let state = Self::default();
        signal_hook::flag::register(SIGINT, Arc::clone(&state.int))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&state.term))?;
        signal_hook::flag::register(SIGHUP, Arc::clone(&state.hup))?;
        Ok(state)
    }

    /// Whether any cancellation signal has arrived.
    pub fn cancel_requested(&self) -> bool {
        self.int.load(Ordering::Relaxed)
            || self.term.load(Ordering::Relaxed)
            || self.hup.load(Ordering::Relaxed)
    }

    /// Take the pending signal, clearing its flag, so a later arrival can
    /// be told apart from the one already acted on.
    pub fn take_pending(&self) -> Option<i32> {
        for (flag, signal) in [
            (&self.int, SIGINT),
            (&self.term, SIGTERM),
            (&self.hup, SIGHUP),
        ] {
            if flag.swap(false, Ordering::Relaxed) {
                return Some(signal);
            }
        }
        None
    }

    #[cfg(test)]
    pub fn raise_for_test(&self, signal: i32) {
        match signal {
            SIGINT => self.int.store(true, Ordering::Relaxed),
            SIGTERM => self.term.store(true, Ordering::Relaxed),
            SIGHUP => self.hup.store(true, Ordering::Relaxed),
            _ => {}
        }
    }
}
