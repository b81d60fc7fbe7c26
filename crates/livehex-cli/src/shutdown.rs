use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

/// Stop request shared by Ctrl+C, the keyboard monitor and the polling loop.
///
/// Waits return as soon as the signal fires instead of sleeping out the
/// whole poll interval.
#[derive(Default)]
pub struct ShutdownSignal {
    triggered: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal wired to Ctrl+C.
    pub fn with_ctrlc() -> Result<Arc<Self>> {
        let signal = Arc::new(Self::new());
        let handler = Arc::clone(&signal);
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, stopping...");
            handler.trigger();
        })
        .context("Failed to install Ctrl+C handler")?;
        Ok(signal)
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless the signal fires first.
    ///
    /// Returns `true` when woken by the signal.
    pub fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let Ok(guard) = self.mutex.lock() else {
            return true;
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok((_, timeout)) => !timeout.timed_out(),
            Err(_) => true,
        }
    }
}
