//! Cancellation signal shared between the signal handler and the polling thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Cloneable, one-shot stop request.
///
/// The polling loop checks it between iterations and sleeps on it during
/// backoff and pacing, so a stop request interrupts those waits at once.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: Mutex<bool>,
    cvar: Condvar,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake any waiter.
    pub fn trigger(&self) {
        *self.inner.triggered.lock() = true;
        self.inner.cvar.notify_all();
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.inner.triggered.lock()
    }

    /// Sleep for up to `duration`, returning early if a stop is requested.
    ///
    /// Returns `true` if a stop has been requested.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let mut triggered = self.inner.triggered.lock();
        if *triggered || duration.is_zero() {
            return *triggered;
        }

        let deadline = Instant::now() + duration;
        while !*triggered {
            if self.inner.cvar.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }
        *triggered
    }
}
