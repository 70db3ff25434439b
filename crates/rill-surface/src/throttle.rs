//! Trailing-edge throttle
//!
//! The first call arms a deadline `delay` in the future; later calls before the
//! deadline only replace the pending argument. The value comes out of
//! [`TrailingThrottle::poll`] once the deadline has passed, so the wrapped
//! action runs at most once per `delay` and always sees the latest argument.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct TrailingThrottle<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> TrailingThrottle<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `arg`, keeping an already armed deadline
    pub fn call(&mut self, now: Instant, arg: T) {
        let deadline = match self.pending.take() {
            Some((deadline, _)) => deadline,
            None => now + self.delay,
        };
        self.pending = Some((deadline, arg));
    }

    /// Take the pending argument if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.pending.take().map(|(_, arg)| arg),
            _ => None,
        }
    }

    /// Drop the pending call
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, arg)| arg)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }
}
