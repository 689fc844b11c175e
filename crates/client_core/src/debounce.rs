//! Single-slot debounce timer.
//!
//! At most one value is pending. Scheduling again replaces the value and
//! restarts the quiet window, so only the last call inside the window is
//! ever delivered. Time is read from tokio's clock so tests can pause it.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    deadline: Instant,
    value: T,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Cancels whatever is pending and starts a fresh window for `value`.
    pub fn schedule(&mut self, value: T) {
        self.pending = Some(Pending {
            deadline: Instant::now() + self.quiet,
            value,
        });
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Takes the pending value if its window has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Waits for the pending window to elapse. Never resolves while nothing is pending.
    pub async fn fired(&mut self) -> T {
        loop {
            match self.deadline() {
                Some(deadline) => {
                    sleep_until(deadline).await;
                    if let Some(value) = self.take_due(Instant::now()) {
                        return value;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none. Handy as a
/// `select!` branch that must not borrow the owner of the debouncer.
pub async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
