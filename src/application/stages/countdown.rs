//! Countdown - the time limit of the technical stage.
//!
//! The countdown only reports expiry. Whoever waits on it decides what
//! expiry means (for the technical stage, a forced finalize).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

/// Default technical stage time limit (30 minutes).
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(1800);

/// How a wait on the countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    Expired,
    Cancelled,
}

/// A cancellable deadline.
#[derive(Debug)]
pub struct Countdown {
    deadline: Instant,
    limit: Duration,
    cancelled: AtomicBool,
    notify: Notify,
}

impl Countdown {
    /// Starts a countdown that expires after `limit`.
    pub fn start(limit: Duration) -> Self {
        Self {
            deadline: Instant::now() + limit,
            limit,
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Time left before expiry; zero once expired or cancelled.
    pub fn remaining(&self) -> Duration {
        if self.is_cancelled() {
            return Duration::ZERO;
        }
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stops the countdown and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Waits until the deadline passes or the countdown is cancelled.
    pub async fn wait(&self) -> CountdownEnd {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        // Checked after registering so a concurrent cancel is not missed
        if self.is_cancelled() {
            return CountdownEnd::Cancelled;
        }

        tokio::select! {
            _ = sleep_until(self.deadline) => {
                if self.is_cancelled() {
                    CountdownEnd::Cancelled
                } else {
                    CountdownEnd::Expired
                }
            }
            _ = &mut notified => CountdownEnd::Cancelled,
        }
    }
}
