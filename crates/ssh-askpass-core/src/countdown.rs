//! Countdown for auto-dismissing confirmation prompts.
//!
//! The timer itself is plain state: the runner delivers one tick per
//! [`CountdownTimer::PERIOD`] and the session applies it. Cancellation goes
//! through a shared [`CancelToken`] so the ticker task can stop without
//! holding a reference to the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

/// Shared, one-way cancellation flag.
///
/// Cloning yields a handle to the same flag. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel. No-op if already cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether the token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of applying one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; seconds left.
    Remaining(u64),
    /// Reached zero. The timer is now cancelled.
    Expired,
    /// The timer was already cancelled; nothing happened.
    Ignored,
}

/// Single-use countdown owned by a prompt session.
#[derive(Debug)]
pub struct CountdownTimer {
    remaining: u64,
    token: CancelToken,
}

impl CountdownTimer {
    /// Interval between ticks.
    pub const PERIOD: Duration = Duration::from_secs(1);

    /// Create a countdown of `seconds`.
    pub fn new(seconds: u64) -> Self {
        Self {
            remaining: seconds,
            token: CancelToken::new(),
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns whether the countdown is still running.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// A handle to the cancellation flag, for the ticker.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Stop the countdown. Idempotent and final.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Apply one elapsed period.
    pub fn tick(&mut self) -> Tick {
        if self.token.is_cancelled() {
            return Tick::Ignored;
        }

        self.remaining = self.remaining.saturating_sub(1);
        trace!(remaining = self.remaining, "Countdown tick");

        if self.remaining == 0 {
            self.token.cancel();
            Tick::Expired
        } else {
            Tick::Remaining(self.remaining)
        }
    }
}
