//! Reconnection strategies
//!
//! When the socket drops, the transport asks its strategy whether to open a
//! replacement and how long to pause afterwards. The attempt number handed
//! to the strategy counts every reconnection the transport has made so far;
//! it is never reset, not even after a successful reconnect, so the ceiling
//! bounds the total over the transport's lifetime.
//!
//! # Built-in Strategies
//!
//! - **FixedDelay**: constant pause, optional ceiling (the default: 500ms, 240 attempts)
//! - **ExponentialBackoff**: doubling pause capped at a maximum
//! - **NoReconnect**: never reconnect
//!
//! # Examples
//!
//! ```rust
//! use resock_transport::{FixedDelay, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let mut strategy = FixedDelay::default();
//! assert_eq!(strategy.next_delay(0), Some(Duration::from_millis(500)));
//! assert_eq!(strategy.next_delay(239), Some(Duration::from_millis(500)));
//! assert_eq!(strategy.next_delay(240), None);
//! ```

use resock_core::util::duration_to_millis;
use std::time::Duration;

/// Default ceiling on reconnection attempts
pub const DEFAULT_RECONNECT_CEILING: u32 = 240;

/// Default pause after each reconnection attempt
pub const DEFAULT_RECONNECT_PAUSE: Duration = Duration::from_millis(500);

/// Decides whether and how to reconnect
pub trait ReconnectionStrategy: Send + Sync {
    /// Pause to apply after reconnection attempt number `attempt` (0-indexed)
    ///
    /// The replacement socket is opened first; the returned duration then
    /// delays handling of the next socket event. `None` means give up for
    /// good.
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;
}

/// Exponential backoff strategy with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            max_attempts: None,
            jitter: false,
        }
    }

    /// Set the maximum number of attempts before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random extra delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_PAUSE, Duration::from_secs(30))
            .with_max_attempts(DEFAULT_RECONNECT_CEILING)
            .with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        // min_delay * 2^attempt, saturating so huge attempt numbers stay at the cap
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let base_delay = duration_to_millis(self.min_delay).saturating_mul(factor);
        let delay = std::cmp::min(base_delay, duration_to_millis(self.max_delay));

        if self.jitter {
            use rand::Rng;
            let jitter_ms = rand::thread_rng().gen_range(0..=(delay / 4));
            return Some(Duration::from_millis(delay + jitter_ms));
        }

        Some(Duration::from_millis(delay))
    }
}

/// Fixed delay strategy
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Create a fixed delay strategy without a ceiling
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Set the maximum number of attempts before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for FixedDelay {
    /// 500ms pause, at most 240 attempts
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_PAUSE).with_max_attempts(DEFAULT_RECONNECT_CEILING)
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }
        Some(self.delay)
    }
}

/// Strategy that never reconnects
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&mut self, _attempt: u32) -> Option<Duration> {
        None
    }
}
