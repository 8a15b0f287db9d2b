//! Per-user send rate limiting.
//!
//! Fixed-window counter keyed by user ID. The limiter is constructed once at
//! service start and shared via `Arc`; a background sweeper purges expired
//! windows so the map stays bounded. State is process-local and resets on
//! restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for send rate limiting.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum sends allowed per window.
    pub max_per_window: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Create a configuration from a ceiling and a window in seconds.
    pub fn new(max_per_window: u32, window_secs: u64) -> Self {
        Self {
            max_per_window,
            window: Duration::seconds(window_secs as i64),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // 50 sends per hour
        Self::new(50, 3600)
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the send may proceed.
    pub allowed: bool,
    /// Sends left in the current window after this call.
    pub remaining: u32,
    /// When the current window ends.
    pub reset_at: DateTime<Utc>,
}

/// Send counter for a single user's current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

impl Window {
    fn is_expired(&self, now: DateTime<Utc>, length: Duration) -> bool {
        now - self.started_at > length
    }
}

/// Fixed-window rate limiter keyed by user ID.
///
/// Check-and-increment is atomic: the whole map is guarded by one mutex, so
/// concurrent sends from the same user cannot both slip under the ceiling.
///
/// # Example
///
/// ```
/// use outpost::rate_limit::{RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(RateLimitConfig::new(50, 3600));
/// let decision = limiter.check_and_consume(1);
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 49);
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<i64, Window>>,
}

impl RateLimiter {
    /// Create a rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Check the user's quota and consume one send from it.
    ///
    /// Starts a fresh window when none exists or the previous one has
    /// expired. A rejected call does not increment the counter.
    pub fn check_and_consume(&self, user_id: i64) -> RateLimitDecision {
        self.check_and_consume_at(user_id, Utc::now())
    }

    // Clock-injected variant so window expiry is testable without sleeping.
    fn check_and_consume_at(&self, user_id: i64, now: DateTime<Utc>) -> RateLimitDecision {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        let window = windows.entry(user_id).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if window.is_expired(now, self.config.window) {
            *window = Window {
                count: 0,
                started_at: now,
            };
        }

        let reset_at = window.started_at + self.config.window;

        if window.count >= self.config.max_per_window {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.config.max_per_window - window.count,
            reset_at,
        }
    }

    /// Remove entries whose window has expired.
    ///
    /// Returns the number of entries removed. Never removes a mid-window
    /// entry, so it is safe to run at any time.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| !w.is_expired(now, self.config.window));
        before - windows.len()
    }

    /// Number of users currently tracked.
    pub fn tracked_users(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Window length, for scheduling the sweeper.
    pub fn window(&self) -> Duration {
        self.config.window
    }
}

/// Handle to the background sweeper task.
///
/// Dropping the handle without calling [`SweeperHandle::shutdown`] aborts the
/// task when the runtime shuts down.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the periodic sweep task for a shared limiter.
///
/// Runs once per window length until shut down.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>) -> SweeperHandle {
    let (stop, mut stopped) = watch::channel(false);
    let period = limiter
        .window()
        .to_std()
        .unwrap_or(StdDuration::from_secs(3600));

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately; skip it.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = limiter.sweep();
                    if removed > 0 {
                        debug!("rate limit sweep removed {removed} expired windows");
                    }
                }
                _ = stopped.changed() => break,
            }
        }
    });

    SweeperHandle { stop, task }
}
