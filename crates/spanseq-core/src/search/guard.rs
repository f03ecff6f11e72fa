//! Cooperative cancellation, deadlines and hit limits for searches.
//!
//! Streams are pulled document by document; the executor calls
//! [`QueryGuard::check`] between documents, so a cancelled or timed-out search
//! stops after at most one more document per shard.

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag to cancel a running search from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Limits of one search, shared by all shards.
#[derive(Debug)]
pub struct QueryGuard {
    token: CancellationToken,
    start_time: Instant,
    timeout: Option<Duration>,
    max_hits: usize,
    hits: AtomicUsize,
    truncated: AtomicBool,
}

impl QueryGuard {
    /// Creates a guard; a `timeout_ms` or `max_hits` of 0 disables that limit.
    #[must_use]
    pub fn new(token: CancellationToken, timeout_ms: u64, max_hits: usize) -> Self {
        Self {
            token,
            start_time: Instant::now(),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            max_hits: if max_hits == 0 { usize::MAX } else { max_hits },
            hits: AtomicUsize::new(0),
            truncated: AtomicBool::new(false),
        }
    }

    /// Creates a guard from search settings.
    #[must_use]
    pub fn from_config(config: &SearchConfig, token: CancellationToken) -> Self {
        Self::new(token, config.timeout_ms, config.max_hits)
    }

    /// Fails if the search was cancelled or ran past its deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`].
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled("cancelled by caller".to_string()));
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.start_time.elapsed();
            if elapsed > timeout {
                return Err(Error::Cancelled(format!(
                    "timed out: max={}ms, elapsed={}ms",
                    timeout.as_millis(),
                    elapsed.as_millis()
                )));
            }
        }
        Ok(())
    }

    /// Reserves room for `count` more hits and returns how many may be kept.
    /// Once the limit is reached this returns 0.
    pub fn reserve_hits(&self, count: usize) -> usize {
        let before = self.hits.fetch_add(count, Ordering::Relaxed);
        let keep = count.min(self.max_hits.saturating_sub(before));
        if keep < count {
            self.truncated.store(true, Ordering::Relaxed);
        }
        keep
    }

    /// Records that hits were left unread after the limit was reached.
    pub fn mark_truncated(&self) {
        self.truncated.store(true, Ordering::Relaxed);
    }

    /// True if hits were refused or left unread because of the hit limit.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }

    /// True once the hit limit has been reached.
    #[must_use]
    pub fn hits_exhausted(&self) -> bool {
        self.hits.load(Ordering::Relaxed) >= self.max_hits
    }

    /// Time since the search started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
