//! Provider quota tracking
//!
//! Process-wide rolling-window request counters, one per provider
//! account, shared across concurrent requests. A depleted provider
//! fails fast into its fallback instead of burning the remainder of
//! the window on doomed calls.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ProviderQuota {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl ProviderQuota {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Evict expired entries and claim a slot in one locked step.
    /// Returns false when the window is saturated.
    pub fn try_acquire(&self) -> bool {
        let mut stamps = self
            .timestamps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        while stamps
            .front()
            .map_or(false, |t| now.duration_since(*t) >= self.window)
        {
            stamps.pop_front();
        }

        if stamps.len() >= self.max_requests {
            return false;
        }

        stamps.push_back(now);
        true
    }

    /// Requests still available in the current window.
    pub fn remaining(&self) -> usize {
        let mut stamps = self
            .timestamps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        while stamps
            .front()
            .map_or(false, |t| now.duration_since(*t) >= self.window)
        {
            stamps.pop_front();
        }

        self.max_requests.saturating_sub(stamps.len())
    }
}
