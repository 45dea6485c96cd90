//! Per-identity sliding-window admission control.
//!
//! An identity may make at most `max_calls` admitted calls within the trailing
//! `window`. Each identity keeps the timestamps of its admitted calls still
//! inside the window; rejected calls are not recorded. [`RateLimiter::sweep`]
//! drops identities whose window has emptied, so idle callers cost nothing.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit one call for `identity` at `now`.
    pub fn admit(&self, identity: &str, now: Instant) -> bool {
        let mut history = self.lock();
        let calls = history.entry(identity.to_string()).or_default();
        purge(calls, now, self.window);

        if calls.len() >= self.max_calls {
            tracing::debug!(identity, max_calls = self.max_calls, "Rate limit reached");
            if calls.is_empty() {
                history.remove(identity);
            }
            return false;
        }

        calls.push_back(now);
        true
    }

    /// Drop every identity with no calls left in the window.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut history = self.lock();
        let before = history.len();
        history.retain(|_, calls| {
            purge(calls, now, self.window);
            !calls.is_empty()
        });
        before - history.len()
    }

    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        // The map holds no invariants a panicking holder could break.
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn purge(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while calls
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= window)
    {
        calls.pop_front();
    }
}
