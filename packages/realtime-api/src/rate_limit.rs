use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_EVENTS: usize = 20;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Sliding-window limiter for one connection's move/search traffic.
/// Owned by the connection's read task, so no locking is involved.
/// Violations are reported to the sender; the connection stays open.
pub struct RateLimiter {
    max_events: usize,
    window: Duration,
    events: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_events: usize, window: Duration) -> Self {
        RateLimiter {
            max_events,
            window,
            events: VecDeque::new(),
        }
    }

    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.events.front() {
            if now.duration_since(oldest) >= self.window {
                self.events.pop_front();
            } else {
                break;
            }
        }
        if self.events.len() >= self.max_events {
            return false;
        }
        self.events.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(DEFAULT_MAX_EVENTS, DEFAULT_WINDOW)
    }
}
