use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies one scheduled one-shot timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// One-shot timers plus the clock they run on. A fired timer comes back to
/// the session as `Command::TimerFired(token)`; a cancelled one never does.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken);
    fn cancel(&mut self, token: TimerToken);
    /// Monotonic time since the scheduler was created.
    fn now(&self) -> Duration;
}

/// Virtual-time scheduler. Time only moves when [`TimerQueue::advance`] is
/// called, which makes round timing reproducible.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    pending: Vec<(Duration, TimerToken)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward and returns every token that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerToken> {
        self.now += by;
        let now = self.now;
        let mut due = Vec::new();
        self.pending.retain(|(at, token)| {
            if *at <= now {
                due.push((*at, *token));
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, token)| token).collect()
    }

    pub fn is_scheduled(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|(_, pending)| *pending == token)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        self.pending.push((self.now + delay, token));
    }

    fn cancel(&mut self, token: TimerToken) {
        self.pending.retain(|(_, pending)| *pending != token);
    }

    fn now(&self) -> Duration {
        self.now
    }
}
