use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreCounters {
    pub total: u32,
    pub correct: u32,
    pub streak: u32,
}

impl ScoreCounters {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
            self.streak += 1;
        } else {
            self.streak = 0;
        }
    }

    pub fn incorrect(&self) -> u32 {
        self.total - self.correct
    }

    /// Rounded percentage of correct answers, `None` before the first answer.
    pub fn accuracy(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        Some((self.correct as f64 / self.total as f64 * 100.0).round() as u32)
    }

    /// Correct answers per minute. Zero until there is a correct answer and
    /// some elapsed time.
    pub fn rate_per_minute(&self, elapsed: Duration) -> f64 {
        let minutes = elapsed.as_secs_f64() / 60.0;
        if self.correct == 0 || minutes <= 0.0 {
            return 0.0;
        }
        self.correct as f64 / minutes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreboardSnapshot {
    pub correct: u32,
    pub total: u32,
    pub streak: u32,
    pub accuracy: Option<u32>,
    /// `None` when the session has no start time yet.
    pub rate_per_minute: Option<f64>,
}

impl ScoreboardSnapshot {
    pub fn new(counters: &ScoreCounters, elapsed: Option<Duration>) -> Self {
        Self {
            correct: counters.correct,
            total: counters.total,
            streak: counters.streak,
            accuracy: counters.accuracy(),
            rate_per_minute: elapsed.map(|elapsed| counters.rate_per_minute(elapsed)),
        }
    }

    pub fn accuracy_text(&self) -> String {
        match self.accuracy {
            Some(accuracy) => format!("{accuracy}%"),
            None => "N/A".to_string(),
        }
    }

    pub fn rate_text(&self) -> String {
        match self.rate_per_minute {
            Some(rate) if rate >= 10.0 => format!("{rate:.0}"),
            Some(rate) => format!("{rate:.1}"),
            None => "N/A".to_string(),
        }
    }
}
