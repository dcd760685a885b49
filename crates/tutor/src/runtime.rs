use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use staffquiz_domain::QuizConfig;
use staffquiz_notation::StaffGeometry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::TutorError;
use crate::scoring::{ScoreCounters, ScoreboardSnapshot};
use crate::session::{Command, QuizEvent, QuizSession};
use crate::timer::{Scheduler, TimerToken};

/// Runs each one-shot timer as a sleeping task that reports its token back
/// to the runtime.
pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerToken>,
    tasks: HashMap<TimerToken, JoinHandle<()>>,
    origin: Instant,
}

impl TokioScheduler {
    pub fn new(fired: mpsc::UnboundedSender<TimerToken>) -> Self {
        Self {
            fired,
            tasks: HashMap::new(),
            origin: Instant::now(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        self.tasks.retain(|_, task| !task.is_finished());
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = fired.send(token);
        });
        self.tasks.insert(token, task);
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(task) = self.tasks.remove(&token) {
            task.abort();
        }
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizUpdate {
    /// Sent once before the first question.
    Setup(Vec<StaffGeometry>),
    Events(Vec<QuizEvent>),
    Scoreboard(ScoreboardSnapshot),
}

/// Event loop around a [`QuizSession`]: commands in, updates out, plus the
/// advance timers and a periodic scoreboard refresh.
pub struct QuizRuntime {
    session: QuizSession<TokioScheduler>,
    commands: mpsc::UnboundedReceiver<Command>,
    timers: mpsc::UnboundedReceiver<TimerToken>,
    updates: mpsc::UnboundedSender<QuizUpdate>,
}

impl QuizRuntime {
    pub fn new(
        config: QuizConfig,
        updates: mpsc::UnboundedSender<QuizUpdate>,
    ) -> Result<(Self, mpsc::UnboundedSender<Command>), TutorError> {
        Self::with_rng(config, updates, StdRng::from_entropy())
    }

    pub fn with_rng(
        config: QuizConfig,
        updates: mpsc::UnboundedSender<QuizUpdate>,
        rng: StdRng,
    ) -> Result<(Self, mpsc::UnboundedSender<Command>), TutorError> {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (timer_tx, timers) = mpsc::unbounded_channel();
        let session = QuizSession::with_rng(config, TokioScheduler::new(timer_tx), rng)?;
        Ok((
            Self {
                session,
                commands,
                timers,
                updates,
            },
            command_tx,
        ))
    }

    /// Runs until every command sender is dropped or nobody listens for
    /// updates, and returns the final counters.
    pub async fn run(self) -> Result<ScoreCounters> {
        let Self {
            mut session,
            mut commands,
            mut timers,
            updates,
        } = self;
        let mut tick = time::interval(session.config().scoreboard_tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut open = updates.send(QuizUpdate::Setup(session.staff_geometry())).is_ok();
        if open {
            let events = session.start().context("starting quiz session")?;
            open = updates.send(QuizUpdate::Events(events)).is_ok();
        }

        while open {
            open = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => match session.handle(command) {
                        Ok(events) => {
                            events.is_empty() || updates.send(QuizUpdate::Events(events)).is_ok()
                        }
                        Err(err) => {
                            warn!(%err, "quiz command rejected");
                            true
                        }
                    },
                    None => {
                        debug!("command channel closed");
                        false
                    }
                },
                Some(token) = timers.recv() => {
                    let events = session
                        .handle(Command::TimerFired(token))
                        .context("advancing quiz round")?;
                    events.is_empty() || updates.send(QuizUpdate::Events(events)).is_ok()
                }
                _ = tick.tick() => {
                    let snapshot = session.scoreboard();
                    updates.send(QuizUpdate::Scoreboard(snapshot)).is_ok()
                }
            };
        }

        let scores = *session.scores();
        info!(
            total = scores.total,
            correct = scores.correct,
            "quiz session finished"
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::NoteEntry;
    use std::collections::BTreeMap;

    use crate::session::Tone;
    use staffquiz_domain::{Letter, RangeMode};

    async fn next_question(updates: &mut mpsc::UnboundedReceiver<QuizUpdate>) -> NoteEntry {
        loop {
            match updates.recv().await {
                Some(QuizUpdate::Events(events)) => {
                    if let Some(note) = events.into_iter().find_map(|event| match event {
                        QuizEvent::Question(note) => Some(note),
                        _ => None,
                    }) {
                        return note;
                    }
                }
                Some(_) => {}
                None => panic!("runtime stopped publishing"),
            }
        }
    }

    async fn next_tone(updates: &mut mpsc::UnboundedReceiver<QuizUpdate>) -> Tone {
        loop {
            match updates.recv().await {
                Some(QuizUpdate::Events(events)) => {
                    if let Some(tone) = events.into_iter().find_map(|event| match event {
                        QuizEvent::Feedback(feedback) => Some(feedback.tone),
                        _ => None,
                    }) {
                        return tone;
                    }
                }
                Some(_) => {}
                None => panic!("runtime stopped publishing"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn answers_advance_after_delay() {
        let (updates_tx, mut updates) = mpsc::unbounded_channel();
        let (runtime, commands) =
            QuizRuntime::with_rng(QuizConfig::default(), updates_tx, StdRng::seed_from_u64(4))
                .unwrap();
        let task = tokio::spawn(runtime.run());

        match updates.recv().await {
            Some(QuizUpdate::Setup(geometry)) => assert_eq!(geometry.len(), 2),
            other => panic!("expected setup, got {other:?}"),
        }
        let first = next_question(&mut updates).await;
        let asked_at = Instant::now();
        commands.send(Command::Answer(first.pitch.letter)).unwrap();
        assert_eq!(next_tone(&mut updates).await, Tone::Positive);

        let second = next_question(&mut updates).await;
        assert!(asked_at.elapsed() >= Duration::from_millis(1200));
        assert!(!second.same_note(&first));

        let wrong = Letter::from_index(second.pitch.letter.index() + 3);
        commands.send(Command::Answer(wrong)).unwrap();
        assert_eq!(next_tone(&mut updates).await, Tone::Negative);

        drop(commands);
        let scores = task.await.unwrap().unwrap();
        assert_eq!(scores, ScoreCounters { total: 2, correct: 1, streak: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_keeps_loop_running() {
        let (updates_tx, mut updates) = mpsc::unbounded_channel();
        let (mut runtime, commands) =
            QuizRuntime::with_rng(QuizConfig::default(), updates_tx, StdRng::seed_from_u64(6))
                .unwrap();
        runtime
            .session
            .config_mut()
            .ranges
            .insert(RangeMode::Advanced, BTreeMap::new());
        let task = tokio::spawn(runtime.run());

        let first = next_question(&mut updates).await;
        commands.send(Command::SetRangeMode(RangeMode::Advanced)).unwrap();
        commands.send(Command::Answer(first.pitch.letter)).unwrap();
        assert_eq!(next_tone(&mut updates).await, Tone::Positive);

        drop(commands);
        let scores = task.await.unwrap().unwrap();
        assert_eq!(scores, ScoreCounters { total: 1, correct: 1, streak: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn scoreboard_ticks_without_changing_state() {
        let (updates_tx, mut updates) = mpsc::unbounded_channel();
        let (runtime, commands) =
            QuizRuntime::with_rng(QuizConfig::default(), updates_tx, StdRng::seed_from_u64(8))
                .unwrap();
        let task = tokio::spawn(runtime.run());

        let mut snapshots = 0;
        while snapshots < 3 {
            if let Some(QuizUpdate::Scoreboard(snapshot)) = updates.recv().await {
                assert_eq!(snapshot.total, 0);
                assert_eq!(snapshot.rate_text(), "0.0");
                snapshots += 1;
            }
        }

        drop(commands);
        let scores = task.await.unwrap().unwrap();
        assert_eq!(scores, ScoreCounters::default());
    }
}
