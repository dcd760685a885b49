use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use staffquiz_domain::{Letter, QuizConfig, RangeMode, Staff};
use staffquiz_notation::{DrawInstruction, StaffGeometry};
use tracing::{debug, info, instrument, warn};

use crate::error::TutorError;
use crate::input::{normalize_bias, parse_answer_key};
use crate::pool::{NoteEntry, NotePool};
use crate::scoring::{ScoreCounters, ScoreboardSnapshot};
use crate::selector::pick_next;
use crate::timer::{Scheduler, TimerToken};

/// Everything the outside world can ask of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Answer(Letter),
    /// Raw key text; anything that is not a note letter is ignored.
    Key(String),
    RequestNext,
    SetRangeMode(RangeMode),
    SetSameStaffBias(f64),
    TimerFired(TimerToken),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
    pub tone: Tone,
    pub message: String,
}

impl Feedback {
    fn new(tone: Tone, message: String) -> Self {
        Self { tone, message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum QuizEvent {
    Question(NoteEntry),
    Draw(DrawInstruction),
    Highlight { staff: Staff, active: bool },
    /// Clear every answer button mark.
    AnswersReset,
    AnswerMarked {
        selected: Letter,
        expected: Letter,
        correct: bool,
    },
    Feedback(Feedback),
    ScoreChanged(ScoreCounters),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuizPhase {
    Idle,
    AwaitingAnswer,
    /// Answer given, feedback showing, advance pending.
    Locked,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizRound {
    pub current: Option<NoteEntry>,
    pub allow_answer: bool,
    pub pending_advance: Option<TimerToken>,
}

/// Owns all quiz state and sequences question, answer, feedback and advance.
///
/// Every entry point returns the events the UI should apply, in order.
pub struct QuizSession<S> {
    config: QuizConfig,
    scheduler: S,
    rng: StdRng,
    pool: NotePool,
    range_mode: RangeMode,
    same_staff_bias: f64,
    round: QuizRound,
    scores: ScoreCounters,
    /// Scheduler clock reading at the last `start`; `None` while idle.
    started_at: Option<Duration>,
    next_token: u64,
}

impl<S: Scheduler> QuizSession<S> {
    pub fn new(config: QuizConfig, scheduler: S) -> Result<Self, TutorError> {
        Self::with_rng(config, scheduler, StdRng::from_entropy())
    }

    pub fn with_rng(config: QuizConfig, scheduler: S, rng: StdRng) -> Result<Self, TutorError> {
        config.validate()?;
        let range_mode = config.range_mode;
        let same_staff_bias = config.same_staff_bias;
        let pool = NotePool::for_config(&config, range_mode);
        Ok(Self {
            config,
            scheduler,
            rng,
            pool,
            range_mode,
            same_staff_bias,
            round: QuizRound {
                allow_answer: true,
                ..QuizRound::default()
            },
            scores: ScoreCounters::default(),
            started_at: None,
            next_token: 0,
        })
    }

    pub fn handle(&mut self, command: Command) -> Result<Vec<QuizEvent>, TutorError> {
        match command {
            Command::Start => self.start(),
            Command::Answer(letter) => self.submit_answer(letter),
            Command::Key(key) => self.submit_key(&key),
            Command::RequestNext => self.request_next(),
            Command::SetRangeMode(mode) => self.set_range_mode(mode),
            Command::SetSameStaffBias(bias) => {
                self.set_same_staff_bias(bias);
                Ok(Vec::new())
            }
            Command::TimerFired(token) => self.on_timer(token),
        }
    }

    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<Vec<QuizEvent>, TutorError> {
        self.cancel_pending_advance();
        self.pool = NotePool::for_config(&self.config, self.range_mode);
        self.started_at = Some(self.scheduler.now());
        self.round.allow_answer = true;
        info!(mode = ?self.range_mode, notes = self.pool.len(), "quiz started");
        let mut events = vec![QuizEvent::ScoreChanged(self.scores)];
        self.next_question(&mut events)?;
        Ok(events)
    }

    /// Scores one answer. Ignored while locked or before a question exists,
    /// so a round can never be scored twice.
    #[instrument(skip(self))]
    pub fn submit_answer(&mut self, letter: Letter) -> Result<Vec<QuizEvent>, TutorError> {
        if !self.round.allow_answer {
            debug!("answer ignored while locked");
            return Ok(Vec::new());
        }
        let Some(current) = self.round.current.clone() else {
            debug!("answer ignored, no question yet");
            return Ok(Vec::new());
        };

        let expected = current.pitch.letter;
        let correct = letter == expected;
        self.scores.record(correct);
        let label = self.staff_label(current.staff);
        let feedback = if correct {
            Feedback::new(
                Tone::Positive,
                format!("Nice! That was {} on the {label} staff.", current.id),
            )
        } else {
            Feedback::new(
                Tone::Negative,
                format!("Not quite. The note is {} on the {label} staff.", current.id),
            )
        };
        debug!(note = %current.id, correct, streak = self.scores.streak, "answer scored");

        self.round.allow_answer = false;
        self.schedule_advance();
        Ok(vec![
            QuizEvent::ScoreChanged(self.scores),
            QuizEvent::AnswerMarked {
                selected: letter,
                expected,
                correct,
            },
            QuizEvent::Feedback(feedback),
        ])
    }

    pub fn submit_key(&mut self, key: &str) -> Result<Vec<QuizEvent>, TutorError> {
        match parse_answer_key(key) {
            Some(letter) => self.submit_answer(letter),
            None => {
                debug!(key, "ignoring key");
                Ok(Vec::new())
            }
        }
    }

    /// Skips straight to a new question, dropping any pending advance.
    #[instrument(skip(self))]
    pub fn request_next(&mut self) -> Result<Vec<QuizEvent>, TutorError> {
        if self.started_at.is_none() {
            return self.start();
        }
        self.cancel_pending_advance();
        self.round.allow_answer = true;
        let mut events = Vec::new();
        self.next_question(&mut events)?;
        Ok(events)
    }

    /// Rebuilds the pool and interrupts the current round. A mode with no
    /// notes is rejected before anything changes.
    #[instrument(skip(self))]
    pub fn set_range_mode(&mut self, mode: RangeMode) -> Result<Vec<QuizEvent>, TutorError> {
        let pool = NotePool::for_config(&self.config, mode);
        if pool.is_empty() {
            warn!(?mode, "range mode has no notes, keeping current pool");
            return Err(TutorError::EmptyPool);
        }
        self.range_mode = mode;
        self.pool = pool;
        info!(?mode, notes = self.pool.len(), "note pool rebuilt");
        self.cancel_pending_advance();
        self.round.allow_answer = true;
        if self.started_at.is_none() {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();
        self.next_question(&mut events)?;
        Ok(events)
    }

    /// Applies from the next selection on; the current round is untouched.
    pub fn set_same_staff_bias(&mut self, bias: f64) {
        match normalize_bias(bias) {
            Some(bias) => {
                debug!(bias, "same staff bias updated");
                self.same_staff_bias = bias;
            }
            None => debug!("ignoring NaN same staff bias"),
        }
    }

    pub fn on_timer(&mut self, token: TimerToken) -> Result<Vec<QuizEvent>, TutorError> {
        if self.round.pending_advance != Some(token) {
            debug!(?token, "stale advance timer dropped");
            return Ok(Vec::new());
        }
        self.round.pending_advance = None;
        self.round.allow_answer = true;
        let mut events = Vec::new();
        self.next_question(&mut events)?;
        Ok(events)
    }

    pub fn phase(&self) -> QuizPhase {
        if self.started_at.is_none() {
            QuizPhase::Idle
        } else if self.round.allow_answer {
            QuizPhase::AwaitingAnswer
        } else {
            QuizPhase::Locked
        }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn round(&self) -> &QuizRound {
        &self.round
    }

    pub fn current(&self) -> Option<&NoteEntry> {
        self.round.current.as_ref()
    }

    pub fn scores(&self) -> &ScoreCounters {
        &self.scores
    }

    pub fn pool(&self) -> &NotePool {
        &self.pool
    }

    pub fn range_mode(&self) -> RangeMode {
        self.range_mode
    }

    pub fn same_staff_bias(&self) -> f64 {
        self.same_staff_bias
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn staff_geometry(&self) -> Vec<StaffGeometry> {
        self.config
            .staves
            .iter()
            .map(|(staff, config)| StaffGeometry::new(*staff, config))
            .collect()
    }

    /// Time on the scheduler clock since the last `start`.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at
            .map(|started_at| self.scheduler.now().saturating_sub(started_at))
    }

    /// Read-only; never changes quiz state.
    pub fn scoreboard(&self) -> ScoreboardSnapshot {
        ScoreboardSnapshot::new(&self.scores, self.elapsed())
    }

    #[cfg(test)]
    pub(crate) fn config_mut(&mut self) -> &mut QuizConfig {
        &mut self.config
    }

    fn next_question(&mut self, events: &mut Vec<QuizEvent>) -> Result<(), TutorError> {
        let next = pick_next(
            &self.pool,
            self.round.current.as_ref(),
            self.same_staff_bias,
            &mut self.rng,
        )?
        .clone();
        debug!(note = %next.id, staff = %next.staff, "next question");

        events.push(QuizEvent::AnswersReset);
        for (staff, config) in &self.config.staves {
            let active = *staff == next.staff;
            let draw = if active {
                DrawInstruction::note(*staff, config, next.pitch)
            } else {
                DrawInstruction::hidden(*staff, config)
            };
            events.push(QuizEvent::Draw(draw));
            events.push(QuizEvent::Highlight {
                staff: *staff,
                active,
            });
        }
        let label = self.staff_label(next.staff);
        events.push(QuizEvent::Feedback(Feedback::new(
            Tone::Neutral,
            format!("What note is highlighted on the {label} staff?"),
        )));
        events.push(QuizEvent::Question(next.clone()));
        self.round.current = Some(next);
        Ok(())
    }

    fn schedule_advance(&mut self) {
        self.cancel_pending_advance();
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        let delay = self.config.advance_delay();
        debug!(?token, ?delay, "advance scheduled");
        self.scheduler.schedule(delay, token);
        self.round.pending_advance = Some(token);
    }

    fn cancel_pending_advance(&mut self) {
        if let Some(token) = self.round.pending_advance.take() {
            debug!(?token, "advance cancelled");
            self.scheduler.cancel(token);
        }
    }

    fn staff_label(&self, staff: Staff) -> String {
        self.config
            .staff(staff)
            .map(|config| config.label.clone())
            .unwrap_or_else(|| staff.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::timer::TimerQueue;

    fn session() -> QuizSession<TimerQueue> {
        QuizSession::with_rng(
            QuizConfig::default(),
            TimerQueue::new(),
            StdRng::seed_from_u64(42),
        )
        .unwrap()
    }

    fn wrong_letter(letter: Letter) -> Letter {
        Letter::from_index(letter.index() + 1)
    }

    fn question(events: &[QuizEvent]) -> Option<&NoteEntry> {
        events.iter().find_map(|event| match event {
            QuizEvent::Question(note) => Some(note),
            _ => None,
        })
    }

    fn feedback(events: &[QuizEvent]) -> Option<&Feedback> {
        events.iter().find_map(|event| match event {
            QuizEvent::Feedback(feedback) => Some(feedback),
            _ => None,
        })
    }

    #[test]
    fn start_asks_a_question() {
        let mut session = session();
        assert_eq!(session.phase(), QuizPhase::Idle);
        let events = session.start().unwrap();
        assert_eq!(session.phase(), QuizPhase::AwaitingAnswer);
        let note = question(&events).unwrap().clone();
        assert_eq!(session.current(), Some(&note));
        assert_eq!(feedback(&events).unwrap().tone, Tone::Neutral);

        let highlighted: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                QuizEvent::Highlight { staff, active: true } => Some(*staff),
                _ => None,
            })
            .collect();
        assert_eq!(highlighted, vec![note.staff]);
        let visible = events
            .iter()
            .filter(|event| matches!(event, QuizEvent::Draw(draw) if draw.visible))
            .count();
        assert_eq!(visible, 1);
    }

    #[test]
    fn correct_answer_locks_and_schedules_advance() {
        let mut session = session();
        session.start().unwrap();
        let letter = session.current().unwrap().pitch.letter;
        let events = session.submit_answer(letter).unwrap();

        assert_eq!(session.phase(), QuizPhase::Locked);
        assert_eq!(*session.scores(), ScoreCounters { total: 1, correct: 1, streak: 1 });
        let feedback = feedback(&events).unwrap();
        assert_eq!(feedback.tone, Tone::Positive);
        assert!(feedback.message.contains(&session.current().unwrap().id));
        assert_eq!(session.scheduler().pending_count(), 1);
        assert!(events.contains(&QuizEvent::AnswerMarked {
            selected: letter,
            expected: letter,
            correct: true,
        }));
    }

    #[test]
    fn locked_session_ignores_answers() {
        let mut session = session();
        session.start().unwrap();
        let letter = session.current().unwrap().pitch.letter;
        session.submit_answer(letter).unwrap();
        let before = *session.scores();
        assert!(session.submit_answer(letter).unwrap().is_empty());
        assert!(session.submit_answer(wrong_letter(letter)).unwrap().is_empty());
        assert_eq!(*session.scores(), before);
    }

    #[test]
    fn wrong_answer_names_the_note_and_staff() {
        let mut session = session();
        session.start().unwrap();
        let current = session.current().unwrap().clone();
        let events = session.submit_answer(wrong_letter(current.pitch.letter)).unwrap();
        let feedback = feedback(&events).unwrap();
        assert_eq!(feedback.tone, Tone::Negative);
        assert!(feedback.message.contains(&current.id));
        let label = session.config().staff(current.staff).unwrap().label.clone();
        assert!(feedback.message.contains(&label));
        assert_eq!(session.scores().streak, 0);
    }

    #[test]
    fn timer_advances_to_new_question() {
        let mut session = session();
        session.start().unwrap();
        let first = session.current().unwrap().clone();
        session.submit_answer(first.pitch.letter).unwrap();

        assert!(session.scheduler_mut().advance(Duration::from_millis(1199)).is_empty());
        let fired = session.scheduler_mut().advance(Duration::from_millis(1));
        assert_eq!(fired.len(), 1);
        let events = session.handle(Command::TimerFired(fired[0])).unwrap();
        let next = question(&events).unwrap();
        assert!(!next.same_note(&first));
        assert_eq!(session.phase(), QuizPhase::AwaitingAnswer);
        assert_eq!(feedback(&events).unwrap().tone, Tone::Neutral);
    }

    #[test]
    fn forced_next_cancels_pending_advance() {
        let mut session = session();
        session.start().unwrap();
        let letter = session.current().unwrap().pitch.letter;
        session.submit_answer(letter).unwrap();
        let token = session.round().pending_advance.unwrap();

        session.request_next().unwrap();
        assert_eq!(session.phase(), QuizPhase::AwaitingAnswer);
        assert_eq!(session.round().pending_advance, None);
        assert!(!session.scheduler().is_scheduled(token));
        let asked = session.current().cloned();
        // A timer that slipped through anyway must not start another round.
        assert!(session.on_timer(token).unwrap().is_empty());
        assert_eq!(session.current().cloned(), asked);
    }

    #[test]
    fn request_next_while_awaiting_does_not_score() {
        let mut session = session();
        session.start().unwrap();
        let events = session.handle(Command::RequestNext).unwrap();
        assert!(question(&events).is_some());
        assert_eq!(session.scores().total, 0);
    }

    #[test]
    fn range_change_rebuilds_and_interrupts() {
        let mut session = session();
        session.start().unwrap();
        let letter = session.current().unwrap().pitch.letter;
        session.submit_answer(letter).unwrap();

        let events = session.set_range_mode(RangeMode::Advanced).unwrap();
        assert!(question(&events).is_some());
        assert_eq!(session.pool().len(), 42);
        assert_eq!(session.phase(), QuizPhase::AwaitingAnswer);
        assert_eq!(session.scheduler().pending_count(), 0);
        assert_eq!(session.scores().total, 1);
    }

    #[test]
    fn range_change_before_start_stays_idle() {
        let mut session = session();
        assert!(session.set_range_mode(RangeMode::Advanced).unwrap().is_empty());
        assert_eq!(session.phase(), QuizPhase::Idle);
        assert_eq!(session.pool().len(), 42);
    }

    #[test]
    fn bias_change_keeps_round() {
        let mut session = session();
        session.start().unwrap();
        let current = session.current().cloned();
        assert!(session.handle(Command::SetSameStaffBias(2.0)).unwrap().is_empty());
        assert_eq!(session.same_staff_bias(), 1.0);
        session.set_same_staff_bias(f64::NAN);
        assert_eq!(session.same_staff_bias(), 1.0);
        assert_eq!(session.current().cloned(), current);
        assert_eq!(session.phase(), QuizPhase::AwaitingAnswer);
    }

    #[test]
    fn keys_are_filtered_before_scoring() {
        let mut session = session();
        session.start().unwrap();
        assert!(session.handle(Command::Key("Enter".into())).unwrap().is_empty());
        assert_eq!(session.scores().total, 0);
        let events = session.handle(Command::Key("h".into())).unwrap();
        assert!(events.iter().any(|event| matches!(
            event,
            QuizEvent::AnswerMarked { selected: Letter::B, .. }
        )));
        assert_eq!(session.scores().total, 1);
    }

    #[test]
    fn answer_before_start_is_ignored() {
        let mut session = session();
        assert!(session.submit_answer(Letter::C).unwrap().is_empty());
        assert_eq!(session.scores().total, 0);
        assert_eq!(session.scoreboard().rate_per_minute, None);
    }

    #[test]
    fn range_change_to_empty_mode_keeps_round() {
        let mut config = QuizConfig::default();
        config.ranges.insert(RangeMode::Advanced, BTreeMap::new());
        let rejected = QuizSession::with_rng(config, TimerQueue::new(), StdRng::seed_from_u64(3));
        assert!(matches!(rejected, Err(TutorError::Domain(_))));

        let mut session = session();
        session.config.ranges.insert(RangeMode::Advanced, BTreeMap::new());
        session.start().unwrap();
        let letter = session.current().unwrap().pitch.letter;
        session.submit_answer(letter).unwrap();
        let pending = session.round().pending_advance;
        let round = session.round().clone();

        assert!(matches!(
            session.set_range_mode(RangeMode::Advanced),
            Err(TutorError::EmptyPool)
        ));
        assert_eq!(session.range_mode(), RangeMode::Standard);
        assert_eq!(session.pool().len(), 26);
        assert_eq!(session.round(), &round);
        assert_eq!(session.phase(), QuizPhase::Locked);
        assert!(session.scheduler().is_scheduled(pending.unwrap()));

        let fired = session.scheduler_mut().advance(Duration::from_millis(1200));
        let events = session.handle(Command::TimerFired(fired[0])).unwrap();
        assert!(question(&events).is_some());
        assert!(session.request_next().is_ok());
    }

    #[test]
    fn scoreboard_uses_time_since_start() {
        let mut session = session();
        assert_eq!(session.elapsed(), None);
        session.scheduler_mut().advance(Duration::from_secs(100));
        session.start().unwrap();
        assert_eq!(session.elapsed(), Some(Duration::ZERO));
        assert_eq!(session.scoreboard().rate_text(), "0.0");

        let letter = session.current().unwrap().pitch.letter;
        session.submit_answer(letter).unwrap();
        for token in session.scheduler_mut().advance(Duration::from_secs(30)) {
            session.on_timer(token).unwrap();
        }
        let letter = session.current().unwrap().pitch.letter;
        session.submit_answer(letter).unwrap();

        let snapshot = session.scoreboard();
        assert_eq!(session.elapsed(), Some(Duration::from_secs(30)));
        assert_eq!(snapshot.rate_text(), "4.0");
        assert_eq!(snapshot.accuracy_text(), "100%");
    }
}
