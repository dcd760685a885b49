pub mod error;
pub mod input;
pub mod pool;
pub mod runtime;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod timer;

pub use error::TutorError;
pub use input::parse_answer_key;
pub use pool::{NoteEntry, NotePool};
pub use runtime::{QuizRuntime, QuizUpdate, TokioScheduler};
pub use scoring::{ScoreCounters, ScoreboardSnapshot};
pub use selector::pick_next;
pub use session::{Command, Feedback, QuizEvent, QuizPhase, QuizRound, QuizSession, Tone};
pub use timer::{Scheduler, TimerQueue, TimerToken};
