pub mod config;
pub mod error;
pub mod pitch;
pub mod range;
pub mod staff;

pub use crate::config::{NoteBank, QuizConfig};
pub use crate::error::DomainError;
pub use crate::pitch::{Letter, Pitch};
pub use crate::range::{RangeMode, RangeSpec, RangeTable};
pub use crate::staff::{ClefSymbol, Staff, StaffConfig};
