use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::error::TutorError;
use crate::pool::{NoteEntry, NotePool};

/// Picks the next note to ask.
///
/// With probability `same_staff_bias` the draw is limited to the previous
/// note's staff. The previous note itself is excluded whenever anything else
/// is left to ask, so the same note on the same staff never comes up twice
/// in a row unless it is the only candidate.
pub fn pick_next<'a, R: Rng>(
    pool: &'a NotePool,
    previous: Option<&NoteEntry>,
    same_staff_bias: f64,
    rng: &mut R,
) -> Result<&'a NoteEntry, TutorError> {
    if pool.is_empty() {
        return Err(TutorError::EmptyPool);
    }

    let mut candidates = pool.entries();
    if let Some(previous) = previous {
        let staff_notes = pool.for_staff(previous.staff);
        if !staff_notes.is_empty() && rng.gen::<f64>() < same_staff_bias {
            trace!(staff = %previous.staff, "staying on previous staff");
            candidates = staff_notes;
        }
    }

    let fresh = match previous {
        Some(previous) if candidates.len() > 1 => candidates
            .iter()
            .filter(|entry| !entry.same_note(previous))
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    };

    let choice = if fresh.is_empty() {
        candidates.choose(rng)
    } else {
        fresh.choose(rng).copied()
    };
    choice.ok_or(TutorError::EmptyPool)
}
