use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use staffquiz_domain::{NoteBank, Pitch, QuizConfig, RangeMode, Staff};
use tracing::{debug, warn};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteEntry {
    /// Letter plus octave, e.g. `"E4"`. Unique within a staff.
    pub id: String,
    pub staff: Staff,
    pub pitch: Pitch,
}

impl NoteEntry {
    pub fn new(staff: Staff, pitch: Pitch) -> Self {
        Self {
            id: pitch.id(),
            staff,
            pitch,
        }
    }

    pub fn same_note(&self, other: &NoteEntry) -> bool {
        self.id == other.id && self.staff == other.staff
    }
}

/// Every note that may be asked, in staff order, plus a per-staff partition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotePool {
    entries: Vec<NoteEntry>,
    by_staff: BTreeMap<Staff, Vec<NoteEntry>>,
}

impl NotePool {
    /// Walks each configured staff's range for `mode`. Staves without a
    /// range are skipped.
    pub fn build(config: &QuizConfig, mode: RangeMode) -> Self {
        let mut pool = Self::default();
        for (staff, staff_config) in &config.staves {
            let Some(range) = config.range(mode, *staff) else {
                debug!(%staff, ?mode, "no range configured, skipping staff");
                continue;
            };
            let notes = range
                .steps()
                .map(|step| NoteEntry::new(*staff, staff_config.bottom_note.shift(step)))
                .collect();
            pool.push_staff(*staff, notes);
        }
        pool
    }

    /// Builds a pool from fixed note ids. Ids that do not parse are dropped.
    pub fn from_bank(bank: &NoteBank) -> Self {
        let mut pool = Self::default();
        for (staff, ids) in bank {
            let notes = ids
                .iter()
                .filter_map(|id| match id.parse::<Pitch>() {
                    Ok(pitch) => Some(NoteEntry::new(*staff, pitch)),
                    Err(err) => {
                        warn!(%staff, id = %id, %err, "dropping malformed note id");
                        None
                    }
                })
                .collect();
            pool.push_staff(*staff, notes);
        }
        pool
    }

    /// The pool a session should use: the note bank when configured,
    /// otherwise the range for `mode`.
    pub fn for_config(config: &QuizConfig, mode: RangeMode) -> Self {
        match &config.note_bank {
            Some(bank) => Self::from_bank(bank),
            None => Self::build(config, mode),
        }
    }

    fn push_staff(&mut self, staff: Staff, notes: Vec<NoteEntry>) {
        self.entries.extend(notes.iter().cloned());
        self.by_staff.insert(staff, notes);
    }

    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    pub fn for_staff(&self, staff: Staff) -> &[NoteEntry] {
        self.by_staff.get(&staff).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn staves(&self) -> impl Iterator<Item = Staff> + '_ {
        self.by_staff.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
