use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::range::{default_ranges, RangeMode, RangeSpec, RangeTable};
use crate::{DomainError, Pitch, Staff, StaffConfig};

/// A fixed list of note ids per staff, used instead of the range-derived pool.
pub type NoteBank = BTreeMap<Staff, Vec<String>>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizConfig {
    pub staves: BTreeMap<Staff, StaffConfig>,
    pub ranges: RangeTable,
    pub range_mode: RangeMode,
    /// Probability that the next question stays on the previous staff.
    pub same_staff_bias: f64,
    pub advance_delay_ms: u64,
    pub scoreboard_tick_ms: u64,
    pub note_bank: Option<NoteBank>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            staves: Staff::ALL
                .iter()
                .map(|staff| (*staff, StaffConfig::default_for(*staff)))
                .collect(),
            ranges: default_ranges(),
            range_mode: RangeMode::Standard,
            same_staff_bias: 0.7,
            advance_delay_ms: 1200,
            scoreboard_tick_ms: 1000,
            note_bank: None,
        }
    }
}

impl QuizConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, DomainError> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DomainError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, DomainError> {
        serde_yaml::to_string(self).map_err(|err| DomainError::Serialization(err.to_string()))
    }

    pub fn staff(&self, staff: Staff) -> Option<&StaffConfig> {
        self.staves.get(&staff)
    }

    pub fn range(&self, mode: RangeMode, staff: Staff) -> Option<RangeSpec> {
        self.ranges.get(&mode).and_then(|table| table.get(&staff)).copied()
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    pub fn scoreboard_tick(&self) -> Duration {
        Duration::from_millis(self.scoreboard_tick_ms)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (staff, config) in &self.staves {
            if !(config.line_spacing > 0.0) {
                return Err(DomainError::validation(format!(
                    "{staff} staff line spacing must be positive"
                )));
            }
        }
        for table in self.ranges.values() {
            for range in table.values() {
                range.validate()?;
            }
        }
        if !(0.0..=1.0).contains(&self.same_staff_bias) {
            return Err(DomainError::validation(
                "same staff bias must be between 0 and 1",
            ));
        }
        if self.advance_delay_ms == 0 {
            return Err(DomainError::validation("advance delay must be non-zero"));
        }
        if self.scoreboard_tick_ms == 0 {
            return Err(DomainError::validation("scoreboard tick must be non-zero"));
        }
        if let Some(bank) = &self.note_bank {
            if let Some(staff) = bank.keys().find(|staff| !self.staves.contains_key(*staff)) {
                return Err(DomainError::validation(format!(
                    "note bank lists {staff} notes but no {staff} staff is configured"
                )));
            }
        }
        match &self.note_bank {
            Some(bank) => {
                let playable = bank.values().flatten().any(|id| id.parse::<Pitch>().is_ok());
                if !playable {
                    return Err(DomainError::validation("note bank has no valid note ids"));
                }
            }
            None => {
                // Every mode can be switched to at runtime, so each needs a staff.
                if let Some(mode) = RangeMode::ALL.into_iter().find(|mode| {
                    !self
                        .staves
                        .keys()
                        .any(|staff| self.range(*mode, *staff).is_some())
                }) {
                    return Err(DomainError::validation(format!(
                        "no staff has notes in {mode:?} mode"
                    )));
                }
            }
        }
        Ok(())
    }
}
