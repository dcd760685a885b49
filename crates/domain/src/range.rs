use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{DomainError, Staff};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    #[default]
    Standard,
    Advanced,
}

impl RangeMode {
    pub const ALL: [RangeMode; 2] = [RangeMode::Standard, RangeMode::Advanced];
}

/// Inclusive step offsets, relative to a staff's bottom note, that may be asked.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeSpec {
    pub min: i32,
    pub max: i32,
}

impl RangeSpec {
    pub const STANDARD: RangeSpec = RangeSpec { min: -2, max: 10 };
    pub const ADVANCED: RangeSpec = RangeSpec { min: -6, max: 14 };

    pub fn new(min: i32, max: i32) -> Result<Self, DomainError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min > self.max {
            return Err(DomainError::validation(format!(
                "range min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn steps(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    pub fn len(&self) -> usize {
        (self.max - self.min + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per mode, per staff playable ranges.
pub type RangeTable = BTreeMap<RangeMode, BTreeMap<Staff, RangeSpec>>;

pub fn default_ranges() -> RangeTable {
    let both = |range: RangeSpec| -> BTreeMap<Staff, RangeSpec> {
        Staff::ALL.iter().map(|staff| (*staff, range)).collect()
    };
    BTreeMap::from([
        (RangeMode::Standard, both(RangeSpec::STANDARD)),
        (RangeMode::Advanced, both(RangeSpec::ADVANCED)),
    ])
}
