use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// One of the seven natural note names, in diatonic order starting at C.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    pub const COUNT: i32 = 7;

    pub fn index(self) -> i32 {
        self as i32
    }

    /// Wraps any integer onto the alphabet, so `-1` is B and `7` is C.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(Self::COUNT) as usize]
    }

    pub fn from_char(c: char) -> Result<Self, DomainError> {
        match c.to_ascii_uppercase() {
            'C' => Ok(Letter::C),
            'D' => Ok(Letter::D),
            'E' => Ok(Letter::E),
            'F' => Ok(Letter::F),
            'G' => Ok(Letter::G),
            'A' => Ok(Letter::A),
            'B' => Ok(Letter::B),
            _ => Err(DomainError::unknown_letter(c.to_string())),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Letter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(DomainError::unknown_letter(s)),
        }
    }
}

/// A natural pitch: a letter plus scientific octave number (middle C is C4).
///
/// Serialized as its note id, e.g. `"E4"` or `"B-1"`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch {
    pub letter: Letter,
    pub octave: i32,
}

impl Pitch {
    pub const fn new(letter: Letter, octave: i32) -> Self {
        Self { letter, octave }
    }

    /// Moves the pitch by `steps` diatonic letters. Negative offsets wrap into
    /// lower octaves with floor semantics, so E4 shifted by -3 is B3.
    ///
    /// Works in `i64` internally; an octave past the `i32` range saturates.
    pub fn shift(self, steps: i32) -> Self {
        let total = i64::from(self.letter.index()) + i64::from(steps);
        let letter = Letter::ALL[total.rem_euclid(i64::from(Letter::COUNT)) as usize];
        let octave = i64::from(self.octave) + total.div_euclid(i64::from(Letter::COUNT));
        Self {
            letter,
            octave: saturate(octave),
        }
    }

    /// Signed distance in diatonic steps from `reference` to `self`, saturating
    /// at the `i32` bounds. Inverse of [`Pitch::shift`]:
    /// `reference.shift(n).steps_from(reference) == n`.
    pub fn steps_from(self, reference: Pitch) -> i32 {
        let letters = i64::from(self.letter.index()) - i64::from(reference.letter.index());
        let octaves = i64::from(self.octave) - i64::from(reference.octave);
        saturate(letters + octaves * i64::from(Letter::COUNT))
    }

    pub fn id(&self) -> String {
        self.to_string()
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.octave)
    }
}

impl FromStr for Pitch {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let mut chars = text.chars();
        let first = chars
            .next()
            .ok_or_else(|| DomainError::validation("empty note id"))?;
        let letter = Letter::from_char(first)?;
        let octave = chars
            .as_str()
            .parse::<i32>()
            .map_err(|_| DomainError::validation(format!("invalid octave in note id {text:?}")))?;
        Ok(Self { letter, octave })
    }
}

impl TryFrom<String> for Pitch {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(pitch: Pitch) -> Self {
        pitch.to_string()
    }
}
