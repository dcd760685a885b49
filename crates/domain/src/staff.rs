use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pitch::{Letter, Pitch};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Staff {
    Treble,
    Bass,
}

impl Staff {
    pub const ALL: [Staff; 2] = [Staff::Treble, Staff::Bass];

    pub fn key(self) -> &'static str {
        match self {
            Staff::Treble => "treble",
            Staff::Bass => "bass",
        }
    }
}

impl fmt::Display for Staff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClefSymbol {
    pub glyph: char,
    pub font_size: f32,
    /// Horizontal offset from the staff's left padding.
    pub x_offset: f32,
    /// Vertical nudge from the middle staff line.
    pub y_adjust: f32,
}

impl ClefSymbol {
    pub fn treble() -> Self {
        Self {
            glyph: '\u{1D11E}',
            font_size: 88.0,
            x_offset: -18.0,
            y_adjust: -2.0,
        }
    }

    pub fn bass() -> Self {
        Self {
            glyph: '\u{1D122}',
            font_size: 72.0,
            x_offset: -14.0,
            y_adjust: 1.0,
        }
    }
}

/// Geometry and reference pitch for one staff. `bottom_note` sits on the
/// bottom line and defines step 0.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StaffConfig {
    pub label: String,
    pub width: f32,
    pub height: f32,
    pub padding_x: f32,
    pub baseline_y: f32,
    pub line_spacing: f32,
    pub note_x: f32,
    pub bottom_note: Pitch,
    pub clef: ClefSymbol,
}

impl StaffConfig {
    pub fn treble() -> Self {
        Self {
            label: "Treble".into(),
            bottom_note: Pitch::new(Letter::E, 4),
            clef: ClefSymbol::treble(),
            ..Self::base_geometry()
        }
    }

    pub fn bass() -> Self {
        Self {
            label: "Bass".into(),
            bottom_note: Pitch::new(Letter::G, 2),
            clef: ClefSymbol::bass(),
            ..Self::base_geometry()
        }
    }

    pub fn default_for(staff: Staff) -> Self {
        match staff {
            Staff::Treble => Self::treble(),
            Staff::Bass => Self::bass(),
        }
    }

    /// Vertical distance covered by one diatonic step (half a line gap).
    pub fn step_spacing(&self) -> f32 {
        self.line_spacing / 2.0
    }

    fn base_geometry() -> Self {
        Self {
            label: String::new(),
            width: 320.0,
            height: 220.0,
            padding_x: 32.0,
            baseline_y: 150.0,
            line_spacing: 18.0,
            note_x: 160.0,
            bottom_note: Pitch::new(Letter::C, 4),
            clef: ClefSymbol::treble(),
        }
    }
}
