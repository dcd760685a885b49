//! Maps pitches onto staff coordinates. Nothing here draws; the output is
//! plain data for whatever renders the staves.

use serde::{Deserialize, Serialize};
use staffquiz_domain::{Pitch, Staff, StaffConfig};
use tracing::trace;

/// Step of the top staff line; the bottom line is step 0.
pub const TOP_LINE_STEP: i32 = 8;
pub const STAFF_LINE_COUNT: usize = 5;
pub const LEDGER_HALF_WIDTH: f32 = 22.0;
pub const NOTE_HEAD_RX: f32 = 11.0;
pub const NOTE_HEAD_RY: f32 = 7.6;
pub const NOTE_HEAD_TILT_DEGREES: f32 = -20.0;

pub fn step_to_y(steps: i32, config: &StaffConfig) -> f32 {
    config.baseline_y - steps as f32 * config.step_spacing()
}

/// Even steps that need a ledger line for a note at `steps`, ordered outward
/// from the staff. Empty for anything from step -1 to step 9.
pub fn ledger_steps(steps: i32) -> Vec<i32> {
    if steps < 0 {
        (steps..=-2).rev().filter(|s| s % 2 == 0).collect()
    } else if steps > TOP_LINE_STEP {
        (TOP_LINE_STEP + 2..=steps).filter(|s| s % 2 == 0).collect()
    } else {
        Vec::new()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrawInstruction {
    pub staff: Staff,
    pub visible: bool,
    pub note_x: f32,
    pub note_y: f32,
    pub tilt_degrees: f32,
    /// Ledger line y positions, nearest the staff first.
    pub ledger_positions: Vec<f32>,
    pub ledger_x: (f32, f32),
}

impl DrawInstruction {
    pub fn note(staff: Staff, config: &StaffConfig, pitch: Pitch) -> Self {
        let steps = pitch.steps_from(config.bottom_note);
        let ledger_positions = ledger_steps(steps)
            .into_iter()
            .map(|step| step_to_y(step, config))
            .collect::<Vec<_>>();
        trace!(%staff, %pitch, steps, ledgers = ledger_positions.len(), "placing note");
        Self {
            staff,
            visible: true,
            note_x: config.note_x,
            note_y: step_to_y(steps, config),
            tilt_degrees: NOTE_HEAD_TILT_DEGREES,
            ledger_positions,
            ledger_x: (
                config.note_x - LEDGER_HALF_WIDTH,
                config.note_x + LEDGER_HALF_WIDTH,
            ),
        }
    }

    /// Clears the staff: no note head, no ledger lines.
    pub fn hidden(staff: Staff, config: &StaffConfig) -> Self {
        Self {
            staff,
            visible: false,
            note_x: config.note_x,
            note_y: config.baseline_y,
            tilt_degrees: NOTE_HEAD_TILT_DEGREES,
            ledger_positions: Vec::new(),
            ledger_x: (
                config.note_x - LEDGER_HALF_WIDTH,
                config.note_x + LEDGER_HALF_WIDTH,
            ),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClefPlacement {
    pub glyph: char,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

/// Static description of an empty staff, consumed once when the view is built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StaffGeometry {
    pub staff: Staff,
    pub label: String,
    pub width: f32,
    pub height: f32,
    /// Bottom line first.
    pub line_ys: Vec<f32>,
    pub line_x: (f32, f32),
    pub clef: ClefPlacement,
}

impl StaffGeometry {
    pub fn new(staff: Staff, config: &StaffConfig) -> Self {
        let line_ys = (0..STAFF_LINE_COUNT)
            .map(|i| config.baseline_y - i as f32 * config.line_spacing)
            .collect();
        let middle_line_y = config.baseline_y - 2.0 * config.line_spacing;
        Self {
            staff,
            label: config.label.clone(),
            width: config.width,
            height: config.height,
            line_ys,
            line_x: (config.padding_x, config.width - config.padding_x),
            clef: ClefPlacement {
                glyph: config.clef.glyph,
                x: config.padding_x + config.clef.x_offset,
                y: middle_line_y + config.clef.y_adjust,
                font_size: config.clef.font_size,
            },
        }
    }
}
