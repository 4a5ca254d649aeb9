//! Semantic gestures decoded from the control surface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rotation direction of a knob detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Clockwise
    Up,
    /// Counter-clockwise
    Down,
}

impl Direction {
    /// Signed detent count for this direction.
    #[must_use]
    pub fn sign(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// A single user action on the control surface.
///
/// Knob and button identifiers are device-specific constants taken from the
/// signature table, not derived from report contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Gesture {
    /// A knob moved one detent
    KnobTurn { knob: u8, direction: Direction },
    /// A button went down
    ButtonPress { button: u8 },
    /// A button came back up
    ButtonRelease { button: u8 },
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KnobTurn { knob, direction: Direction::Up } => write!(f, "knob {knob} up"),
            Self::KnobTurn { knob, direction: Direction::Down } => write!(f, "knob {knob} down"),
            Self::ButtonPress { button } => write!(f, "button {button} pressed"),
            Self::ButtonRelease { button } => write!(f, "button {button} released"),
        }
    }
}
