//! Which gesture does what.

use deckdial_core::Gesture;
use serde::{Deserialize, Serialize};

/// Knob to volume mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnobBinding {
    /// Knob identifier from the signature table
    pub knob: u8,
    /// Volume steps per detent; negative inverts the knob
    #[serde(default = "default_clicks")]
    pub clicks: i32,
}

fn default_clicks() -> i32 {
    1
}

/// What a button press does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Mute or unmute the sink
    ToggleMute,
    /// Only log the press
    Log,
}

/// Button to action mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub button: u8,
    pub action: ButtonAction,
}

/// Resolved effect of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AdjustVolume(i32),
    ToggleMute,
    Log(Gesture),
    Unbound(Gesture),
}

/// All knob and button bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub knobs: Vec<KnobBinding>,
    pub buttons: Vec<ButtonBinding>,
}

impl Bindings {
    #[must_use]
    pub fn new(knobs: Vec<KnobBinding>, buttons: Vec<ButtonBinding>) -> Self {
        Self { knobs, buttons }
    }

    /// Knob 1 drives the volume, button 1 toggles mute.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            knobs: vec![KnobBinding { knob: 1, clicks: 1 }],
            buttons: vec![ButtonBinding { button: 1, action: ButtonAction::ToggleMute }],
        }
    }

    /// Look up what `gesture` should do. The first binding for an id wins.
    #[must_use]
    pub fn action_for(&self, gesture: Gesture) -> Action {
        match gesture {
            Gesture::KnobTurn { knob, direction } => self
                .knobs
                .iter()
                .find(|b| b.knob == knob)
                .map_or(Action::Unbound(gesture), |b| {
                    Action::AdjustVolume(b.clicks.saturating_mul(direction.sign()))
                }),
            Gesture::ButtonPress { button } => {
                match self.buttons.iter().find(|b| b.button == button) {
                    Some(ButtonBinding { action: ButtonAction::ToggleMute, .. }) => Action::ToggleMute,
                    Some(ButtonBinding { action: ButtonAction::Log, .. }) => Action::Log(gesture),
                    None => Action::Unbound(gesture),
                }
            }
            Gesture::ButtonRelease { button } => {
                if self.buttons.iter().any(|b| b.button == button) {
                    Action::Log(gesture)
                } else {
                    Action::Unbound(gesture)
                }
            }
        }
    }
}
