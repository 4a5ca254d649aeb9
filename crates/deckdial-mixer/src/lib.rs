//! Deckdial Mixer - Turns gestures into audio sink changes.
//!
//! The polling loop hands gestures to a [`QueueDispatch`] without waiting; an
//! [`ActuatorWorker`] on the async runtime drains the queue and drives a single
//! shared [`VolumeControl`] according to the configured [`Bindings`].

pub mod actuator;
pub mod bindings;
pub mod error;
pub mod pactl;
pub mod volume;

pub use actuator::{Actuator, ActuatorWorker, QueueDispatch, queue};
pub use bindings::{Action, Bindings, ButtonAction, ButtonBinding, KnobBinding};
pub use error::{MixerError, MixerResult};
pub use pactl::PactlSink;
pub use volume::{VolumeControl, stepped_volume};
