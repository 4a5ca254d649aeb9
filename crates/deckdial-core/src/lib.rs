//! Deckdial Core - Gesture model and report classification.
//!
//! This crate holds the device-independent pieces shared by the polling loop
//! and the actuator: the gesture vocabulary, the signature table that turns raw
//! interrupt reports into gestures, and the boundary gestures are handed across.

pub mod dispatch;
pub mod error;
pub mod gesture;
pub mod report;
pub mod signature;
pub mod state;

pub use dispatch::{DispatchError, GestureSink};
pub use error::{Error, Result};
pub use gesture::{Direction, Gesture};
pub use report::{HexBytes, MAX_REPORT_LEN, parse_hex};
pub use signature::{MatchMode, Signature, SignatureTable};
pub use state::ResilienceState;
