//! Report signatures and gesture classification.
//!
//! The control surface's report layout is fixed, so reports are recognised by
//! pattern rather than by parsing a HID descriptor. A [`SignatureTable`] is an
//! ordered list of byte patterns; the first pattern that matches a report
//! decides its gesture.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::gesture::{Direction, Gesture};
use crate::report::{HexBytes, MAX_REPORT_LEN, parse_hex};

/// How a signature is compared against a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Report must start with the signature bytes
    #[default]
    Prefix,
    /// Signature may appear anywhere in the report.
    ///
    /// Byte-aligned, so it accepts exactly the reports whose canonical hex
    /// text contains the signature's hex text.
    Contains,
}

/// A byte pattern and the gesture it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
    gesture: Gesture,
}

impl Signature {
    /// Create a signature from raw bytes.
    ///
    /// # Errors
    /// Returns an error if `bytes` is empty or longer than a report can be.
    pub fn new(bytes: Vec<u8>, gesture: Gesture) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::EmptySignature);
        }
        if bytes.len() > MAX_REPORT_LEN {
            return Err(Error::SignatureTooLong(bytes.len()));
        }
        Ok(Self { bytes, gesture })
    }

    /// Create a signature from canonical hex text such as `"01 00 08 00 01"`.
    ///
    /// # Errors
    /// Returns an error if the text is not valid hex or is empty.
    pub fn parse(hex: &str, gesture: Gesture) -> Result<Self> {
        Self::new(parse_hex(hex)?, gesture)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Check whether `report` carries this signature.
    #[must_use]
    pub fn matches(&self, report: &[u8], mode: MatchMode) -> bool {
        match mode {
            MatchMode::Prefix => report.starts_with(&self.bytes),
            MatchMode::Contains => report.windows(self.bytes.len()).any(|w| w == self.bytes),
        }
    }
}

/// Ordered signature list used to classify reports.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    mode: MatchMode,
    signatures: Vec<Signature>,
}

impl SignatureTable {
    /// Build a table, keeping registration order.
    ///
    /// A signature that can never win because an earlier one always matches
    /// first is accepted but logged.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateSignature`] if two entries share the same bytes.
    pub fn new(mode: MatchMode, signatures: Vec<Signature>) -> Result<Self> {
        for (i, later) in signatures.iter().enumerate() {
            for earlier in &signatures[..i] {
                if earlier.bytes == later.bytes {
                    return Err(Error::DuplicateSignature(HexBytes(&later.bytes).to_string()));
                }
                if earlier.matches(&later.bytes, mode) {
                    warn!(
                        signature = %HexBytes(&later.bytes),
                        shadowed_by = %HexBytes(&earlier.bytes),
                        "Signature can never match, an earlier entry always wins"
                    );
                }
            }
        }
        Ok(Self { mode, signatures })
    }

    /// Signatures captured from real Stream Deck Plus hardware.
    #[must_use]
    pub fn builtin(mode: MatchMode) -> Self {
        Self { mode, signatures: builtin_signatures() }
    }

    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    #[must_use]
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Map a raw report to at most one gesture.
    ///
    /// The first matching signature in registration order wins. If a later
    /// signature also matches, a warning is logged and the first still wins.
    #[must_use]
    pub fn classify(&self, report: &[u8]) -> Option<Gesture> {
        let index = self.signatures.iter().position(|s| s.matches(report, self.mode))?;
        let winner = &self.signatures[index];

        if let Some(other) =
            self.signatures[index + 1..].iter().find(|s| s.matches(report, self.mode))
        {
            warn!(
                report = %HexBytes(report),
                chosen = %winner.gesture,
                ignored = %other.gesture,
                "Report matches more than one signature"
            );
        }

        Some(winner.gesture)
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::builtin(MatchMode::default())
    }
}

/// Known report signatures.
///
/// Knob-down, second knob and release reports have not been captured yet;
/// add them through the config file once they have.
fn builtin_signatures() -> Vec<Signature> {
    vec![
        Signature {
            bytes: vec![0x01, 0x03, 0x05, 0x00, 0x01, 0x01],
            gesture: Gesture::KnobTurn { knob: 1, direction: Direction::Up },
        },
        Signature {
            bytes: vec![0x01, 0x00, 0x08, 0x00, 0x01],
            gesture: Gesture::ButtonPress { button: 1 },
        },
    ]
}
