//! Raw report helpers.
//!
//! A raw report is the byte slice received from one interrupt transfer. It is
//! only borrowed for the iteration that read it, so everything here works on
//! `&[u8]`.

use std::fmt;

use crate::error::{Error, Result};

/// Largest report a single interrupt transfer will return.
pub const MAX_REPORT_LEN: usize = 512;

/// Canonical text form of a byte sequence: `01 03 05 00`.
///
/// Two uppercase hex digits per byte, separated by single spaces.
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Parse whitespace-separated hex bytes, e.g. `"01 03 05 00 01 01"`.
///
/// Tokens may be one or two digits, upper or lower case.
///
/// # Errors
/// Returns [`Error::InvalidHex`] for any token that is not a hex byte.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    text.split_whitespace()
        .map(|token| {
            if token.len() > 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::InvalidHex(token.to_string()));
            }
            u8::from_str_radix(token, 16).map_err(|_| Error::InvalidHex(token.to_string()))
        })
        .collect()
}
