//! Retail barcode (EAN-8 / EAN-13) validation
//!
//! [`Ean`] is a validated newtype: the inner string is private so the only
//! way to obtain one is through [`Ean::parse`] or [`Ean::parse_format`].

use std::fmt;

/// Barcode validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BarcodeError {
    #[error("ean must be exactly 8 or 13 digits")]
    InvalidFormat,

    #[error("ean checksum is invalid")]
    InvalidChecksum,
}

/// Returns `true` iff `code` is 8 or 13 ASCII digits and passes the GS1
/// mod-10 checksum.
pub fn is_valid(code: &str) -> bool {
    has_valid_format(code) && gs1_checksum_ok(code.as_bytes())
}

/// Format gate only: exactly 8 or 13 ASCII digits.
pub fn has_valid_format(code: &str) -> bool {
    matches!(code.len(), 8 | 13) && code.bytes().all(|b| b.is_ascii_digit())
}

/// GS1 weighted checksum over all digits, check digit included.
///
/// Weights alternate 1/3 by 1-based position parity. EAN-13 weights odd
/// positions 1, EAN-8 weights odd positions 3.
fn gs1_checksum_ok(digits: &[u8]) -> bool {
    let (odd_weight, even_weight) = if digits.len() == 13 { (1, 3) } else { (3, 1) };

    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            // i is 0-based, position is i + 1
            if i % 2 == 0 {
                digit * odd_weight
            } else {
                digit * even_weight
            }
        })
        .sum();

    sum % 10 == 0
}

// ============================================================================
// Ean - Validated Barcode
// ============================================================================

/// Validated product barcode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ean(String);

impl Ean {
    /// Accept a barcode that is well-formed AND passes the checksum.
    pub fn parse(code: &str) -> Result<Self, BarcodeError> {
        let ean = Self::parse_format(code)?;
        if !gs1_checksum_ok(ean.0.as_bytes()) {
            return Err(BarcodeError::InvalidChecksum);
        }
        Ok(ean)
    }

    /// Accept any well-formed barcode; the checksum is not checked.
    pub fn parse_format(code: &str) -> Result<Self, BarcodeError> {
        if !has_valid_format(code) {
            return Err(BarcodeError::InvalidFormat);
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Ean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
