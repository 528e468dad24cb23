//! Input validation primitives
//!
//! - [`sanitize`]: free-text sanitizer and per-field limits
//! - [`barcode`]: EAN-8 / EAN-13 format and GS1 checksum

pub mod barcode;
pub mod sanitize;

pub use barcode::{BarcodeError, Ean};
pub use sanitize::{FieldError, FieldLimit, SanitizeError, SanitizeResult, sanitize};

use crate::result::{ErrorKind, GatewayError};

impl From<BarcodeError> for GatewayError {
    fn from(err: BarcodeError) -> Self {
        let kind = match err {
            BarcodeError::InvalidFormat => ErrorKind::InvalidEan,
            BarcodeError::InvalidChecksum => ErrorKind::InvalidEanChecksum,
        };
        GatewayError::new(kind, err.to_string())
    }
}

impl From<FieldError> for GatewayError {
    fn from(err: FieldError) -> Self {
        GatewayError::invalid_input(err.to_string())
    }
}
