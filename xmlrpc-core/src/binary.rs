//! `<base64>` values

use crate::error::ValueError;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;

// Peers differ on padding; accept both forms when decoding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Binary payload kept in its encoded form.
///
/// Values read off the wire are decoded only when [`Base64::decode`] is
/// called, so line-wrapped or unpadded encodings from other implementations
/// survive a parse untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Base64 {
    encoded: String,
}

impl Base64 {
    /// Encodes raw bytes with the standard alphabet and padding.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlrpc_core::Base64;
    ///
    /// let value = Base64::encode("you can't read this!");
    /// assert_eq!(value.encoded(), "eW91IGNhbid0IHJlYWQgdGhpcyE=");
    /// ```
    pub fn encode(data: impl AsRef<[u8]>) -> Self {
        Self {
            encoded: STANDARD.encode(data),
        }
    }

    /// Wraps text that is already base64, dropping any line breaks or
    /// indentation around it.
    pub fn from_encoded(text: &str) -> Self {
        Self {
            encoded: text.chars().filter(|c| !c.is_ascii_whitespace()).collect(),
        }
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn decode(&self) -> Result<Vec<u8>, ValueError> {
        LENIENT
            .decode(&self.encoded)
            .map_err(|e| ValueError::InvalidBase64(e.to_string()))
    }
}

impl fmt::Display for Base64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
