//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers used when talking to SIFEN.
//! Each identifier is a distinct type — you cannot pass a [`StampNumber`]
//! where a [`Ruc`] is expected.
//!
//! ## Validation
//!
//! All identifiers validate format at construction time. Deserialization
//! routes through the same constructors, so malformed identifiers coming in
//! over the wire or from a state file are rejected at the boundary, not
//! discovered later inside a request payload.
//!
//! ## Formats
//!
//! - RUC: Paraguay taxpayer registration number, used here *without* its
//!   check digit (1 to 8 digits).
//! - Stamp number (timbrado): 8-digit issuance authorization number.
//! - Security code (CSC): secret numeric code used by the authority to
//!   derive document control codes; never logged or displayed.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Paraguay taxpayer registration number (RUC), without the check digit.
///
/// SIFEN authentication identifies the taxpayer by the base number alone;
/// the check digit is a display concern and is deliberately not modeled.
///
/// # Validation
///
/// - 1 to 8 ASCII digits
/// - Leading zeros are significant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ruc(String);

impl_validating_deserialize!(Ruc);

impl Ruc {
    /// Create a RUC from a string value, validating the digit format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRuc`] if the string is empty,
    /// longer than 8 characters, or contains a non-digit.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.len() > 8 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidRuc(s));
        }
        Ok(Self(s))
    }

    /// Access the RUC string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ruc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issuance authorization number (timbrado) granted by the tax authority.
///
/// A taxpayer may only issue electronic documents under a currently valid
/// stamp. The number itself is public; validity is a property of the
/// issuer configuration that carries it.
///
/// # Validation
///
/// - Exactly 8 ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StampNumber(String);

impl_validating_deserialize!(StampNumber);

impl StampNumber {
    /// Create a stamp number from a string value, validating the 8-digit
    /// format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStampNumber`] if the string is not
    /// exactly 8 digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidStampNumber(s));
        }
        Ok(Self(s))
    }

    /// Access the stamp number string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StampNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Taxpayer security code (CSC) used by the authority to derive document
/// control codes.
///
/// The value is secret. `Debug` and `Display` render a redacted placeholder
/// so the code cannot leak through logs or error messages; serialization is
/// still faithful because the code must round-trip through the persisted
/// issuer configuration.
///
/// # Validation
///
/// - 1 to 32 ASCII digits
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityCode(String);

impl_validating_deserialize!(SecurityCode);

impl SecurityCode {
    /// Create a security code from a string value, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSecurityCode`] if the string is
    /// empty, longer than 32 characters, or contains a non-digit.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.len() > 32 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidSecurityCode);
        }
        Ok(Self(s))
    }

    /// Access the secret value. Callers building request payloads need the
    /// raw code; nothing else should touch it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecurityCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecurityCode(<redacted>)")
    }
}

impl std::fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Ruc --------------------------------------------------------------------

    #[test]
    fn ruc_accepts_short_numbers() {
        let ruc = Ruc::new("5452").expect("should accept 4-digit RUC");
        assert_eq!(ruc.as_str(), "5452");
    }

    #[test]
    fn ruc_accepts_8_digits() {
        assert!(Ruc::new("80012345").is_ok());
    }

    #[test]
    fn ruc_preserves_leading_zeros() {
        let ruc = Ruc::new("0452").expect("should accept leading zero");
        assert_eq!(ruc.as_str(), "0452");
    }

    #[test]
    fn ruc_rejects_empty() {
        assert!(matches!(
            Ruc::new(""),
            Err(ValidationError::InvalidRuc(_))
        ));
    }

    #[test]
    fn ruc_rejects_too_long() {
        assert!(Ruc::new("123456789").is_err());
    }

    #[test]
    fn ruc_rejects_check_digit_suffix() {
        // The dash-check-digit form is a display format, not an identifier.
        assert!(Ruc::new("5452-0").is_err());
    }

    #[test]
    fn ruc_deserialize_validates() {
        let ok: Result<Ruc, _> = serde_json::from_str("\"5452\"");
        assert!(ok.is_ok());
        let bad: Result<Ruc, _> = serde_json::from_str("\"54a2\"");
        assert!(bad.is_err());
    }

    // -- StampNumber ------------------------------------------------------------

    #[test]
    fn stamp_number_accepts_8_digits() {
        let stamp = StampNumber::new("12558946").expect("should accept 8 digits");
        assert_eq!(stamp.as_str(), "12558946");
    }

    #[test]
    fn stamp_number_rejects_7_digits() {
        assert!(StampNumber::new("1255894").is_err());
    }

    #[test]
    fn stamp_number_rejects_non_digits() {
        assert!(StampNumber::new("1255894a").is_err());
    }

    // -- SecurityCode -----------------------------------------------------------

    #[test]
    fn security_code_accepts_digits() {
        let csc = SecurityCode::new("123456789").expect("should accept CSC");
        assert_eq!(csc.expose(), "123456789");
    }

    #[test]
    fn security_code_rejects_empty() {
        assert!(SecurityCode::new("").is_err());
    }

    #[test]
    fn security_code_debug_is_redacted() {
        let csc = SecurityCode::new("123456789").expect("valid CSC");
        let rendered = format!("{csc:?} {csc}");
        assert!(!rendered.contains("123456789"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn security_code_serializes_faithfully() {
        let csc = SecurityCode::new("0042").expect("valid CSC");
        let json = serde_json::to_string(&csc).expect("serialize");
        assert_eq!(json, "\"0042\"");
        let back: SecurityCode = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, csc);
    }
}
