//! Public key parsing and device info signature validation.
//!
//! Public keys are entered as whitespace-separated two-digit hex bytes, e.g.
//! `"DE AD BE EF"`.  The validator parses the key and delegates the actual
//! cryptographic check to the [`DeviceInfo`] payload, which knows the scheme
//! its signature was produced with.

use tracing::debug;

use crate::command::error::{CommandResult, LockerError};
use crate::command::info::DeviceInfo;

/// Parses a whitespace-separated hex public key into bytes.
///
/// Every token must be exactly two hexadecimal digits.  An empty key is
/// rejected as well, since no scheme accepts a zero-length key.
///
/// # Errors
///
/// Returns [`LockerError::InvalidKeyEncoding`] naming the first offending token.
pub fn parse_public_key(public_key_hex: &str) -> CommandResult<Vec<u8>> {
    let bytes = public_key_hex
        .split_whitespace()
        .map(|token| {
            // from_str_radix alone would accept a leading '+'.
            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid(token));
            }
            u8::from_str_radix(token, 16).map_err(|_| invalid(token))
        })
        .collect::<CommandResult<Vec<u8>>>()?;

    if bytes.is_empty() {
        return Err(invalid(""));
    }
    Ok(bytes)
}

fn invalid(token: &str) -> LockerError {
    LockerError::InvalidKeyEncoding {
        token: token.to_string(),
    }
}

/// Validates device info signatures against caller-supplied public keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureValidator;

impl SignatureValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks `info`'s signature against `public_key_hex`.
    ///
    /// Returns `Ok(false)` when the signature is well-formed but does not match.
    ///
    /// # Errors
    ///
    /// - [`LockerError::InvalidKeyEncoding`] if the key text cannot be parsed.
    /// - [`LockerError::SignatureVerificationFailed`] if the payload is unsigned
    ///   or the scheme rejects its inputs.
    pub fn validate(&self, info: &DeviceInfo, public_key_hex: &str) -> CommandResult<bool> {
        let key = parse_public_key(public_key_hex)?;
        let valid = info
            .validate_signature_with_public_key(&key)
            .map_err(LockerError::SignatureVerificationFailed)?;
        debug!(device = %info.device_id, kind = %info.kind, valid, "signature checked");
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::info::{MockSignatureScheme, VerificationError};
    use crate::domain::device::DeviceId;
    use crate::domain::session::DeviceInfoRequestKind;

    fn signed_info(scheme: MockSignatureScheme) -> DeviceInfo {
        DeviceInfo::new(
            DeviceId(1),
            1,
            "2.0.0",
            DeviceInfoRequestKind::ProjectKey,
            b"payload".to_vec(),
        )
        .with_signature(vec![0x55; 64], Arc::new(scheme))
    }

    // ── parse_public_key ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_spaced_hex_key() {
        assert_eq!(
            parse_public_key("DE AD BE EF").unwrap(),
            vec![0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn test_parse_accepts_lowercase_and_mixed_whitespace() {
        assert_eq!(parse_public_key(" de\tad\n01 ").unwrap(), vec![0xDE, 0xAD, 0x01]);
    }

    #[test]
    fn test_parse_rejects_non_hex_token() {
        assert_eq!(
            parse_public_key("DE ZZ"),
            Err(LockerError::InvalidKeyEncoding { token: "ZZ".to_string() })
        );
    }

    #[test]
    fn test_parse_rejects_single_digit_token() {
        assert!(matches!(
            parse_public_key("DE A"),
            Err(LockerError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_signed_token() {
        assert!(matches!(
            parse_public_key("+F"),
            Err(LockerError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unseparated_bytes() {
        assert!(matches!(
            parse_public_key("DEADBEEF"),
            Err(LockerError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty_key() {
        assert!(matches!(
            parse_public_key("   "),
            Err(LockerError::InvalidKeyEncoding { .. })
        ));
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn test_validate_returns_scheme_verdict() {
        // Arrange
        let mut scheme = MockSignatureScheme::new();
        scheme.expect_verify().times(1).returning(|key, _, _| Ok(key == [0xDEu8, 0xAD]));
        let info = signed_info(scheme);

        // Act
        let valid = SignatureValidator::new().validate(&info, "DE AD");

        // Assert
        assert_eq!(valid, Ok(true));
    }

    #[test]
    fn test_validate_malformed_key_never_reaches_scheme() {
        let mut scheme = MockSignatureScheme::new();
        scheme.expect_verify().never();
        let info = signed_info(scheme);

        let result = SignatureValidator::new().validate(&info, "not a key");

        assert!(matches!(result, Err(LockerError::InvalidKeyEncoding { .. })));
    }

    #[test]
    fn test_validate_propagates_scheme_error() {
        let mut scheme = MockSignatureScheme::new();
        scheme
            .expect_verify()
            .returning(|_, _, _| Err(VerificationError::MalformedKey("length".into())));
        let info = signed_info(scheme);

        let result = SignatureValidator::new().validate(&info, "01 02");

        assert_eq!(
            result,
            Err(LockerError::SignatureVerificationFailed(
                VerificationError::MalformedKey("length".into())
            ))
        );
    }

    #[test]
    fn test_validate_unsigned_info_fails() {
        let info = DeviceInfo::new(
            DeviceId(1),
            1,
            "2.0.0",
            DeviceInfoRequestKind::None,
            Vec::new(),
        );
        let result = SignatureValidator::new().validate(&info, "01");
        assert_eq!(
            result,
            Err(LockerError::SignatureVerificationFailed(
                VerificationError::MissingSignature
            ))
        );
    }
}
