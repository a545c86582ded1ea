//! Ed25519 signature scheme for device info payloads.
//!
//! Controllers sign their identity payload with an Ed25519 key provisioned
//! either per project or per device.  The client only ever verifies.

use ed25519_dalek::{Signature, VerifyingKey};
use locker_core::{SignatureScheme, VerificationError};

/// Verifies Ed25519 signatures (strict mode).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, VerificationError> {
        let key = VerifyingKey::try_from(public_key)
            .map_err(|e| VerificationError::MalformedKey(e.to_string()))?;
        let signature = Signature::from_slice(signature)
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
        Ok(key.verify_strict(message, &signature).is_ok())
    }
}

/// Formats key bytes the way users enter them: `"DE AD BE EF"`.
pub fn format_public_key(key: &[u8]) -> String {
    key.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
