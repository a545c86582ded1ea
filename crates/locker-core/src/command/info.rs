//! Device identity payload and its signature verification capability.
//!
//! The transport returns a [`DeviceInfo`] for every info request.  Signed
//! scopes (`ProjectKey`, `DeviceKey`) carry a signature over `signed_payload`
//! together with the [`SignatureScheme`] the transport knows how to check it
//! with.  The client never implements the signature algorithm itself; it only
//! asks the payload to verify against a caller-supplied public key.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::device::DeviceId;
use crate::domain::session::DeviceInfoRequestKind;

/// Errors raised by a [`SignatureScheme`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The payload was fetched without a signature.
    #[error("device info carries no signature")]
    MissingSignature,
    /// The public key bytes are not a valid key for the scheme.
    #[error("malformed public key: {0}")]
    MalformedKey(String),
    /// The signature bytes are not a valid signature for the scheme.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

/// A signature algorithm supplied by the transport.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify, and
/// an error when the inputs cannot be interpreted at all.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureScheme: Send + Sync {
    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, VerificationError>;
}

/// Identity information fetched from a locker controller.
#[derive(Clone, Serialize)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub project_id: u32,
    pub firmware_version: String,
    /// The scope this payload was fetched with.
    pub kind: DeviceInfoRequestKind,
    /// The bytes covered by `signature`.
    pub signed_payload: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
    #[serde(skip)]
    scheme: Option<Arc<dyn SignatureScheme>>,
}

impl DeviceInfo {
    /// Creates an unsigned payload.
    pub fn new(
        device_id: DeviceId,
        project_id: u32,
        firmware_version: impl Into<String>,
        kind: DeviceInfoRequestKind,
        signed_payload: Vec<u8>,
    ) -> Self {
        Self {
            device_id,
            project_id,
            firmware_version: firmware_version.into(),
            kind,
            signed_payload,
            signature: None,
            scheme: None,
        }
    }

    /// Attaches a signature and the scheme able to verify it.
    pub fn with_signature(mut self, signature: Vec<u8>, scheme: Arc<dyn SignatureScheme>) -> Self {
        self.signature = Some(signature);
        self.scheme = Some(scheme);
        self
    }

    /// Verifies `signature` over `signed_payload` with `public_key`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::MissingSignature`] for unsigned payloads,
    /// and whatever the scheme reports for malformed inputs.
    pub fn validate_signature_with_public_key(
        &self,
        public_key: &[u8],
    ) -> Result<bool, VerificationError> {
        match (&self.signature, &self.scheme) {
            (Some(signature), Some(scheme)) => {
                scheme.verify(public_key, &self.signed_payload, signature)
            }
            _ => Err(VerificationError::MissingSignature),
        }
    }
}

impl fmt::Debug for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInfo")
            .field("device_id", &self.device_id)
            .field("project_id", &self.project_id)
            .field("firmware_version", &self.firmware_version)
            .field("kind", &self.kind)
            .field("signed_payload", &self.signed_payload)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Equality ignores the verification scheme; two payloads with the same bytes
/// are the same payload.
impl PartialEq for DeviceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.device_id == other.device_id
            && self.project_id == other.project_id
            && self.firmware_version == other.firmware_version
            && self.kind == other.kind
            && self.signed_payload == other.signed_payload
            && self.signature == other.signature
    }
}

impl Eq for DeviceInfo {}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn unsigned() -> DeviceInfo {
        DeviceInfo::new(
            DeviceId(1),
            1,
            "2.4.0",
            DeviceInfoRequestKind::None,
            b"locker-1".to_vec(),
        )
    }

    #[test]
    fn test_unsigned_info_reports_missing_signature() {
        let info = unsigned();
        assert_eq!(
            info.validate_signature_with_public_key(&[1, 2, 3]),
            Err(VerificationError::MissingSignature)
        );
    }

    #[test]
    fn test_signed_info_delegates_to_scheme() {
        // Arrange
        let mut scheme = MockSignatureScheme::new();
        scheme
            .expect_verify()
            .with(eq(vec![0xDEu8, 0xAD]), eq(b"locker-1".to_vec()), eq(vec![9u8; 4]))
            .times(1)
            .returning(|_, _, _| Ok(true));
        let info = unsigned().with_signature(vec![9; 4], Arc::new(scheme));

        // Act
        let result = info.validate_signature_with_public_key(&[0xDE, 0xAD]);

        // Assert
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_equality_ignores_scheme() {
        let mut scheme = MockSignatureScheme::new();
        scheme.expect_verify().never();
        let a = unsigned().with_signature(vec![1], Arc::new(scheme));
        let mut b = unsigned();
        b.signature = Some(vec![1]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_debug_does_not_require_scheme_debug() {
        let rendered = format!("{:?}", unsigned());
        assert!(rendered.contains("firmware_version"));
    }
}
