//! Signing gateway - client seam for the external document-signing service.
//!
//! The service accepts a signing request built from a template and returns an
//! opaque identifier. Completion is reported later on the event feed.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// One signer. Lower `signing_order` signs first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningRecipient {
    /// Signer email address
    pub email: String,
    /// Signer display name
    pub name: String,
    /// 1-based position in the signing sequence
    pub signing_order: u32,
}

/// Pre-filled template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningFieldValue {
    /// Template field identifier
    pub field_id: String,
    /// Rendered value
    pub value: String,
}

impl SigningFieldValue {
    /// Field `field_id` pre-filled with `value`.
    pub fn new(field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            value: value.into(),
        }
    }
}

/// Parameters of a signing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SigningRequest {
    /// Tenant the document belongs to
    pub tenant_id: u32,
    /// Template to instantiate
    pub template_id: String,
    /// Document title
    pub name: String,
    /// Signers in order
    pub recipients: Vec<SigningRecipient>,
    /// Pre-filled fields
    pub field_values: Vec<SigningFieldValue>,
    /// Message shown to signers
    pub message: String,
}

/// Opaque failure from the signing service.
#[derive(Debug, Error)]
#[error("signing service error: {0}")]
pub struct SigningError(pub String);

/// Client for the external signing service.
///
/// Calls are blocking outbound RPCs without retry.
#[async_trait]
pub trait SigningGateway: Send + Sync {
    /// Creates a signing request and returns its identifier.
    async fn create_signing_request(
        &self,
        request: SigningRequest,
    ) -> std::result::Result<String, SigningError>;
}
