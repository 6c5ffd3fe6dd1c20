//! Wire types published by the signing service.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Envelope of every event on the feed. `data` depends on the event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningEvent {
    /// Event id, unique per publication
    #[serde(default)]
    pub id: String,
    /// Event type, e.g. `signing.request.completed`
    #[serde(rename = "type", default)]
    pub event_type: String,
    /// Publishing service
    #[serde(default)]
    pub source: String,
    /// Publication time
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    /// Tenant the event belongs to
    #[serde(default)]
    pub tenant_id: u32,
    /// Type-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SigningEvent {
    /// Parses an envelope from a raw feed payload.
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Decodes the type-specific payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.data)?)
    }
}

/// Payload of `signing.request.completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequestCompletedData {
    /// Signing request that completed
    pub request_id: String,
    /// Template the request was created from
    #[serde(default)]
    pub template_id: String,
    /// Display name of that template
    #[serde(default)]
    pub template_name: String,
    /// Storage key of the signed document
    #[serde(default)]
    pub signed_file_key: String,
    /// Tenant of the signing request; zero when not set
    #[serde(default)]
    pub tenant_id: u32,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_parse_completed_event() {
        let payload = r#"{
            "id": "evt-1",
            "type": "signing.request.completed",
            "source": "paperless",
            "timestamp": "2024-03-04T10:00:00Z",
            "tenant_id": 1,
            "data": {
                "request_id": "sig-123",
                "template_id": "tpl-leave",
                "template_name": "Leave approval",
                "signed_file_key": "signed/sig-123.pdf",
                "tenant_id": 1
            }
        }"#;

        let event = SigningEvent::parse(payload).unwrap();
        assert_eq!(event.event_type, "signing.request.completed");
        assert_eq!(event.tenant_id, 1);

        let data: SigningRequestCompletedData = event.data_as().unwrap();
        assert_eq!(data.request_id, "sig-123");
        assert_eq!(data.signed_file_key, "signed/sig-123.pdf");
    }

    #[test]
    fn test_missing_request_id_is_error() {
        let event = SigningEvent::parse(r#"{"type": "x", "data": {"template_id": "t"}}"#).unwrap();
        let result = event.data_as::<SigningRequestCompletedData>();
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_malformed_payload_is_error() {
        assert!(matches!(
            SigningEvent::parse("not json"),
            Err(Error::Serialization(_))
        ));
    }
}
