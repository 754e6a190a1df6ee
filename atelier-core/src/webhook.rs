use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted clock skew between the signature timestamp and now.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook payload")]
    MalformedPayload,
}

/// Provider event envelope, parsed only after the signature checks out.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: IntentObject,
}

#[derive(Debug, Deserialize)]
pub struct IntentObject {
    pub id: String,
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: IntentMetadata,
}

/// Order metadata carried on the payment intent at creation time.
#[derive(Debug, Default, Deserialize)]
pub struct IntentMetadata {
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// Verify the provider signature over the raw payload and only then parse
/// the event. `header` is the `Stripe-Signature` value, of the form
/// `t=<unix seconds>,v1=<hex hmac>`; the signed message is `"{t}.{payload}"`.
pub fn verify_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<WebhookEvent, WebhookError> {
    let (timestamp, signatures) = parse_signature_header(header)?;

    // Reject replayed deliveries outside the tolerance window
    let now = chrono::Utc::now().timestamp();
    if (now - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::InvalidSignature);
    }

    let mut verified = false;
    for signature in &signatures {
        let Ok(bytes) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant-time
        if mac.verify_slice(&bytes).is_ok() {
            verified = true;
        }
    }
    if !verified {
        return Err(WebhookError::InvalidSignature);
    }

    serde_json::from_slice(payload).map_err(|_| WebhookError::MalformedPayload)
}

fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    match timestamp {
        Some(t) if !signatures.is_empty() => Ok((t, signatures)),
        _ => Err(WebhookError::InvalidSignature),
    }
}

/// Compute a `Stripe-Signature` header value for a payload. Used by tests
/// and local tooling to produce deliveries that pass verification.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn succeeded_payload(order_id: Uuid) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_1",
                    "status": "succeeded",
                    "metadata": { "order_id": order_id }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn accepts_correctly_signed_event() {
        let order_id = Uuid::new_v4();
        let payload = succeeded_payload(order_id);
        let header = sign_payload(&payload, SECRET, chrono::Utc::now().timestamp());

        let event = verify_event(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object.metadata.order_id, Some(order_id));
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = succeeded_payload(Uuid::new_v4());
        let header = sign_payload(&payload, SECRET, chrono::Utc::now().timestamp());

        let mut tampered = payload.clone();
        tampered[10] ^= 1;
        let err = verify_event(&tampered, &header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = succeeded_payload(Uuid::new_v4());
        let header = sign_payload(&payload, "whsec_other", chrono::Utc::now().timestamp());

        let err = verify_event(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_garbage_header() {
        let payload = succeeded_payload(Uuid::new_v4());
        for header in ["", "t=abc", "v1=00", "nonsense"] {
            let err = verify_event(&payload, header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidSignature));
        }
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = succeeded_payload(Uuid::new_v4());
        let stale = chrono::Utc::now().timestamp() - DEFAULT_TOLERANCE_SECS - 60;
        let header = sign_payload(&payload, SECRET, stale);

        let err = verify_event(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn signature_must_be_checked_before_payload_is_parsed() {
        // Not even valid JSON: must fail on the signature, never on parsing
        let payload = b"not json at all";
        let header = "t=0,v1=deadbeef";
        let err = verify_event(payload, header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn signed_garbage_is_malformed_payload() {
        let payload = b"not json at all";
        let header = sign_payload(payload, SECRET, chrono::Utc::now().timestamp());
        let err = verify_event(payload, &header, SECRET, DEFAULT_TOLERANCE_SECS).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload));
    }
}
