use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("timestamp outside tolerance")]
    Stale,
    #[error("no matching signature")]
    Mismatch,
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Builds a `Stripe-Signature` header value for `payload`.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let sig = signed_payload_mac(secret, timestamp, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={timestamp},v1={sig}")
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=…]`) against the
/// raw request body. Any `v1` entry may match; comparison is constant-time.
pub fn verify_stripe_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), SignatureError> {
    if header.trim().is_empty() {
        return Err(SignatureError::Missing);
    }

    let mut timestamp: Option<i64> = None;
    let mut candidates = vec![];
    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=').ok_or(SignatureError::Malformed)?;
        match key {
            "t" => timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?),
            "v1" => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Stale);
    }

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        let Some(mac) = signed_payload_mac(secret, timestamp, payload) else {
            return Err(SignatureError::Mismatch);
        };
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// The parts of a completed checkout session the reconciler relies on.
#[derive(Debug, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    pub payment_intent: Option<String>,
    pub payment_status: Option<String>,
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CompletedSession {
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            None | Some("paid") | Some("no_payment_required")
        )
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.customer_email.as_deref().or_else(|| {
            self.customer_details
                .as_ref()
                .and_then(|d| d.email.as_deref())
        })
    }

    /// The provider's payment reference, falling back to the session id.
    pub fn payment_reference(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

impl StripeEvent {
    pub fn completed_session(&self) -> Option<CompletedSession> {
        if self.event_type != CHECKOUT_COMPLETED {
            return None;
        }
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_750_000_000;

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signature_header(SECRET, NOW, body);
        assert_eq!(verify_stripe_signature(body, &header, SECRET, 300, NOW + 10), Ok(()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = signature_header(SECRET, NOW, br#"{"amount":100}"#);
        assert_eq!(
            verify_stripe_signature(br#"{"amount":1}"#, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = b"{}";
        let header = signature_header("whsec_other", NOW, body);
        assert_eq!(
            verify_stripe_signature(body, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"{}";
        let header = signature_header(SECRET, NOW, body);
        assert_eq!(
            verify_stripe_signature(body, &header, SECRET, 300, NOW + 301),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_any_v1_entry_may_match() {
        let body = b"{}";
        let good = signature_header(SECRET, NOW, body);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v0=zzz,v1={good_sig}");
        assert_eq!(verify_stripe_signature(body, &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(
            verify_stripe_signature(b"{}", "", SECRET, 300, NOW),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_stripe_signature(b"{}", "garbage", SECRET, 300, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_stripe_signature(b"{}", "v1=abcd", SECRET, 300, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_stripe_signature(b"{}", &format!("t={NOW}"), SECRET, 300, NOW),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_parse_completed_session() {
        let json = r#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_1",
                "payment_intent": "pi_1",
                "payment_status": "paid",
                "customer_email": null,
                "customer_details": {"email": "pro@example.com"},
                "metadata": {"user_id": "u-1", "kind": "cart", "dates": "[\"2025-06-10\"]"}
            }}
        }"#;
        let event: StripeEvent = serde_json::from_str(json).unwrap();
        let session = event.completed_session().unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.payment_reference(), "pi_1");
        assert_eq!(session.contact_email(), Some("pro@example.com"));
        assert!(session.is_paid());
        assert_eq!(session.metadata.get("kind").map(String::as_str), Some("cart"));
    }

    #[test]
    fn test_other_event_types_ignored() {
        let json = r#"{"id":"evt_2","type":"payment_intent.created","data":{"object":{"id":"pi_1"}}}"#;
        let event: StripeEvent = serde_json::from_str(json).unwrap();
        assert!(event.completed_session().is_none());
    }

    #[test]
    fn test_unpaid_session_is_not_paid() {
        let json = r#"{"id":"cs_1","payment_status":"unpaid"}"#;
        let session: CompletedSession = serde_json::from_str(json).unwrap();
        assert!(!session.is_paid());
        assert_eq!(session.payment_reference(), "cs_1");
    }
}
