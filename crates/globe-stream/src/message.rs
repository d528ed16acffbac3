//! Wire format of the blockchain.info `inv` feed.
//!
//! Only two shapes matter:
//!
//! ```text
//! → {"op":"unconfirmed_sub"}
//! ← {"op":"utx","x":{"hash":"…","out":[{"value":500,…},…],…}}
//! ```
//!
//! Everything else the feed sends is ignored.

use crate::error::Result;
use crate::types::{GeoPoint, Transaction};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Messages we send upstream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Subscribe to unconfirmed-transaction notifications
    UnconfirmedSub,
}

impl OutboundMessage {
    /// Serialize to the JSON text frame.
    pub fn to_json(&self) -> String {
        // Unit variants of an internally tagged enum always serialize.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Messages received from upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op")]
pub enum InboundMessage {
    /// Unconfirmed transaction notification
    #[serde(rename = "utx")]
    Utx { x: RawTransaction },
    /// Any other operation tag
    #[serde(other)]
    Other,
}

/// The `x` payload of a `utx` message.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    #[serde(default)]
    pub out: Vec<RawOutput>,
}

/// One transaction output. Only the value is read.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOutput {
    #[serde(default)]
    pub value: u64,
}

impl RawTransaction {
    /// Sum of output values, saturating at `u64::MAX`.
    pub fn total_value(&self) -> u64 {
        self.out
            .iter()
            .fold(0u64, |sum, output| sum.saturating_add(output.value))
    }

    /// Stamp receipt time and synthetic locations.
    pub fn into_transaction<R: Rng + ?Sized>(self, received_at: SystemTime, rng: &mut R) -> Transaction {
        let value = self.total_value();
        Transaction {
            hash: self.hash,
            value,
            received_at,
            origin: GeoPoint::random(rng),
            destination: GeoPoint::random(rng),
        }
    }
}

/// Parse a text frame.
pub fn parse(text: &str) -> Result<InboundMessage> {
    Ok(serde_json::from_str(text)?)
}

/// Decode a text frame into a transaction.
///
/// Returns `None` for malformed JSON and for any operation other than `utx`.
pub fn decode<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<Transaction> {
    match parse(text) {
        Ok(InboundMessage::Utx { x }) => Some(x.into_transaction(SystemTime::now(), rng)),
        Ok(InboundMessage::Other) => {
            tracing::debug!("Ignoring non-utx message");
            None
        }
        Err(e) => {
            tracing::debug!("Dropping undecodable message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn subscription_frame() {
        assert_eq!(OutboundMessage::UnconfirmedSub.to_json(), r#"{"op":"unconfirmed_sub"}"#);
    }

    #[test]
    fn utx_sums_outputs() {
        let text = r#"{"op":"utx","x":{"hash":"abc","out":[{"value":500},{"value":1500}]}}"#;
        let tx = decode(text, &mut rng()).expect("utx decodes");
        assert_eq!(tx.hash, "abc");
        assert_eq!(tx.value, 2000);
        assert!(tx.received_at_ms() > 0);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let text = r#"{"op":"utx","x":{"hash":"h","ver":1,"inputs":[],"out":[{"value":7,"addr":"1A","spent":false}]}}"#;
        let tx = decode(text, &mut rng()).expect("utx decodes");
        assert_eq!(tx.value, 7);
    }

    #[test]
    fn empty_outputs_sum_to_zero() {
        let text = r#"{"op":"utx","x":{"hash":"h","out":[]}}"#;
        assert_eq!(decode(text, &mut rng()).map(|t| t.value), Some(0));
    }

    #[test]
    fn huge_values_saturate() {
        let text = format!(
            r#"{{"op":"utx","x":{{"hash":"h","out":[{{"value":{}}},{{"value":10}}]}}}}"#,
            u64::MAX
        );
        assert_eq!(decode(&text, &mut rng()).map(|t| t.value), Some(u64::MAX));
    }

    #[test]
    fn other_ops_are_dropped() {
        tokio_test::assert_ok!(parse(r#"{"op":"ping"}"#));
        assert!(decode(r#"{"op":"ping"}"#, &mut rng()).is_none());
        assert!(decode(r#"{"op":"block","x":{}}"#, &mut rng()).is_none());
    }

    #[test]
    fn malformed_input_is_dropped() {
        assert!(decode("not json", &mut rng()).is_none());
        assert!(decode(r#"{"x":{"hash":"abc"}}"#, &mut rng()).is_none());
        assert!(decode(r#"{"op":"utx"}"#, &mut rng()).is_none());
        assert!(decode(r#"{"op":"utx","x":{"hash":"a","out":[{"value":-5}]}}"#, &mut rng()).is_none());
    }

    #[test]
    fn duplicates_decode_independently() {
        let text = r#"{"op":"utx","x":{"hash":"dup","out":[{"value":1}]}}"#;
        let mut rng = rng();
        let a = decode(text, &mut rng).expect("first");
        let b = decode(text, &mut rng).expect("second");
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.origin, b.origin);
    }
}
