//! Final report of a negotiation

use crate::fsm::FailureReason;
use crate::types::{Hash, Party, SessionId};
use serde::Serialize;

use super::context::{LogEntry, NegotiationContext, Outcome};

/// Outcome, statistics and full log of one session
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NegotiationResult {
    pub session_id: SessionId,
    pub agreed: bool,
    pub final_price: Option<f64>,
    /// Seller actions in the log, i.e. completed buyer/seller rounds
    pub turns_taken: u32,
    pub failure_reason: Option<FailureReason>,
    pub failure_detail: Option<String>,
    pub messages: Vec<LogEntry>,
    /// Blake2b digest of the serialized log
    pub transcript: Hash,
}

impl NegotiationResult {
    pub fn from_context(session_id: SessionId, ctx: &NegotiationContext) -> Self {
        let messages = ctx.messages().to_vec();
        let turns_taken = messages
            .iter()
            .filter(|entry| entry.actor == Party::Seller)
            .count() as u32;

        let (agreed, final_price, failure_reason, failure_detail) = match ctx.outcome() {
            Outcome::Agreed { price } => (true, Some(price.value()), None, None),
            Outcome::Failed { reason, detail } => (false, None, Some(reason), Some(detail)),
            Outcome::Pending => (false, None, None, None),
        };

        Self {
            session_id,
            agreed,
            final_price,
            turns_taken,
            failure_reason,
            failure_detail,
            transcript: transcript_digest(&messages),
            messages,
        }
    }

    /// First buyer offer, if the buyer ever made one
    pub fn opening_offer(&self) -> Option<f64> {
        self.messages
            .iter()
            .find(|entry| entry.actor == Party::Buyer)
            .and_then(|entry| entry.action.price())
            .map(|price| price.value())
    }
}

/// Digest of a message log; equal logs give equal digests
pub fn transcript_digest(messages: &[LogEntry]) -> Hash {
    let bytes = serde_json::to_vec(messages).unwrap_or_default();
    Hash::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::NegotiationTerms;
    use crate::protocol::Message;

    #[test]
    fn test_pending_result() {
        let ctx = NegotiationContext::new(NegotiationTerms::new(450.0, 350.0, 500.0, 10).unwrap());
        let result = NegotiationResult::from_context(SessionId("s".to_string()), &ctx);

        assert!(!result.agreed);
        assert_eq!(result.turns_taken, 0);
        assert!(result.failure_reason.is_none());
        assert_eq!(result.transcript, transcript_digest(&[]));
    }

    #[test]
    fn test_digest_depends_on_content() {
        let a = vec![LogEntry {
            turn: 0,
            actor: Party::Buyer,
            action: Message::offer(270.0, "").unwrap(),
        }];
        let b = vec![LogEntry {
            turn: 0,
            actor: Party::Buyer,
            action: Message::offer(271.0, "").unwrap(),
        }];

        assert_eq!(transcript_digest(&a), transcript_digest(&a.clone()));
        assert_ne!(transcript_digest(&a), transcript_digest(&b));
    }

    #[test]
    fn test_serializes_transcript_as_hex() {
        let ctx = NegotiationContext::new(NegotiationTerms::new(450.0, 350.0, 500.0, 10).unwrap());
        let result = NegotiationResult::from_context(SessionId("s".to_string()), &ctx);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["transcript"].as_str().unwrap().len(), 64);
        assert_eq!(json["session_id"], "s");
    }
}
