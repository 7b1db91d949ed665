//! Wire envelope carrying a message between parties.
//!
//! A transport only moves envelopes; it never looks inside the payload.

use crate::error::{HaggleError, Result};
use crate::types::{Party, SessionId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::message::Message;

/// Routing metadata plus the payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub sender: Party,
    pub recipient: Party,
    pub session_id: SessionId,
    pub timestamp: u64,
    pub payload: Message,
}

impl Envelope {
    /// Wrap a payload sent by `sender` to the other party
    pub fn new(sender: Party, session_id: SessionId, payload: Message) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            id: format!("msg_{:016x}", rand::random::<u64>()),
            sender,
            recipient: sender.counterparty(),
            session_id,
            timestamp,
            payload,
        }
    }

    /// Serialize for the wire
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from the wire; payload prices are re-validated on the way in
    pub fn decode(data: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(data)?;

        if envelope.sender == envelope.recipient {
            return Err(HaggleError::InvalidMessage(format!(
                "envelope {} is addressed to its own sender",
                envelope.id
            )));
        }

        Ok(envelope)
    }
}
