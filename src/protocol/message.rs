//! Negotiation message payloads

use crate::error::{HaggleError, Result};
use crate::types::Price;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message kind, used by the policy and by trace events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Offer,
    Counter,
    Accept,
    Reject,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Offer => "offer",
            MessageKind::Counter => "counter",
            MessageKind::Accept => "accept",
            MessageKind::Reject => "reject",
        };
        write!(f, "{}", name)
    }
}

/// A single negotiation action.
///
/// Prices are [`Price`] values, so a message holding a zero or negative price
/// cannot be constructed or deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Buyer proposes a price
    Offer {
        price: Price,
        #[serde(default)]
        note: String,
    },
    /// Seller answers an offer with its own price
    Counter {
        price: Price,
        original_price: Price,
        #[serde(default)]
        note: String,
    },
    /// Accept the other side's latest price and close the deal
    Accept {
        price: Price,
        #[serde(default)]
        note: String,
    },
    /// Walk away without a deal
    Reject {
        reason: String,
        #[serde(default)]
        final_offer: Option<Price>,
    },
}

impl Message {
    /// Build an offer from a raw amount
    pub fn offer(price: f64, note: impl Into<String>) -> Result<Self> {
        Ok(Message::Offer {
            price: Price::new(price)?,
            note: note.into(),
        })
    }

    /// Build a counter-offer from raw amounts
    pub fn counter(price: f64, original_price: f64, note: impl Into<String>) -> Result<Self> {
        Ok(Message::Counter {
            price: Price::new(price)?,
            original_price: Price::new(original_price)?,
            note: note.into(),
        })
    }

    /// Build an acceptance from a raw amount
    pub fn accept(price: f64, note: impl Into<String>) -> Result<Self> {
        Ok(Message::Accept {
            price: Price::new(price)?,
            note: note.into(),
        })
    }

    /// Build a rejection; a final offer, when given, must be a valid price
    pub fn reject(reason: impl Into<String>, final_offer: Option<f64>) -> Result<Self> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(HaggleError::InvalidMessage(
                "rejection requires a reason".to_string(),
            ));
        }

        Ok(Message::Reject {
            reason,
            final_offer: final_offer.map(Price::new).transpose()?,
        })
    }

    /// Parse a JSON payload
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Kind of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Offer { .. } => MessageKind::Offer,
            Message::Counter { .. } => MessageKind::Counter,
            Message::Accept { .. } => MessageKind::Accept,
            Message::Reject { .. } => MessageKind::Reject,
        }
    }

    /// Price carried by this message, if any
    pub fn price(&self) -> Option<Price> {
        match self {
            Message::Offer { price, .. }
            | Message::Counter { price, .. }
            | Message::Accept { price, .. } => Some(*price),
            Message::Reject { final_offer, .. } => *final_offer,
        }
    }

    /// Whether this message ends the negotiation
    pub fn is_terminal(&self) -> bool {
        matches!(self, Message::Accept { .. } | Message::Reject { .. })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Offer { price, .. } => write!(f, "offer {}", price),
            Message::Counter {
                price,
                original_price,
                ..
            } => write!(f, "counter {} (to {})", price, original_price),
            Message::Accept { price, .. } => write!(f, "accept {}", price),
            Message::Reject { reason, .. } => write!(f, "reject ({})", reason),
        }
    }
}
