//! Coordination policy: which actions are legal, independent of the state
//! machine and of message delivery.
//!
//! Rules:
//! 1. Only the expected party may act, and nobody acts after the end.
//! 2. Buyers offer, sellers counter; either may accept or reject.
//! 3. Buyer offers never go down, seller counters never go up.
//! 4. Offers stay under the buyer's maximum, counters above the seller's minimum,
//!    and a deal is only closed inside the window between the two.

use crate::protocol::Message;
use crate::types::{Party, Price};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of policy violations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyViolation {
    WrongTurn,
    InvalidMessageType,
    PriceIncreased,
    PriceDecreased,
    BelowMinimum,
    AboveMaximum,
    NegotiationEnded,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Result of a policy check
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub allowed: bool,
    pub violation: Option<PolicyViolation>,
    pub reason: String,
}

impl PolicyResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            violation: None,
            reason: String::new(),
        }
    }

    pub fn deny(violation: PolicyViolation, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            violation: Some(violation),
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Stateless legality checks for one negotiation
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinationPolicy {
    buyer_max_price: f64,
    seller_min_price: f64,
    require_progress: bool,
}

impl CoordinationPolicy {
    /// Policy that requires monotonic concessions
    pub fn new(buyer_max_price: Price, seller_min_price: Price) -> Self {
        Self {
            buyer_max_price: buyer_max_price.value(),
            seller_min_price: seller_min_price.value(),
            require_progress: true,
        }
    }

    /// Toggle the concession-direction rule
    pub fn with_progress(mut self, require_progress: bool) -> Self {
        self.require_progress = require_progress;
        self
    }

    pub fn buyer_max_price(&self) -> f64 {
        self.buyer_max_price
    }

    pub fn seller_min_price(&self) -> f64 {
        self.seller_min_price
    }

    /// Only the expected party can act, and only before the end
    pub fn validate_turn(&self, actor: Party, expected: Party, is_terminal: bool) -> PolicyResult {
        if is_terminal {
            return PolicyResult::deny(
                PolicyViolation::NegotiationEnded,
                "negotiation has ended",
            );
        }

        if actor != expected {
            return PolicyResult::deny(
                PolicyViolation::WrongTurn,
                format!("expected {}, got {}", expected, actor),
            );
        }

        PolicyResult::allow()
    }

    /// Buyer offers stay under the maximum and never decrease
    pub fn validate_buyer_offer(&self, price: Price, previous_offer: Option<Price>) -> PolicyResult {
        if price.value() > self.buyer_max_price {
            return PolicyResult::deny(
                PolicyViolation::AboveMaximum,
                format!(
                    "offer {} exceeds buyer max ${:.2}",
                    price, self.buyer_max_price
                ),
            );
        }

        if let (true, Some(previous)) = (self.require_progress, previous_offer) {
            if price < previous {
                return PolicyResult::deny(
                    PolicyViolation::PriceDecreased,
                    format!("buyer offer decreased: {} -> {}", previous, price),
                );
            }
        }

        PolicyResult::allow()
    }

    /// Seller counters stay above the minimum and never increase
    pub fn validate_seller_counter(
        &self,
        price: Price,
        previous_counter: Option<Price>,
    ) -> PolicyResult {
        if price.value() < self.seller_min_price {
            return PolicyResult::deny(
                PolicyViolation::BelowMinimum,
                format!(
                    "counter {} below seller min ${:.2}",
                    price, self.seller_min_price
                ),
            );
        }

        if let (true, Some(previous)) = (self.require_progress, previous_counter) {
            if price > previous {
                return PolicyResult::deny(
                    PolicyViolation::PriceIncreased,
                    format!("seller counter increased: {} -> {}", previous, price),
                );
            }
        }

        PolicyResult::allow()
    }

    /// A deal closes only between the seller's minimum and the buyer's maximum
    pub fn validate_acceptance(&self, price: Price) -> PolicyResult {
        if price.value() > self.buyer_max_price {
            return PolicyResult::deny(
                PolicyViolation::AboveMaximum,
                format!(
                    "accepted price {} exceeds buyer max ${:.2}",
                    price, self.buyer_max_price
                ),
            );
        }

        if price.value() < self.seller_min_price {
            return PolicyResult::deny(
                PolicyViolation::BelowMinimum,
                format!(
                    "accepted price {} below seller min ${:.2}",
                    price, self.seller_min_price
                ),
            );
        }

        PolicyResult::allow()
    }

    /// Validate a complete action. The turn check runs first; the first
    /// violation found is returned.
    pub fn validate_action(
        &self,
        actor: Party,
        expected: Party,
        message: &Message,
        previous_offer: Option<Price>,
        previous_counter: Option<Price>,
        is_terminal: bool,
    ) -> PolicyResult {
        let turn = self.validate_turn(actor, expected, is_terminal);
        if !turn.is_allowed() {
            return turn;
        }

        match (actor, message) {
            (Party::Buyer, Message::Offer { price, .. }) => {
                self.validate_buyer_offer(*price, previous_offer)
            }
            (Party::Seller, Message::Counter { price, .. }) => {
                self.validate_seller_counter(*price, previous_counter)
            }
            (_, Message::Accept { price, .. }) => self.validate_acceptance(*price),
            (_, Message::Reject { .. }) => PolicyResult::allow(),
            (Party::Buyer, Message::Counter { .. }) | (Party::Seller, Message::Offer { .. }) => {
                PolicyResult::deny(
                    PolicyViolation::InvalidMessageType,
                    format!("{} cannot send {}", actor, message.kind()),
                )
            }
        }
    }
}
