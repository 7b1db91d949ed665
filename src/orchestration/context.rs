//! Negotiation terms and the per-session context owned by the orchestrator

use crate::error::{HaggleError, Result};
use crate::fsm::{FailureReason, NegotiationFsm, NegotiationState, TurnSignal};
use crate::protocol::Message;
use crate::types::{Party, Price};
use serde::{Deserialize, Serialize};

/// Fixed inputs of one negotiation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiationTerms {
    buyer_max_price: Price,
    seller_min_price: Price,
    seller_asking_price: Price,
    max_turns: u32,
}

impl NegotiationTerms {
    /// Validate raw terms. The asking price is expected to sit above the
    /// seller's minimum but that is not enforced here.
    pub fn new(
        buyer_max_price: f64,
        seller_min_price: f64,
        seller_asking_price: f64,
        max_turns: u32,
    ) -> Result<Self> {
        if max_turns == 0 {
            return Err(HaggleError::InvalidConfig(
                "max_turns must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            buyer_max_price: Price::new(buyer_max_price)?,
            seller_min_price: Price::new(seller_min_price)?,
            seller_asking_price: Price::new(seller_asking_price)?,
            max_turns,
        })
    }

    pub fn buyer_max_price(&self) -> Price {
        self.buyer_max_price
    }

    pub fn seller_min_price(&self) -> Price {
        self.seller_min_price
    }

    pub fn seller_asking_price(&self) -> Price {
        self.seller_asking_price
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Same terms with a different seller floor
    pub fn with_seller_min_price(mut self, seller_min_price: Price) -> Self {
        self.seller_min_price = seller_min_price;
        self
    }

    /// Whether a zone of possible agreement exists
    pub fn has_zopa(&self) -> bool {
        self.seller_min_price <= self.buyer_max_price
    }
}

/// One recorded action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    pub actor: Party,
    pub action: Message,
}

/// Where the negotiation stands
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Pending,
    Agreed { price: Price },
    Failed { reason: FailureReason, detail: String },
}

impl Outcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }
}

/// Mutable state of one session.
///
/// Only the orchestrator mutates it; strategies and the policy get `&NegotiationContext`.
/// The outcome is read straight from the state machine, so it is non-pending exactly
/// when the machine is terminal.
#[derive(Clone, Debug)]
pub struct NegotiationContext {
    terms: NegotiationTerms,
    fsm: NegotiationFsm,
    previous_buyer_offer: Option<Price>,
    previous_seller_counter: Option<Price>,
    active_party: Party,
    message_log: Vec<LogEntry>,
    failure_detail: Option<String>,
}

impl NegotiationContext {
    /// Fresh context; the buyer moves first
    pub fn new(terms: NegotiationTerms) -> Self {
        Self {
            terms,
            fsm: NegotiationFsm::new(terms.max_turns()),
            previous_buyer_offer: None,
            previous_seller_counter: None,
            active_party: Party::Buyer,
            message_log: Vec::new(),
            failure_detail: None,
        }
    }

    pub fn terms(&self) -> &NegotiationTerms {
        &self.terms
    }

    pub fn state(&self) -> NegotiationState {
        self.fsm.state()
    }

    pub fn turn_count(&self) -> u32 {
        self.fsm.turn_count()
    }

    pub fn max_turns(&self) -> u32 {
        self.terms.max_turns()
    }

    pub fn is_terminal(&self) -> bool {
        self.fsm.is_terminal()
    }

    pub fn active_party(&self) -> Party {
        self.active_party
    }

    pub fn previous_buyer_offer(&self) -> Option<Price> {
        self.previous_buyer_offer
    }

    pub fn previous_seller_counter(&self) -> Option<Price> {
        self.previous_seller_counter
    }

    /// Price the buyer is answering: the last counter, or the asking price
    /// before the seller has spoken
    pub fn current_counter(&self) -> Price {
        self.previous_seller_counter
            .unwrap_or(self.terms.seller_asking_price)
    }

    pub fn messages(&self) -> &[LogEntry] {
        &self.message_log
    }

    pub fn outcome(&self) -> Outcome {
        match (
            self.fsm.state(),
            self.fsm.agreed_price(),
            self.fsm.failure_reason(),
        ) {
            (NegotiationState::Agreed, Some(price), _) => Outcome::Agreed { price },
            (NegotiationState::Failed, _, Some(reason)) => Outcome::Failed {
                reason,
                detail: self
                    .failure_detail
                    .clone()
                    .unwrap_or_else(|| reason.to_string()),
            },
            _ => Outcome::Pending,
        }
    }

    pub(crate) fn start(&mut self) -> Result<()> {
        self.fsm.start()
    }

    pub(crate) fn append(&mut self, entry: LogEntry) {
        self.message_log.push(entry);
    }

    /// Buyer offered: remember the price and hand the turn to the seller
    pub(crate) fn record_offer(&mut self, price: Price) -> Result<()> {
        if !self.fsm.is_active() {
            return Err(HaggleError::InvalidStateTransition {
                from: self.fsm.state(),
                action: "record an offer",
            });
        }

        self.previous_buyer_offer = Some(price);
        self.active_party = Party::Seller;
        Ok(())
    }

    /// Seller countered: this closes a round, so the turn is counted here
    pub(crate) fn record_counter(&mut self, price: Price) -> Result<TurnSignal> {
        let signal = self.fsm.process_turn()?;

        self.previous_seller_counter = Some(price);
        self.active_party = Party::Buyer;

        if signal == TurnSignal::Stop {
            self.failure_detail = Some(format!(
                "no agreement after {} turns",
                self.terms.max_turns()
            ));
        }

        Ok(signal)
    }

    pub(crate) fn agree(&mut self, price: Price) -> Result<()> {
        self.fsm.transition_to_agreed(price)
    }

    pub(crate) fn fail(&mut self, reason: FailureReason, detail: impl Into<String>) -> Result<()> {
        self.fsm.transition_to_failed(reason)?;
        self.failure_detail = Some(detail.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> NegotiationTerms {
        NegotiationTerms::new(450.0, 350.0, 500.0, 10).unwrap()
    }

    #[test]
    fn test_terms_validation() {
        assert!(NegotiationTerms::new(450.0, 350.0, 500.0, 0).is_err());
        assert!(NegotiationTerms::new(-1.0, 350.0, 500.0, 10).is_err());
        assert!(terms().has_zopa());
        assert!(!NegotiationTerms::new(200.0, 500.0, 600.0, 10)
            .unwrap()
            .has_zopa());
    }

    #[test]
    fn test_fresh_context() {
        let ctx = NegotiationContext::new(terms());

        assert_eq!(ctx.active_party(), Party::Buyer);
        assert_eq!(ctx.turn_count(), 0);
        assert_eq!(ctx.current_counter().value(), 500.0);
        assert!(ctx.outcome().is_pending());
        assert_eq!(ctx.state(), NegotiationState::Idle);
    }

    #[test]
    fn test_round_accounting() {
        let mut ctx = NegotiationContext::new(terms());
        ctx.start().unwrap();

        ctx.record_offer(Price::new(270.0).unwrap()).unwrap();
        assert_eq!(ctx.active_party(), Party::Seller);
        // An offer alone does not close a round
        assert_eq!(ctx.turn_count(), 0);

        ctx.record_counter(Price::new(490.0).unwrap()).unwrap();
        assert_eq!(ctx.active_party(), Party::Buyer);
        assert_eq!(ctx.turn_count(), 1);
        assert_eq!(ctx.current_counter().value(), 490.0);
    }

    #[test]
    fn test_outcome_follows_state_machine() {
        let mut ctx = NegotiationContext::new(terms());
        ctx.start().unwrap();
        ctx.fail(FailureReason::RejectedBySeller, "too low").unwrap();

        assert_eq!(
            ctx.outcome(),
            Outcome::Failed {
                reason: FailureReason::RejectedBySeller,
                detail: "too low".to_string(),
            }
        );

        // Terminal context refuses further updates
        assert!(ctx.record_offer(Price::new(300.0).unwrap()).is_err());
        assert!(ctx.previous_buyer_offer().is_none());
    }

    #[test]
    fn test_max_turns_detail() {
        let terms = NegotiationTerms::new(450.0, 350.0, 500.0, 1).unwrap();
        let mut ctx = NegotiationContext::new(terms);
        ctx.start().unwrap();

        let signal = ctx.record_counter(Price::new(480.0).unwrap()).unwrap();

        assert_eq!(signal, TurnSignal::Stop);
        match ctx.outcome() {
            Outcome::Failed { reason, detail } => {
                assert_eq!(reason, FailureReason::MaxTurnsExceeded);
                assert_eq!(detail, "no agreement after 1 turns");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
