//! Rule-based buyer

use crate::error::Result;
use crate::orchestration::NegotiationContext;
use crate::protocol::Message;
use crate::types::{round_cents, Party, Price};

use super::Negotiator;

/// Opening offer as a fraction of the budget
const OPENING_FRACTION: f64 = 0.60;

/// Growth of each later offer
const RAISE_FACTOR: f64 = 1.08;

/// Near the end, offers this close to the budget jump to the budget
const FINAL_OFFER_FRACTION: f64 = 0.95;

/// Buyer's move against the seller's current price.
///
/// `turn` is the number of completed rounds; `previous_offer` is the buyer's own
/// last offer, if any.
pub fn buyer_decision(
    current_counter: Price,
    max_budget: Price,
    turn: u32,
    max_turns: u32,
    previous_offer: Option<Price>,
) -> Result<Message> {
    let budget = max_budget.value();

    if current_counter <= max_budget {
        return Message::accept(current_counter.value(), "Accepted seller's price");
    }

    let raw = match previous_offer {
        Some(previous) => previous.value() * RAISE_FACTOR,
        None => budget * OPENING_FRACTION,
    };
    let capped = raw.min(budget);
    // Sub-cent amounts would round to zero; keep them unrounded
    let offer = match round_cents(capped).min(budget) {
        rounded if rounded > 0.0 => rounded,
        _ => capped,
    };

    if turn + 1 >= max_turns && offer >= FINAL_OFFER_FRACTION * budget {
        return Message::offer(budget, "Final offer at maximum budget");
    }

    Message::offer(offer, format!("Offer #{}", turn + 1))
}

/// Buyer driven by [`buyer_decision`]
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBuyer;

impl RuleBuyer {
    pub fn new() -> Self {
        Self
    }
}

impl Negotiator for RuleBuyer {
    fn party(&self) -> Party {
        Party::Buyer
    }

    fn decide(&self, ctx: &NegotiationContext) -> Result<Message> {
        buyer_decision(
            ctx.current_counter(),
            ctx.terms().buyer_max_price(),
            ctx.turn_count(),
            ctx.max_turns(),
            ctx.previous_buyer_offer(),
        )
    }
}
