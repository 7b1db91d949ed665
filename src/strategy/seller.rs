//! Rule-based seller, optionally grounded in a pricing catalog

use crate::error::{HaggleError, Result};
use crate::grounding::Grounding;
use crate::orchestration::NegotiationContext;
use crate::protocol::Message;
use crate::types::{round_cents, Party, Price};

use super::Negotiator;

/// Opening counter as a fraction of the asking price
const OPENING_FRACTION: f64 = 0.98;

/// Share of the gap to the buyer's offer conceded per round
const CONCESSION_RATE: f64 = 0.30;

/// Near the end, offers below this fraction of the floor are refused
const WALK_AWAY_FRACTION: f64 = 0.80;

/// Seller's move against the buyer's latest offer.
///
/// `effective_min` is the floor after grounding; `previous_counter` is the
/// seller's own last counter, if any.
pub fn seller_decision(
    buyer_offer: Price,
    effective_min: Price,
    asking_price: Price,
    turn: u32,
    max_turns: u32,
    previous_counter: Option<Price>,
) -> Result<Message> {
    let floor = effective_min.value();
    let offer = buyer_offer.value();

    if buyer_offer >= effective_min {
        return Message::accept(offer, "Offer meets our minimum");
    }

    let raw = match previous_counter {
        Some(previous) => previous.value() - CONCESSION_RATE * (previous.value() - offer),
        None => asking_price.value() * OPENING_FRACTION,
    };
    let counter = round_cents(raw.max(floor)).max(floor);

    if turn + 2 >= max_turns && offer < WALK_AWAY_FRACTION * floor {
        return Message::reject("offer too far below acceptable range", None);
    }

    Message::counter(counter, offer, format!("Counter #{}", turn + 1))
}

/// Seller driven by [`seller_decision`]
#[derive(Clone, Debug, Default)]
pub struct RuleSeller {
    grounding: Option<Grounding>,
}

impl RuleSeller {
    pub fn new() -> Self {
        Self { grounding: None }
    }

    /// Seller whose floor comes from a grounded provider
    pub fn grounded(grounding: Grounding) -> Self {
        Self {
            grounding: Some(grounding),
        }
    }

    /// Floor for this session; falls back to the configured minimum
    pub fn effective_min(&self, configured: Price) -> Price {
        match &self.grounding {
            Some(grounding) => grounding.effective_min_or(configured),
            None => configured,
        }
    }
}

impl Negotiator for RuleSeller {
    fn party(&self) -> Party {
        Party::Seller
    }

    fn decide(&self, ctx: &NegotiationContext) -> Result<Message> {
        let buyer_offer = ctx.previous_buyer_offer().ok_or_else(|| {
            HaggleError::Strategy("seller asked to move before any buyer offer".to_string())
        })?;

        seller_decision(
            buyer_offer,
            self.effective_min(ctx.terms().seller_min_price()),
            ctx.terms().seller_asking_price(),
            ctx.turn_count(),
            ctx.max_turns(),
            ctx.previous_seller_counter(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grounding::{GroundedContext, PricingCatalog, DEFAULT_PRODUCT};
    use crate::orchestration::NegotiationTerms;
    use std::sync::Arc;

    fn price(value: f64) -> Price {
        Price::new(value).unwrap()
    }

    #[test]
    fn test_accepts_offer_at_floor() {
        let msg = seller_decision(price(350.0), price(350.0), price(500.0), 2, 10, None).unwrap();
        assert!(matches!(msg, Message::Accept { .. }));
        assert_eq!(msg.price(), Some(price(350.0)));
    }

    #[test]
    fn test_opening_counter() {
        let msg = seller_decision(price(270.0), price(350.0), price(500.0), 0, 10, None).unwrap();
        assert_eq!(msg, Message::counter(490.0, 270.0, "Counter #1").unwrap());
    }

    #[test]
    fn test_concedes_thirty_percent_of_gap() {
        let msg = seller_decision(
            price(226.8),
            price(350.0),
            price(400.0),
            1,
            10,
            Some(price(392.0)),
        )
        .unwrap();
        // 392 - 0.3 * 165.2 = 342.44, clamped to the floor
        assert_eq!(msg.price(), Some(price(350.0)));

        let msg = seller_decision(
            price(300.0),
            price(350.0),
            price(500.0),
            1,
            10,
            Some(price(490.0)),
        )
        .unwrap();
        assert_eq!(msg.price(), Some(price(433.0)));
    }

    #[test]
    fn test_walks_away_near_the_end() {
        let msg = seller_decision(price(190.0), price(500.0), price(600.0), 8, 10, Some(price(510.0)))
            .unwrap();
        assert_eq!(
            msg,
            Message::reject("offer too far below acceptable range", None).unwrap()
        );

        // Same offer earlier on is countered
        let msg = seller_decision(price(190.0), price(500.0), price(600.0), 7, 10, Some(price(510.0)))
            .unwrap();
        assert!(matches!(msg, Message::Counter { .. }));
    }

    #[test]
    fn test_seller_needs_an_offer() {
        let ctx = NegotiationContext::new(NegotiationTerms::new(450.0, 350.0, 500.0, 10).unwrap());
        let result = RuleSeller::new().decide(&ctx);
        assert!(matches!(result, Err(HaggleError::Strategy(_))));
    }

    #[test]
    fn test_grounded_floor() {
        let grounding = Grounding::new(Arc::new(PricingCatalog::default()), DEFAULT_PRODUCT, "startup");
        let seller = RuleSeller::grounded(grounding);
        assert_eq!(seller.effective_min(price(350.0)), price(315.0));
        assert_eq!(RuleSeller::new().effective_min(price(350.0)), price(350.0));
    }

    struct Zeroish;

    impl GroundedContext for Zeroish {
        fn effective_minimum(&self, _: &str, _: &str) -> Result<Price> {
            Price::new(0.0)
        }
    }

    #[test]
    fn test_invalid_grounded_value_falls_back() {
        let seller = RuleSeller::grounded(Grounding::new(Arc::new(Zeroish), DEFAULT_PRODUCT, "standard"));
        assert_eq!(seller.effective_min(price(350.0)), price(350.0));
    }
}
