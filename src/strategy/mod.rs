//! Decision strategies for buyer and seller

pub mod buyer;
pub mod scripted;
pub mod seller;

pub use buyer::{buyer_decision, RuleBuyer};
pub use scripted::ScriptedNegotiator;
pub use seller::{seller_decision, RuleSeller};

use crate::error::Result;
use crate::orchestration::NegotiationContext;
use crate::protocol::Message;
use crate::types::Party;

/// Anything that can take a turn at the table.
///
/// `decide` only reads the context; the orchestrator validates and applies the
/// returned message.
pub trait Negotiator: Send {
    /// Side this negotiator plays
    fn party(&self) -> Party;

    /// Choose the next action
    fn decide(&self, ctx: &NegotiationContext) -> Result<Message>;
}

impl<N: Negotiator + ?Sized> Negotiator for Box<N> {
    fn party(&self) -> Party {
        (**self).party()
    }

    fn decide(&self, ctx: &NegotiationContext) -> Result<Message> {
        (**self).decide(ctx)
    }
}
