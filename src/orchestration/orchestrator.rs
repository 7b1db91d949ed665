//! Session orchestrator: the only writer of a [`NegotiationContext`]

use crate::error::{HaggleError, Result};
use crate::fsm::FailureReason;
use crate::policy::{CoordinationPolicy, PolicyResult, PolicyViolation};
use crate::protocol::{Envelope, Message};
use crate::strategy::Negotiator;
use crate::trace::{TraceEvent, TraceSink};
use crate::types::{Party, SessionId};
use std::fmt;
use std::sync::Arc;

use super::context::{LogEntry, NegotiationContext, NegotiationTerms, Outcome};
use super::result::NegotiationResult;

/// Where control goes next
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Buyer,
    Seller,
    End,
}

impl From<Party> for Route {
    fn from(party: Party) -> Self {
        match party {
            Party::Buyer => Route::Buyer,
            Party::Seller => Route::Seller,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Buyer => write!(f, "buyer"),
            Route::Seller => write!(f, "seller"),
            Route::End => write!(f, "end"),
        }
    }
}

/// Decide who moves next, or whether the session is over
pub fn route(ctx: &NegotiationContext) -> Route {
    if !ctx.outcome().is_pending() || ctx.turn_count() >= ctx.max_turns() {
        return Route::End;
    }

    Route::from(ctx.active_party())
}

/// Drives one negotiation session
pub struct Orchestrator {
    session_id: SessionId,
    ctx: NegotiationContext,
    policy: CoordinationPolicy,
    buyer: Box<dyn Negotiator>,
    seller: Box<dyn Negotiator>,
    sink: Arc<dyn TraceSink>,
    outcome_reported: bool,
}

impl Orchestrator {
    /// Start a session. `buyer` and `seller` must play the sides they are given for.
    pub fn new(
        session_id: SessionId,
        terms: NegotiationTerms,
        buyer: Box<dyn Negotiator>,
        seller: Box<dyn Negotiator>,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self> {
        if buyer.party() != Party::Buyer || seller.party() != Party::Seller {
            return Err(HaggleError::InvalidConfig(format!(
                "negotiators play {} and {}, expected buyer and seller",
                buyer.party(),
                seller.party()
            )));
        }

        let mut ctx = NegotiationContext::new(terms);
        ctx.start()?;

        sink.record(&TraceEvent::SessionStarted {
            session_id: session_id.clone(),
            buyer_max_price: terms.buyer_max_price(),
            seller_min_price: terms.seller_min_price(),
            seller_asking_price: terms.seller_asking_price(),
            max_turns: terms.max_turns(),
        });

        Ok(Self {
            session_id,
            ctx,
            policy: CoordinationPolicy::new(terms.buyer_max_price(), terms.seller_min_price()),
            buyer,
            seller,
            sink,
            outcome_reported: false,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn context(&self) -> &NegotiationContext {
        &self.ctx
    }

    pub fn policy(&self) -> &CoordinationPolicy {
        &self.policy
    }

    /// Validate and apply one action.
    ///
    /// On a violation the context is left exactly as it was and the policy
    /// result is returned.
    pub fn apply(&mut self, actor: Party, message: Message) -> std::result::Result<Route, PolicyResult> {
        let verdict = self.policy.validate_action(
            actor,
            self.ctx.active_party(),
            &message,
            self.ctx.previous_buyer_offer(),
            self.ctx.previous_seller_counter(),
            self.ctx.is_terminal(),
        );

        if !verdict.is_allowed() {
            if let Some(violation) = verdict.violation {
                self.sink.record(&TraceEvent::Violation {
                    session_id: self.session_id.clone(),
                    turn: self.ctx.turn_count(),
                    actor,
                    violation,
                    reason: verdict.reason.clone(),
                });
            }
            return Err(verdict);
        }

        let turn = self.ctx.turn_count();

        let applied = match &message {
            Message::Offer { price, .. } => self.ctx.record_offer(*price),
            Message::Counter { price, .. } => self.ctx.record_counter(*price).map(|_| ()),
            Message::Accept { price, .. } => self.ctx.agree(*price),
            Message::Reject { reason, .. } => {
                let failure = match actor {
                    Party::Buyer => FailureReason::RejectedByBuyer,
                    Party::Seller => FailureReason::RejectedBySeller,
                };
                self.ctx.fail(failure, reason.clone())
            }
        };

        // The policy already ruled out terminal sessions and wrong roles
        if let Err(e) = applied {
            return Err(PolicyResult::deny(
                PolicyViolation::NegotiationEnded,
                e.to_string(),
            ));
        }

        tracing::debug!(
            session = %self.session_id,
            turn,
            "{} -> {}",
            actor,
            message
        );

        self.sink.record(&TraceEvent::Turn {
            session_id: self.session_id.clone(),
            turn,
            actor,
            action: message.clone(),
        });
        self.ctx.append(LogEntry {
            turn,
            actor,
            action: message,
        });

        self.report_outcome();
        Ok(route(&self.ctx))
    }

    /// Let `actor` take its turn.
    ///
    /// Both execution engines advance a session only through this method. A
    /// terminal session is left alone.
    pub fn step(&mut self, actor: Party) -> Route {
        if self.ctx.is_terminal() {
            return Route::End;
        }

        let negotiator = match actor {
            Party::Buyer => &self.buyer,
            Party::Seller => &self.seller,
        };

        let message = match negotiator.decide(&self.ctx) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(session = %self.session_id, "{} strategy failed: {}", actor, e);
                self.abort(
                    FailureReason::InvalidTransition,
                    format!("{} strategy failed: {}", actor, e),
                );
                return Route::End;
            }
        };

        match self.apply(actor, message) {
            Ok(next) => next,
            Err(verdict) => {
                tracing::warn!(
                    session = %self.session_id,
                    "Aborting after policy violation by {}: {}",
                    actor,
                    verdict.reason
                );
                self.abort(FailureReason::PolicyViolation, verdict.reason);
                Route::End
            }
        }
    }

    /// End the session as failed, if it is still running
    pub fn abort(&mut self, reason: FailureReason, detail: impl Into<String>) {
        if self.ctx.is_terminal() {
            return;
        }

        if let Err(e) = self.ctx.fail(reason, detail) {
            tracing::error!(session = %self.session_id, "Could not fail session: {}", e);
        }
        self.report_outcome();
    }

    /// Snapshot of the session as a result
    pub fn result(&self) -> NegotiationResult {
        NegotiationResult::from_context(self.session_id.clone(), &self.ctx)
    }

    /// The log as wire envelopes
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.ctx
            .messages()
            .iter()
            .map(|entry| Envelope::new(entry.actor, self.session_id.clone(), entry.action.clone()))
            .collect()
    }

    fn report_outcome(&mut self) {
        if self.outcome_reported || !self.ctx.is_terminal() {
            return;
        }
        self.outcome_reported = true;

        let final_price = match self.ctx.outcome() {
            Outcome::Agreed { price } => Some(price),
            _ => None,
        };
        let result = self.result();

        self.sink.record(&TraceEvent::Outcome {
            session_id: self.session_id.clone(),
            agreed: result.agreed,
            final_price,
            failure_reason: result.failure_reason,
            turns_taken: result.turns_taken,
        });
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session_id", &self.session_id)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
