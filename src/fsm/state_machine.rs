//! Negotiation state machine with a termination bound.
//!
//! ```text
//! Idle --start--> Negotiating --accept--> Agreed
//!                      |  ^
//!                      |  | process_turn (turn_count < max_turns)
//!                      |--+
//!                      |--reject / max turns--> Failed
//! ```
//!
//! Agreed and Failed have no outgoing edges. Every call that keeps the machine in
//! Negotiating increments `turn_count`, which is capped by `max_turns`, so every run halts.

use crate::error::{HaggleError, Result};
use crate::types::Price;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The finite set of negotiation states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationState {
    /// Not yet started
    Idle,
    /// Offers are being exchanged
    Negotiating,
    /// Terminal: a deal was reached
    Agreed,
    /// Terminal: no deal
    Failed,
}

impl NegotiationState {
    /// States reachable in one transition
    pub fn reachable(self) -> &'static [NegotiationState] {
        match self {
            NegotiationState::Idle => &[NegotiationState::Negotiating],
            NegotiationState::Negotiating => &[
                NegotiationState::Negotiating,
                NegotiationState::Agreed,
                NegotiationState::Failed,
            ],
            NegotiationState::Agreed | NegotiationState::Failed => &[],
        }
    }

    /// Check if a transition to `target` exists in the table
    pub fn can_transition_to(self, target: NegotiationState) -> bool {
        self.reachable().contains(&target)
    }

    /// Check if negotiation is in a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Agreed | NegotiationState::Failed)
    }

    /// Check if negotiation is active
    pub fn is_active(self) -> bool {
        self == NegotiationState::Negotiating
    }
}

/// Why a negotiation failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    MaxTurnsExceeded,
    RejectedByBuyer,
    RejectedBySeller,
    PolicyViolation,
    InvalidTransition,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::MaxTurnsExceeded => "max turns exceeded",
            FailureReason::RejectedByBuyer => "rejected by buyer",
            FailureReason::RejectedBySeller => "rejected by seller",
            FailureReason::PolicyViolation => "policy violation",
            FailureReason::InvalidTransition => "invalid transition",
        };
        write!(f, "{}", text)
    }
}

/// Result of accounting for one round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnSignal {
    Continue,
    Stop,
}

/// Finite state machine for one negotiation
#[derive(Clone, Debug, PartialEq)]
pub struct NegotiationFsm {
    state: NegotiationState,
    turn_count: u32,
    max_turns: u32,
    agreed_price: Option<Price>,
    failure_reason: Option<FailureReason>,
}

impl NegotiationFsm {
    /// Create a machine in `Idle`
    pub fn new(max_turns: u32) -> Self {
        Self {
            state: NegotiationState::Idle,
            turn_count: 0,
            max_turns,
            agreed_price: None,
            failure_reason: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Completed turns so far
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Turn bound
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Price recorded on agreement
    pub fn agreed_price(&self) -> Option<Price> {
        self.agreed_price
    }

    /// Reason recorded on failure
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.failure_reason
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Idle -> Negotiating
    pub fn start(&mut self) -> Result<()> {
        self.guarded("start", NegotiationState::Idle, |fsm| {
            fsm.state = NegotiationState::Negotiating;
        })
    }

    /// Account for one completed round.
    ///
    /// Returns `Stop` once the bound is reached; the machine is then `Failed`
    /// with `MaxTurnsExceeded`.
    pub fn process_turn(&mut self) -> Result<TurnSignal> {
        self.guarded("process a turn", NegotiationState::Negotiating, |fsm| {
            fsm.turn_count += 1;

            if fsm.turn_count >= fsm.max_turns {
                fsm.state = NegotiationState::Failed;
                fsm.failure_reason = Some(FailureReason::MaxTurnsExceeded);
                TurnSignal::Stop
            } else {
                TurnSignal::Continue
            }
        })
    }

    /// Negotiating -> Agreed
    pub fn transition_to_agreed(&mut self, price: Price) -> Result<()> {
        self.guarded("agree", NegotiationState::Negotiating, |fsm| {
            fsm.state = NegotiationState::Agreed;
            fsm.agreed_price = Some(price);
        })
    }

    /// Negotiating -> Failed
    pub fn transition_to_failed(&mut self, reason: FailureReason) -> Result<()> {
        self.guarded("fail", NegotiationState::Negotiating, |fsm| {
            fsm.state = NegotiationState::Failed;
            fsm.failure_reason = Some(reason);
        })
    }

    /// Run `apply` only when the machine is in `required`; otherwise refuse
    /// without touching any field.
    fn guarded<T>(
        &mut self,
        action: &'static str,
        required: NegotiationState,
        apply: impl FnOnce(&mut Self) -> T,
    ) -> Result<T> {
        if self.state != required {
            self.check_invariants();
            return Err(HaggleError::InvalidStateTransition {
                from: self.state,
                action,
            });
        }

        let from = self.state;
        let turns_before = self.turn_count;

        let out = apply(self);

        assert!(
            from.can_transition_to(self.state),
            "transition {:?} -> {:?} is not in the table",
            from,
            self.state
        );
        assert!(
            self.turn_count >= turns_before,
            "turn count regressed from {} to {}",
            turns_before,
            self.turn_count
        );
        self.check_invariants();

        Ok(out)
    }

    /// Panic if any structural invariant is broken
    pub fn check_invariants(&self) {
        assert!(
            self.turn_count <= self.max_turns.max(1),
            "turn count {} exceeds bound {}",
            self.turn_count,
            self.max_turns
        );

        match self.state {
            NegotiationState::Agreed => {
                assert!(self.agreed_price.is_some(), "Agreed without a price");
                assert!(self.failure_reason.is_none(), "Agreed with a failure reason");
            }
            NegotiationState::Failed => {
                assert!(self.failure_reason.is_some(), "Failed without a reason");
                assert!(self.agreed_price.is_none(), "Failed with an agreed price");
            }
            NegotiationState::Idle | NegotiationState::Negotiating => {
                assert!(
                    self.agreed_price.is_none() && self.failure_reason.is_none(),
                    "non-terminal state carries terminal data"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: f64) -> Price {
        Price::new(value).unwrap()
    }

    #[test]
    fn test_starts_in_idle() {
        let fsm = NegotiationFsm::new(10);
        assert_eq!(fsm.state(), NegotiationState::Idle);
        assert_eq!(fsm.turn_count(), 0);
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut fsm = NegotiationFsm::new(10);
        assert!(fsm.start().is_ok());
        assert_eq!(fsm.state(), NegotiationState::Negotiating);
        assert!(fsm.start().is_err());
    }

    #[test]
    fn test_agree_from_idle_is_refused() {
        let mut fsm = NegotiationFsm::new(10);

        let result = fsm.transition_to_agreed(price(400.0));

        assert!(matches!(
            result,
            Err(HaggleError::InvalidStateTransition {
                from: NegotiationState::Idle,
                ..
            })
        ));
        assert_eq!(fsm.state(), NegotiationState::Idle);
        assert!(fsm.agreed_price().is_none());
    }

    #[test]
    fn test_turns_and_fail_require_start() {
        let mut fsm = NegotiationFsm::new(10);
        assert!(fsm.process_turn().is_err());
        assert!(fsm.transition_to_failed(FailureReason::RejectedByBuyer).is_err());
        assert_eq!(fsm, NegotiationFsm::new(10));
    }

    #[test]
    fn test_accept_moves_to_agreed() {
        let mut fsm = NegotiationFsm::new(10);
        fsm.start().unwrap();
        fsm.transition_to_agreed(price(400.0)).unwrap();

        assert_eq!(fsm.state(), NegotiationState::Agreed);
        assert!(fsm.is_terminal());
        assert_eq!(fsm.agreed_price(), Some(price(400.0)));
    }

    #[test]
    fn test_reject_moves_to_failed() {
        let mut fsm = NegotiationFsm::new(10);
        fsm.start().unwrap();
        fsm.transition_to_failed(FailureReason::RejectedBySeller)
            .unwrap();

        assert_eq!(fsm.state(), NegotiationState::Failed);
        assert_eq!(fsm.failure_reason(), Some(FailureReason::RejectedBySeller));
    }

    #[test]
    fn test_max_turns_terminates() {
        let mut fsm = NegotiationFsm::new(3);
        fsm.start().unwrap();

        assert_eq!(fsm.process_turn().unwrap(), TurnSignal::Continue);
        assert_eq!(fsm.process_turn().unwrap(), TurnSignal::Continue);
        assert_eq!(fsm.process_turn().unwrap(), TurnSignal::Stop);

        assert_eq!(fsm.state(), NegotiationState::Failed);
        assert_eq!(fsm.failure_reason(), Some(FailureReason::MaxTurnsExceeded));
        assert_eq!(fsm.turn_count(), 3);
    }

    #[test]
    fn test_single_turn_bound() {
        let mut fsm = NegotiationFsm::new(1);
        fsm.start().unwrap();
        assert_eq!(fsm.process_turn().unwrap(), TurnSignal::Stop);
        assert!(fsm.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        assert!(NegotiationState::Agreed.reachable().is_empty());
        assert!(NegotiationState::Failed.reachable().is_empty());
        assert!(!NegotiationState::Idle.can_transition_to(NegotiationState::Agreed));
    }

    #[test]
    fn test_terminal_state_is_idempotent() {
        let mut fsm = NegotiationFsm::new(10);
        fsm.start().unwrap();
        fsm.transition_to_agreed(price(400.0)).unwrap();
        let frozen = fsm.clone();

        // Every further call fails and changes nothing
        assert!(fsm.process_turn().is_err());
        assert!(fsm.transition_to_agreed(price(500.0)).is_err());
        assert!(fsm.transition_to_failed(FailureReason::RejectedByBuyer).is_err());
        assert!(fsm.start().is_err());

        assert_eq!(fsm, frozen);
        assert_eq!(fsm.agreed_price(), Some(price(400.0)));
    }

    #[test]
    fn test_invariants_hold_through_a_run() {
        let mut fsm = NegotiationFsm::new(5);
        fsm.check_invariants();
        fsm.start().unwrap();

        let mut last = fsm.turn_count();
        while fsm.process_turn().unwrap() == TurnSignal::Continue {
            assert!(fsm.turn_count() > last);
            last = fsm.turn_count();
            fsm.check_invariants();
        }
        fsm.check_invariants();
        assert_eq!(fsm.turn_count(), 5);
    }
}
