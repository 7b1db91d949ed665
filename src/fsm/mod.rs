//! Termination state machine

pub mod state_machine;

pub use state_machine::{FailureReason, NegotiationFsm, NegotiationState, TurnSignal};
