//! Haggle: bounded buyer/seller price negotiation.
//!
//! Two negotiators trade offers and counter-offers under a coordination
//! policy, while a state machine guarantees every session ends:
//! - `fsm`: termination state machine with a turn bound
//! - `policy`: turn order, concession direction and price limits
//! - `strategy`: rule-based, grounded and scripted negotiators
//! - `orchestration`: the session context, router and execution engines
//! - `grounding`: pricing catalog used to ground the seller's floor
//! - `trace` and `evaluation`: observation and scoring of finished sessions

pub mod cli;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod fsm;
pub mod grounding;
pub mod orchestration;
pub mod policy;
pub mod protocol;
pub mod strategy;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{HaggleError, Result};
pub use fsm::{FailureReason, NegotiationFsm, NegotiationState, TurnSignal};
pub use orchestration::{
    negotiate, GraphExecutor, NegotiationContext, NegotiationResult, NegotiationTerms,
    Orchestrator, Route, SequentialLoop,
};
pub use policy::{CoordinationPolicy, PolicyResult, PolicyViolation};
pub use protocol::{Envelope, Message, MessageKind};
pub use strategy::{Negotiator, RuleBuyer, RuleSeller, ScriptedNegotiator};
pub use types::{Party, Price, SessionId};
