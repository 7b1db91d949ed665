//! Session orchestration: context, router, execution engines and results

pub mod context;
pub mod engine;
pub mod orchestrator;
pub mod result;

pub use context::{LogEntry, NegotiationContext, NegotiationTerms, Outcome};
pub use engine::{Executor, GraphExecutor, NegotiationGraph, SequentialLoop, Target};
pub use orchestrator::{route, Orchestrator, Route};
pub use result::{transcript_digest, NegotiationResult};

use crate::error::Result;
use crate::strategy::{RuleBuyer, RuleSeller};
use crate::trace::NoopSink;
use crate::types::SessionId;
use std::sync::Arc;

/// Run a rule-based buyer against a rule-based seller
pub fn negotiate(terms: NegotiationTerms, executor: &dyn Executor) -> Result<NegotiationResult> {
    let mut orchestrator = Orchestrator::new(
        SessionId::generate(),
        terms,
        Box::new(RuleBuyer::new()),
        Box::new(RuleSeller::new()),
        Arc::new(NoopSink),
    )?;

    executor.execute(&mut orchestrator)?;
    Ok(orchestrator.result())
}
