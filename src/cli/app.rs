//! Negotiation runtime wiring config, catalog, negotiators and engines together

use crate::config::Config;
use crate::error::{HaggleError, Result};
use crate::grounding::{Deadline, Grounding, PricingCatalog};
use crate::orchestration::{Executor, NegotiationResult, NegotiationTerms, Orchestrator};
use crate::protocol::Envelope;
use crate::strategy::{RuleBuyer, RuleSeller};
use crate::trace::TraceSink;
use crate::types::{Party, SessionId};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

use super::commands::EngineKind;

/// Range the batch draws buyer budgets from
const BATCH_BUDGET_RANGE: std::ops::Range<f64> = 300.0..500.0;

/// One finished session
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub terms: NegotiationTerms,
    pub result: NegotiationResult,
    pub envelopes: Vec<Envelope>,
}

/// Aggregate of a batch run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchSummary {
    pub sessions: usize,
    pub agreements: usize,
    pub success_rate: f64,
    pub average_price: Option<f64>,
    pub average_turns: f64,
}

impl BatchSummary {
    fn from_results(results: &[NegotiationResult]) -> Self {
        let sessions = results.len();
        let prices: Vec<f64> = results.iter().filter_map(|r| r.final_price).collect();
        let agreements = prices.len();

        let average_turns = if sessions == 0 {
            0.0
        } else {
            results.iter().map(|r| r.turns_taken as f64).sum::<f64>() / sessions as f64
        };

        Self {
            sessions,
            agreements,
            success_rate: if sessions == 0 {
                0.0
            } else {
                agreements as f64 / sessions as f64
            },
            average_price: (agreements > 0).then(|| prices.iter().sum::<f64>() / agreements as f64),
            average_turns,
        }
    }
}

/// Shared runtime for demo and batch runs
#[derive(Clone)]
pub struct NegotiationRuntime {
    config: Config,
    catalog: Arc<PricingCatalog>,
}

impl NegotiationRuntime {
    /// Runtime over the default pricing catalog
    pub fn new(config: Config) -> Self {
        Self::with_catalog(config, Arc::new(PricingCatalog::default()))
    }

    pub fn with_catalog(config: Config, catalog: Arc<PricingCatalog>) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    /// Grounding for the configured segment, bounded by the lookup timeout
    fn grounding(&self) -> Option<Grounding> {
        let segment = self.config.pricing.segment.as_ref()?;
        let bounded = Deadline::from_arc(Arc::clone(&self.catalog), self.config.grounding_timeout());

        Some(Grounding::new(
            Arc::new(bounded),
            self.config.pricing.product_id.clone(),
            segment.clone(),
        ))
    }

    /// Session terms with the grounded floor resolved once; the policy and
    /// the seller both read it from the terms
    pub fn resolve_terms(&self, terms: NegotiationTerms) -> NegotiationTerms {
        match self.grounding() {
            Some(grounding) => {
                let floor = grounding.effective_min_or(terms.seller_min_price());
                tracing::info!(
                    product = grounding.product_id(),
                    segment = grounding.segment(),
                    "Seller floor grounded at {}",
                    floor
                );
                terms.with_seller_min_price(floor)
            }
            None => terms,
        }
    }

    /// Run one rule-based session to completion
    pub fn run_session(
        &self,
        terms: NegotiationTerms,
        executor: &dyn Executor,
        sink: Arc<dyn TraceSink>,
    ) -> Result<SessionReport> {
        let terms = self.resolve_terms(terms);

        let mut orchestrator = Orchestrator::new(
            SessionId::generate(),
            terms,
            Box::new(RuleBuyer::new()),
            Box::new(RuleSeller::new()),
            sink,
        )?;

        tracing::debug!(
            session = %orchestrator.session_id(),
            engine = executor.name(),
            "Running session"
        );
        executor.execute(&mut orchestrator)?;

        let result = orchestrator.result();
        self.record(&result);

        Ok(SessionReport {
            terms,
            result,
            envelopes: orchestrator.envelopes(),
        })
    }

    /// Run the configured session
    pub fn run_demo(&self, engine: EngineKind, sink: Arc<dyn TraceSink>) -> Result<SessionReport> {
        let terms = self.config.terms()?;
        self.run_session(terms, engine.executor().as_ref(), sink)
    }

    /// Run `count` independent sessions in parallel with buyer budgets drawn
    /// from a seeded generator
    pub async fn run_batch(
        &self,
        count: usize,
        seed: u64,
        engine: EngineKind,
    ) -> Result<BatchSummary> {
        let base = self.config.terms()?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            let budget = (rng.gen_range(BATCH_BUDGET_RANGE) * 100.0).round() / 100.0;
            let terms = NegotiationTerms::new(
                budget,
                base.seller_min_price().value(),
                base.seller_asking_price().value(),
                base.max_turns(),
            )?;

            let runtime = self.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let executor = engine.executor();
                runtime.run_session(terms, executor.as_ref(), Arc::new(crate::trace::NoopSink))
            }));
        }

        let mut results = Vec::with_capacity(count);
        for joined in join_all(handles).await {
            let report = joined.map_err(|e| HaggleError::Internal(format!("batch task failed: {e}")))??;
            results.push(report.result);
        }

        let summary = BatchSummary::from_results(&results);
        tracing::info!(
            sessions = summary.sessions,
            agreements = summary.agreements,
            "Batch finished: {:.0}% agreed, average {:.1} turns",
            summary.success_rate * 100.0,
            summary.average_turns
        );

        Ok(summary)
    }

    fn record(&self, result: &NegotiationResult) {
        let product = &self.config.pricing.product_id;
        let segment = self
            .config
            .pricing
            .segment
            .as_deref()
            .unwrap_or(crate::grounding::DEFAULT_SEGMENT);

        let approval = result
            .final_price
            .and_then(|price| self.catalog.check_approval(product, price));
        if let Some(approval) = approval {
            if approval.requires_approval {
                tracing::warn!(
                    session = %result.session_id,
                    "Agreed price ${:.2} needs approval (threshold ${:.2})",
                    approval.proposed_price,
                    approval.threshold
                );
            }
        }

        self.catalog.record_outcome(
            product,
            segment,
            result.opening_offer(),
            result.final_price,
            result.turns_taken,
        );
    }
}

/// Transcript lines for terminal output
pub fn format_transcript(result: &NegotiationResult) -> Vec<String> {
    result
        .messages
        .iter()
        .map(|entry| {
            let who = match entry.actor {
                Party::Buyer => "BUYER ",
                Party::Seller => "SELLER",
            };
            format!("[turn {:>2}] {} {}", entry.turn, who, entry.action)
        })
        .collect()
}
