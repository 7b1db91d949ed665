//! Deterministic, rule-based judge for finished negotiations

use crate::orchestration::{LogEntry, NegotiationResult, NegotiationTerms};
use crate::policy::CoordinationPolicy;
use crate::protocol::Message;
use crate::types::{Party, Price};
use serde::Serialize;
use std::fmt;

/// What a judgment is about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Criteria {
    OutcomeFair,
    ProtocolFollowed,
    TurnsEfficient,
    PolicyCompliant,
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criteria::OutcomeFair => "OUTCOME_FAIR",
            Criteria::ProtocolFollowed => "PROTOCOL_FOLLOWED",
            Criteria::TurnsEfficient => "TURNS_EFFICIENT",
            Criteria::PolicyCompliant => "POLICY_COMPLIANT",
        };
        write!(f, "{}", name)
    }
}

/// Assessment on one criterion; `score` is in [0, 1]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Judgment {
    pub criteria: Criteria,
    pub passed: bool,
    pub score: f64,
    pub explanation: String,
}

impl Judgment {
    fn new(criteria: Criteria, passed: bool, score: f64, explanation: impl Into<String>) -> Self {
        Self {
            criteria,
            passed,
            score,
            explanation: explanation.into(),
        }
    }
}

/// Scores a result against its terms. Read-only; same input, same output.
#[derive(Clone, Debug)]
pub struct NegotiationJudge {
    max_acceptable_turns: u32,
    fairness_threshold: f64,
}

impl Default for NegotiationJudge {
    fn default() -> Self {
        Self::new(10, 0.3)
    }
}

impl NegotiationJudge {
    /// `fairness_threshold` 0.3 accepts any surplus split between 30/70 and 70/30
    pub fn new(max_acceptable_turns: u32, fairness_threshold: f64) -> Self {
        Self {
            max_acceptable_turns: max_acceptable_turns.max(1),
            fairness_threshold,
        }
    }

    /// How evenly the surplus between the two limits was split
    pub fn judge_fairness(&self, final_price: Option<f64>, buyer_max: f64, seller_min: f64) -> Judgment {
        let price = match final_price {
            Some(price) => price,
            None => return Judgment::new(Criteria::OutcomeFair, false, 0.0, "No agreement reached"),
        };

        if price < seller_min || price > buyer_max {
            return Judgment::new(
                Criteria::OutcomeFair,
                false,
                0.0,
                format!(
                    "Price ${:.2} outside valid range [${:.2}, ${:.2}]",
                    price, seller_min, buyer_max
                ),
            );
        }

        let range = buyer_max - seller_min;
        if range <= 0.0 {
            return Judgment::new(
                Criteria::OutcomeFair,
                true,
                1.0,
                "No negotiation range (price fixed)",
            );
        }

        // 0 = buyer took the whole surplus, 1 = seller did
        let seller_share = (price - seller_min) / range;
        let score = 1.0 - (seller_share - 0.5).abs() * 2.0;
        let passed = self.fairness_threshold <= seller_share
            && seller_share <= 1.0 - self.fairness_threshold;

        Judgment::new(
            Criteria::OutcomeFair,
            passed,
            score,
            format!("Seller got {:.0}% of surplus", seller_share * 100.0),
        )
    }

    /// Fewer turns score higher; failures score zero
    pub fn judge_efficiency(&self, turns: u32, success: bool) -> Judgment {
        if !success {
            return Judgment::new(
                Criteria::TurnsEfficient,
                false,
                0.0,
                format!("Failed after {} turns", turns),
            );
        }

        let score = (1.0 - turns as f64 / self.max_acceptable_turns as f64).max(0.0);
        Judgment::new(
            Criteria::TurnsEfficient,
            turns <= self.max_acceptable_turns / 2,
            score,
            format!("Completed in {}/{} turns", turns, self.max_acceptable_turns),
        )
    }

    /// Buyer opens and the parties strictly alternate
    pub fn judge_protocol(&self, messages: &[LogEntry]) -> Judgment {
        let mut expected = Party::Buyer;
        let mut issues = Vec::new();

        for (i, entry) in messages.iter().enumerate() {
            if entry.actor != expected {
                issues.push(format!("Turn {}: expected {}, got {}", i, expected, entry.actor));
            }
            expected = expected.counterparty();
        }

        match issues.first() {
            None => Judgment::new(
                Criteria::ProtocolFollowed,
                true,
                1.0,
                "All messages followed protocol",
            ),
            Some(first) => Judgment::new(
                Criteria::ProtocolFollowed,
                false,
                1.0 - issues.len() as f64 / messages.len().max(1) as f64,
                format!("Protocol violations: {}...", first),
            ),
        }
    }

    /// Replay the log through a fresh policy
    pub fn judge_policy(&self, messages: &[LogEntry], terms: &NegotiationTerms) -> Judgment {
        let policy = CoordinationPolicy::new(terms.buyer_max_price(), terms.seller_min_price());
        let mut previous_offer: Option<Price> = None;
        let mut previous_counter: Option<Price> = None;
        let mut ended = false;
        let mut issues = Vec::new();

        for (i, entry) in messages.iter().enumerate() {
            // Alternation is judged separately, so the actor is its own expected party here
            let verdict = policy.validate_action(
                entry.actor,
                entry.actor,
                &entry.action,
                previous_offer,
                previous_counter,
                ended,
            );
            if !verdict.is_allowed() {
                issues.push(format!("Message {}: {}", i, verdict.reason));
            }

            match &entry.action {
                Message::Offer { price, .. } => previous_offer = Some(*price),
                Message::Counter { price, .. } => previous_counter = Some(*price),
                Message::Accept { .. } | Message::Reject { .. } => ended = true,
            }
        }

        match issues.first() {
            None => Judgment::new(
                Criteria::PolicyCompliant,
                true,
                1.0,
                "All actions within policy",
            ),
            Some(first) => Judgment::new(
                Criteria::PolicyCompliant,
                false,
                1.0 - issues.len() as f64 / messages.len().max(1) as f64,
                format!("Policy violations: {}...", first),
            ),
        }
    }

    /// Judgments on every criterion
    pub fn evaluate(&self, result: &NegotiationResult, terms: &NegotiationTerms) -> Vec<Judgment> {
        vec![
            self.judge_fairness(
                result.final_price,
                terms.buyer_max_price().value(),
                terms.seller_min_price().value(),
            ),
            self.judge_efficiency(result.turns_taken, result.agreed),
            self.judge_protocol(&result.messages),
            self.judge_policy(&result.messages, terms),
        ]
    }

    /// Mean score
    pub fn overall_score(&self, judgments: &[Judgment]) -> f64 {
        if judgments.is_empty() {
            return 0.0;
        }
        judgments.iter().map(|j| j.score).sum::<f64>() / judgments.len() as f64
    }

    /// Human-readable report
    pub fn summary(&self, judgments: &[Judgment]) -> String {
        let rule = "-".repeat(40);
        let mut lines = vec!["Evaluation Summary:".to_string(), rule.clone()];

        for j in judgments {
            let status = if j.passed { "✓" } else { "✗" };
            lines.push(format!(
                "  {} {}: {:.2} - {}",
                status, j.criteria, j.score, j.explanation
            ));
        }

        lines.push(rule);
        lines.push(format!("  Overall Score: {:.2}", self.overall_score(judgments)));
        lines.join("\n")
    }
}
