//! End-to-end negotiation scenarios

use std::sync::Arc;

use haggle::cli::NegotiationRuntime;
use haggle::evaluation::NegotiationJudge;
use haggle::orchestration::{negotiate, Executor, GraphExecutor, NegotiationTerms, SequentialLoop};
use haggle::policy::PolicyViolation;
use haggle::trace::{MemorySink, TraceEvent};
use haggle::{
    Config, CoordinationPolicy, FailureReason, Message, NegotiationFsm, NegotiationState,
    Orchestrator, Party, Price, RuleBuyer, RuleSeller, ScriptedNegotiator, SessionId,
};

fn terms(buyer_max: f64, seller_min: f64, asking: f64, max_turns: u32) -> NegotiationTerms {
    NegotiationTerms::new(buyer_max, seller_min, asking, max_turns).unwrap()
}

fn price(value: f64) -> Price {
    Price::new(value).unwrap()
}

#[test]
fn test_wide_zone_reaches_agreement() {
    for engine in [&GraphExecutor::default() as &dyn Executor, &SequentialLoop] {
        let result = negotiate(terms(500.0, 350.0, 450.0, 10), engine).unwrap();

        assert!(result.agreed);
        let final_price = result.final_price.unwrap();
        assert!((350.0..=500.0).contains(&final_price));
        assert!(result.turns_taken <= 6);

        // The asking price is already within the buyer's budget
        assert_eq!(final_price, 450.0);
        assert_eq!(result.turns_taken, 0);
        assert_eq!(result.messages.len(), 1);
    }
}

#[test]
fn test_no_zone_fails() {
    let result = negotiate(terms(200.0, 500.0, 600.0, 10), &GraphExecutor::default()).unwrap();

    assert!(!result.agreed);
    assert!(result.final_price.is_none());

    // The seller walks away once the end is near and the offer is hopeless
    assert_eq!(result.failure_reason, Some(FailureReason::RejectedBySeller));
    assert_eq!(result.turns_taken, 9);
    assert_eq!(
        result.failure_detail.as_deref(),
        Some("offer too far below acceptable range")
    );
}

#[test]
fn test_turn_bound_ends_stalled_negotiation() {
    let result = negotiate(terms(200.0, 240.0, 600.0, 10), &SequentialLoop).unwrap();

    assert!(!result.agreed);
    assert_eq!(result.failure_reason, Some(FailureReason::MaxTurnsExceeded));
    assert_eq!(result.turns_taken, 10);
    assert_eq!(result.failure_detail.as_deref(), Some("no agreement after 10 turns"));

    // Buyer's last offer is its full budget
    let last_offer = result
        .messages
        .iter()
        .rev()
        .find(|entry| entry.actor == Party::Buyer)
        .unwrap();
    assert_eq!(last_offer.action.price(), Some(price(200.0)));
}

#[test]
fn test_boundary_price_agreement() {
    let result = negotiate(terms(350.0, 350.0, 400.0, 10), &GraphExecutor::default()).unwrap();

    assert!(result.agreed);
    assert_eq!(result.final_price, Some(350.0));
    assert_eq!(result.turns_taken, 2);

    let prices: Vec<f64> = result
        .messages
        .iter()
        .filter_map(|entry| entry.action.price())
        .map(|p| p.value())
        .collect();
    assert_eq!(prices, vec![210.0, 392.0, 226.8, 350.0, 350.0]);
}

#[test]
fn test_asking_below_floor_is_not_a_deal() {
    let result = negotiate(terms(500.0, 400.0, 300.0, 10), &SequentialLoop).unwrap();

    // The buyer accepts $300 at once, but that is under the seller's minimum
    assert!(!result.agreed);
    assert!(result.final_price.is_none());
    assert_eq!(result.failure_reason, Some(FailureReason::PolicyViolation));
    assert_eq!(
        result.failure_detail.as_deref(),
        Some("accepted price $300.00 below seller min $400.00")
    );
    assert_eq!(result.turns_taken, 0);
    assert!(result.messages.is_empty());
}

#[test]
fn test_sub_cent_terms_still_negotiate() {
    let result = negotiate(terms(0.005, 0.001, 0.01, 10), &GraphExecutor::default()).unwrap();

    assert_ne!(result.failure_reason, Some(FailureReason::InvalidTransition));
    assert!(result.agreed);
    let final_price = result.final_price.unwrap();
    assert!(final_price >= 0.001 && final_price <= 0.005);
}

#[test]
fn test_policy_checks_from_overview() {
    let buyer_side = CoordinationPolicy::new(price(450.0), price(350.0));
    let verdict = buyer_side.validate_buyer_offer(price(500.0), None);
    assert!(!verdict.allowed);
    assert_eq!(verdict.violation, Some(PolicyViolation::AboveMaximum));

    let verdict = buyer_side.validate_seller_counter(price(450.0), Some(price(400.0)));
    assert!(!verdict.allowed);
    assert_eq!(verdict.violation, Some(PolicyViolation::PriceIncreased));
}

#[test]
fn test_agreement_from_idle_is_refused() {
    let mut fsm = NegotiationFsm::new(10);
    assert!(fsm.transition_to_agreed(price(400.0)).is_err());
    assert_eq!(fsm.state(), NegotiationState::Idle);
}

#[test]
fn test_scripted_buyer_cannot_back_down() {
    let buyer = ScriptedNegotiator::new(
        Party::Buyer,
        vec![
            Message::offer(300.0, "").unwrap(),
            Message::offer(280.0, "changed my mind").unwrap(),
        ],
    );
    let sink = Arc::new(MemorySink::new());
    let mut orchestrator = Orchestrator::new(
        SessionId::generate(),
        terms(450.0, 350.0, 500.0, 10),
        Box::new(buyer),
        Box::new(RuleSeller::new()),
        sink.clone(),
    )
    .unwrap();

    SequentialLoop.execute(&mut orchestrator).unwrap();
    let result = orchestrator.result();

    assert_eq!(result.failure_reason, Some(FailureReason::PolicyViolation));
    // Offer and counter made it into the log; the decreasing offer did not
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.turns_taken, 1);

    let violation = sink
        .events()
        .into_iter()
        .find_map(|event| match event {
            TraceEvent::Violation { violation, .. } => Some(violation),
            _ => None,
        });
    assert_eq!(violation, Some(PolicyViolation::PriceDecreased));
}

#[test]
fn test_scripted_seller_against_rule_buyer() {
    let seller = ScriptedNegotiator::new(
        Party::Seller,
        vec![
            Message::counter(480.0, 270.0, "").unwrap(),
            Message::counter(440.0, 291.6, "").unwrap(),
        ],
    );
    let mut orchestrator = Orchestrator::new(
        SessionId::generate(),
        terms(450.0, 350.0, 500.0, 10),
        Box::new(RuleBuyer::new()),
        Box::new(seller),
        Arc::new(MemorySink::new()),
    )
    .unwrap();

    GraphExecutor::default().execute(&mut orchestrator).unwrap();
    let result = orchestrator.result();

    assert!(result.agreed);
    assert_eq!(result.final_price, Some(440.0));
    assert_eq!(result.messages.last().unwrap().actor, Party::Buyer);
}

#[test]
fn test_exhausted_script_rejects() {
    let seller = ScriptedNegotiator::new(Party::Seller, Vec::new());
    let mut orchestrator = Orchestrator::new(
        SessionId::generate(),
        terms(450.0, 350.0, 500.0, 10),
        Box::new(RuleBuyer::new()),
        Box::new(seller),
        Arc::new(MemorySink::new()),
    )
    .unwrap();

    SequentialLoop.execute(&mut orchestrator).unwrap();
    let result = orchestrator.result();

    assert_eq!(result.failure_reason, Some(FailureReason::RejectedBySeller));
    assert_eq!(result.failure_detail.as_deref(), Some("script exhausted"));
}

#[test]
fn test_grounded_segment_session() {
    let mut config = Config::default();
    config.pricing.segment = Some("enterprise".to_string());
    let runtime = NegotiationRuntime::new(config);

    let report = runtime
        .run_session(
            runtime.config().terms().unwrap(),
            &GraphExecutor::default(),
            Arc::new(MemorySink::new()),
        )
        .unwrap();

    assert_eq!(report.terms.seller_min_price(), price(297.5));
    assert!(report.result.agreed);
    let final_price = report.result.final_price.unwrap();
    assert!((297.5..=450.0).contains(&final_price));

    let judge = NegotiationJudge::default();
    let judgments = judge.evaluate(&report.result, &report.terms);
    assert!(judgments.iter().skip(2).all(|j| j.passed));
}

#[test]
fn test_result_json_shape() {
    let result = negotiate(terms(350.0, 350.0, 400.0, 10), &SequentialLoop).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["agreed"], true);
    assert_eq!(json["turns_taken"], 2);
    assert_eq!(json["messages"][0]["actor"], "buyer");
    assert_eq!(json["messages"][0]["action"]["type"], "offer");
    assert_eq!(json["failure_reason"], serde_json::Value::Null);
}
