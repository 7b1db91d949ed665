//! Negotiation demo: the three canonical scenarios plus a grounded seller
//!
//! This example walks through:
//! 1. A deal inside a wide zone of agreement
//! 2. No zone of agreement at all
//! 3. A deal at the exact boundary price
//! 4. An enterprise-segment seller grounded in the pricing catalog
//! 5. A scripted buyer that breaks the rules
//!
//! Run with: cargo run --example negotiation_demo

use haggle::cli::{format_transcript, NegotiationRuntime};
use haggle::evaluation::NegotiationJudge;
use haggle::orchestration::{negotiate, Executor, GraphExecutor, NegotiationTerms, Orchestrator};
use haggle::trace::LogSink;
use haggle::{Config, Message, NegotiationResult, Party, RuleSeller, ScriptedNegotiator, SessionId};
use std::sync::Arc;

fn print_result(title: &str, terms: &NegotiationTerms, result: &NegotiationResult) {
    println!("┌─────────────────────────────────────────────┐");
    println!("│ {:<44}│", title);
    println!("└─────────────────────────────────────────────┘");
    println!(
        "   Buyer max {} | Seller min {} | Asking {}",
        terms.buyer_max_price(),
        terms.seller_min_price(),
        terms.seller_asking_price()
    );
    for line in format_transcript(result) {
        println!("   {}", line);
    }

    match result.final_price {
        Some(price) => println!("   ✅ Agreed at ${:.2} in {} turns", price, result.turns_taken),
        None => println!(
            "   ❌ No deal after {} turns ({})",
            result.turns_taken,
            result.failure_detail.as_deref().unwrap_or("unknown")
        ),
    }

    let judge = NegotiationJudge::default();
    let judgments = judge.evaluate(result, terms);
    println!("   Judge score: {:.2}\n", judge.overall_score(&judgments));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,haggle=info")
        .init();

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║   Haggle Negotiation Demo                    ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let engine = GraphExecutor::default();

    let scenarios = [
        ("Scenario 1: Wide agreement zone", 500.0, 350.0, 450.0),
        ("Scenario 2: No agreement zone", 200.0, 500.0, 600.0),
        ("Scenario 3: Boundary price", 350.0, 350.0, 400.0),
    ];
    for (title, buyer_max, seller_min, asking) in scenarios {
        let terms = NegotiationTerms::new(buyer_max, seller_min, asking, 10)?;
        let result = negotiate(terms, &engine)?;
        print_result(title, &terms, &result);
    }

    // Grounded seller: the enterprise segment lowers the floor
    let mut config = Config::default();
    config.pricing.segment = Some("enterprise".to_string());
    let runtime = NegotiationRuntime::new(config);
    let report = runtime.run_session(runtime.config().terms()?, &engine, Arc::new(LogSink))?;
    print_result("Scenario 4: Enterprise segment", &report.terms, &report.result);

    // A buyer that tries to pay over its own budget is stopped by the policy
    let terms = NegotiationTerms::new(450.0, 350.0, 500.0, 10)?;
    let cheater = ScriptedNegotiator::new(
        Party::Buyer,
        vec![Message::offer(300.0, "opening")?, Message::offer(900.0, "overpay")?],
    );
    let mut orchestrator = Orchestrator::new(
        SessionId::generate(),
        terms,
        Box::new(cheater),
        Box::new(RuleSeller::new()),
        Arc::new(LogSink),
    )?;
    engine.execute(&mut orchestrator)?;
    print_result("Scenario 5: Policy violation", &terms, &orchestrator.result());

    Ok(())
}
