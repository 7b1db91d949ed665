//! Haggle CLI binary

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use haggle::cli::{format_transcript, Cli, Commands, NegotiationRuntime};
use haggle::evaluation::NegotiationJudge;
use haggle::trace::{FanoutSink, LogSink, MemorySink, TraceSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            session,
            trace_out,
            wire,
        } => {
            let config = session.load_config().context("Failed to load configuration")?;
            let runtime = NegotiationRuntime::new(config);

            let memory = Arc::new(MemorySink::new());
            let sinks: Vec<Arc<dyn TraceSink>> = vec![
                Arc::new(LogSink) as Arc<dyn TraceSink>,
                memory.clone() as Arc<dyn TraceSink>,
            ];
            let sink: Arc<dyn TraceSink> = Arc::new(FanoutSink::new(sinks));

            let report = runtime
                .run_demo(session.engine, sink)
                .context("Negotiation failed to run")?;
            let result = &report.result;

            println!("Session {}", result.session_id);
            println!(
                "Buyer max {}, seller min {}, asking {}, {} turns",
                report.terms.buyer_max_price(),
                report.terms.seller_min_price(),
                report.terms.seller_asking_price(),
                report.terms.max_turns()
            );
            for line in format_transcript(result) {
                println!("  {}", line);
            }

            match (result.agreed, result.final_price) {
                (true, Some(price)) => {
                    println!("Agreed at ${:.2} after {} turns", price, result.turns_taken)
                }
                _ => println!(
                    "No agreement after {} turns: {}",
                    result.turns_taken,
                    result.failure_detail.as_deref().unwrap_or("unknown")
                ),
            }
            println!("Transcript digest: {}", result.transcript);

            if wire {
                for envelope in &report.envelopes {
                    let bytes = envelope.encode().context("Failed to encode envelope")?;
                    println!("{}", String::from_utf8_lossy(&bytes));
                }
            }

            let judge = NegotiationJudge::default();
            let judgments = judge.evaluate(result, &report.terms);
            println!("\n{}", judge.summary(&judgments));

            if let Some(path) = trace_out {
                let json = memory.to_json().context("Failed to export trace")?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write trace to {}", path.display()))?;
                tracing::info!("Trace written to {}", path.display());
            }
        }

        Commands::Batch {
            session,
            count,
            seed,
        } => {
            let config = session.load_config().context("Failed to load configuration")?;
            let runtime = NegotiationRuntime::new(config);

            let summary = runtime
                .run_batch(count, seed, session.engine)
                .await
                .context("Batch run failed")?;

            println!("Sessions:      {}", summary.sessions);
            println!(
                "Agreements:    {} ({:.1}%)",
                summary.agreements,
                summary.success_rate * 100.0
            );
            match summary.average_price {
                Some(price) => println!("Average price: ${:.2}", price),
                None => println!("Average price: n/a"),
            }
            println!("Average turns: {:.2}", summary.average_turns);
        }
    }

    Ok(())
}
