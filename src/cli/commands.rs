//! CLI command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::orchestration::{Executor, GraphExecutor, SequentialLoop};

#[derive(Parser, Debug)]
#[command(name = "haggle")]
#[command(about = "Haggle - bounded buyer/seller price negotiation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one negotiation and print the transcript and evaluation
    Demo {
        #[command(flatten)]
        session: SessionArgs,

        /// Write the trace as JSON to this file
        #[arg(long)]
        trace_out: Option<PathBuf>,

        /// Print every message as a wire envelope
        #[arg(long)]
        wire: bool,
    },

    /// Run many negotiations with random buyer budgets
    Batch {
        #[command(flatten)]
        session: SessionArgs,

        /// Number of sessions
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,

        /// Seed for the buyer budget draw
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Options shared by every command that runs sessions
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Buyer's maximum price
    #[arg(long)]
    pub buyer_max: Option<f64>,

    /// Seller's minimum price
    #[arg(long)]
    pub seller_min: Option<f64>,

    /// Seller's asking price
    #[arg(long)]
    pub asking: Option<f64>,

    /// Turn bound
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Customer segment for the grounded price floor
    #[arg(long)]
    pub segment: Option<String>,

    /// Execution engine
    #[arg(short, long, value_enum, default_value_t = EngineKind::Graph)]
    pub engine: EngineKind,
}

impl SessionArgs {
    /// Config file (or defaults), then `HAGGLE_*` variables, then flags
    pub fn load_config(&self) -> crate::error::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?.with_env(),
            None => Config::from_env(),
        };

        if let Some(value) = self.buyer_max {
            config.agents.buyer_max_price = value;
        }
        if let Some(value) = self.seller_min {
            config.agents.seller_min_price = value;
        }
        if let Some(value) = self.asking {
            config.agents.seller_asking_price = value;
        }
        if let Some(value) = self.max_turns {
            config.limits.max_turns = value;
        }
        if let Some(segment) = &self.segment {
            config.pricing.segment = Some(segment.clone());
        }

        Ok(config)
    }
}

/// Which engine drives the sessions
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Explicit node/edge graph
    Graph,
    /// Plain router loop
    Loop,
}

impl EngineKind {
    pub fn executor(self) -> Box<dyn Executor> {
        match self {
            EngineKind::Graph => Box::new(GraphExecutor::default()),
            EngineKind::Loop => Box::new(SequentialLoop),
        }
    }
}
