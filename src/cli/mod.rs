//! CLI module for haggle

pub mod app;
pub mod commands;

pub use app::{format_transcript, BatchSummary, NegotiationRuntime, SessionReport};
pub use commands::{Cli, Commands, EngineKind, SessionArgs};
