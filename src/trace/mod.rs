//! Session trace events and sinks.
//!
//! The orchestrator receives a sink handle at creation and reports every
//! step to it. Sinks never influence the negotiation.

use crate::fsm::FailureReason;
use crate::policy::PolicyViolation;
use crate::protocol::Message;
use crate::types::{Party, Price, SessionId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Something worth recording about a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    SessionStarted {
        session_id: SessionId,
        buyer_max_price: Price,
        seller_min_price: Price,
        seller_asking_price: Price,
        max_turns: u32,
    },
    Turn {
        session_id: SessionId,
        turn: u32,
        actor: Party,
        action: Message,
    },
    Violation {
        session_id: SessionId,
        turn: u32,
        actor: Party,
        violation: PolicyViolation,
        reason: String,
    },
    Outcome {
        session_id: SessionId,
        agreed: bool,
        final_price: Option<Price>,
        failure_reason: Option<FailureReason>,
        turns_taken: u32,
    },
}

/// Receiver of trace events
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent);
}

impl<T: TraceSink + ?Sized> TraceSink for Arc<T> {
    fn record(&self, event: &TraceEvent) {
        (**self).record(event)
    }
}

/// Discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&self, _event: &TraceEvent) {}
}

/// Forwards events to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&self, event: &TraceEvent) {
        match event {
            TraceEvent::SessionStarted {
                session_id,
                buyer_max_price,
                seller_min_price,
                seller_asking_price,
                max_turns,
            } => tracing::info!(
                session = %session_id,
                "Session started: buyer max {}, seller min {}, asking {}, {} turns",
                buyer_max_price,
                seller_min_price,
                seller_asking_price,
                max_turns
            ),
            TraceEvent::Turn {
                session_id,
                turn,
                actor,
                action,
            } => tracing::debug!(session = %session_id, turn, "{}: {}", actor, action),
            TraceEvent::Violation {
                session_id,
                actor,
                violation,
                reason,
                ..
            } => tracing::warn!(
                session = %session_id,
                "Policy violation by {}: {} ({})",
                actor,
                violation,
                reason
            ),
            TraceEvent::Outcome {
                session_id,
                agreed: true,
                final_price: Some(price),
                turns_taken,
                ..
            } => tracing::info!(
                session = %session_id,
                "Agreed at {} after {} turns",
                price,
                turns_taken
            ),
            TraceEvent::Outcome {
                session_id,
                failure_reason,
                turns_taken,
                ..
            } => tracing::info!(
                session = %session_id,
                "No agreement after {} turns: {}",
                turns_taken,
                failure_reason.map(|r| r.to_string()).unwrap_or_default()
            ),
        }
    }
}

/// A recorded event with its wall-clock time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

/// Keeps events in memory for inspection or export
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<TraceEvent> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|record| record.event.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export as a pretty-printed JSON array
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }
}

impl TraceSink for MemorySink {
    fn record(&self, event: &TraceEvent) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TraceRecord {
                timestamp_ms,
                event: event.clone(),
            });
    }
}

/// Sends every event to each of its sinks
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn TraceSink>>) -> Self {
        Self { sinks }
    }
}

impl TraceSink for FanoutSink {
    fn record(&self, event: &TraceEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
