//! Execution engines.
//!
//! Two ways to drive an [`Orchestrator`] to completion: a plain loop over the
//! router, and a small graph with explicit nodes and conditional edges. Both
//! advance the session only through [`Orchestrator::step`].

use crate::error::{HaggleError, Result};
use crate::types::Party;
use std::collections::HashMap;

use super::orchestrator::{route, Orchestrator, Route};

/// Drives a session until the router says `End`
pub trait Executor: Send + Sync {
    fn execute(&self, orchestrator: &mut Orchestrator) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Upper bound on steps for a session; a sound session needs at most two per turn
fn step_limit(orchestrator: &Orchestrator) -> usize {
    2 * orchestrator.context().max_turns() as usize + 2
}

/// Ask the router, step, repeat
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialLoop;

impl Executor for SequentialLoop {
    fn execute(&self, orchestrator: &mut Orchestrator) -> Result<()> {
        let limit = step_limit(orchestrator);

        for _ in 0..limit {
            match route(orchestrator.context()) {
                Route::End => return Ok(()),
                Route::Buyer => orchestrator.step(Party::Buyer),
                Route::Seller => orchestrator.step(Party::Seller),
            };
        }

        match route(orchestrator.context()) {
            Route::End => Ok(()),
            _ => Err(HaggleError::EngineStalled { limit }),
        }
    }

    fn name(&self) -> &'static str {
        "loop"
    }
}

/// Edge target in a [`NegotiationGraph`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Node(Party),
    End,
}

/// Nodes are the two parties; edges are keyed by the route a step returns
#[derive(Clone, Debug)]
pub struct NegotiationGraph {
    entry: Party,
    edges: HashMap<(Party, Route), Target>,
}

impl NegotiationGraph {
    /// Graph with no edges
    pub fn new(entry: Party) -> Self {
        Self {
            entry,
            edges: HashMap::new(),
        }
    }

    pub fn add_edge(mut self, from: Party, on: Route, to: Target) -> Self {
        self.edges.insert((from, on), to);
        self
    }

    /// Route every outcome of `from` to the node the router names
    pub fn add_conditional_edges(self, from: Party) -> Self {
        self.add_edge(from, Route::Buyer, Target::Node(Party::Buyer))
            .add_edge(from, Route::Seller, Target::Node(Party::Seller))
            .add_edge(from, Route::End, Target::End)
    }

    pub fn entry(&self) -> Party {
        self.entry
    }

    /// Follow the edge for `on` out of `from`
    pub fn next(&self, from: Party, on: Route) -> Result<Target> {
        self.edges
            .get(&(from, on))
            .copied()
            .ok_or_else(|| HaggleError::MissingEdge {
                node: from.to_string(),
                route: on.to_string(),
            })
    }
}

impl Default for NegotiationGraph {
    /// Buyer enters; both nodes branch on the router
    fn default() -> Self {
        NegotiationGraph::new(Party::Buyer)
            .add_conditional_edges(Party::Buyer)
            .add_conditional_edges(Party::Seller)
    }
}

/// Walks a [`NegotiationGraph`]
#[derive(Clone, Debug, Default)]
pub struct GraphExecutor {
    graph: NegotiationGraph,
}

impl GraphExecutor {
    pub fn new(graph: NegotiationGraph) -> Self {
        Self { graph }
    }
}

impl Executor for GraphExecutor {
    fn execute(&self, orchestrator: &mut Orchestrator) -> Result<()> {
        if route(orchestrator.context()) == Route::End {
            return Ok(());
        }

        let limit = step_limit(orchestrator);
        let mut node = self.graph.entry();

        for _ in 0..limit {
            let next = orchestrator.step(node);
            match self.graph.next(node, next)? {
                Target::End => return Ok(()),
                Target::Node(party) => node = party,
            }
        }

        Err(HaggleError::EngineStalled { limit })
    }

    fn name(&self) -> &'static str {
        "graph"
    }
}
