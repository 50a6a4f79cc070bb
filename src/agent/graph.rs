//! Stage graph
//!
//! Named stages joined by directed edges, walked from the entry point until
//! an edge leads to [`END`]. Only structural problems fail a run: an edge to
//! an unknown stage, a stage without an outgoing edge, or a walk that
//! exceeds the step guard.

use crate::error::OrchestrationError;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Terminal marker for edges
pub const END: &str = "__end__";

const MAX_STEPS: usize = 32;

/// One step of the pipeline. Stages record their outcome on the state and
/// never fail; degraded results are values, not errors.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, state: &mut PipelineState);
}

#[derive(Default)]
pub struct StageGraphBuilder {
    nodes: HashMap<String, Arc<dyn Stage>>,
    order: Vec<String>,
    edges: HashMap<String, String>,
    entry: Option<String>,
}

impl StageGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, stage: Arc<dyn Stage>) -> Self {
        let name = stage.name().to_string();
        if !self.nodes.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.nodes.insert(name, stage);
        self
    }

    pub fn entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.insert(from.to_string(), to.to_string());
        self
    }

    pub fn compile(self) -> Result<StageGraph> {
        let entry = self
            .entry
            .ok_or_else(|| OrchestrationError::WorkflowError("no entry point set".to_string()))?;

        if !self.nodes.contains_key(&entry) {
            return Err(OrchestrationError::WorkflowError(format!(
                "entry point '{}' is not a node",
                entry
            )));
        }

        for (from, to) in &self.edges {
            for name in [from, to] {
                if name != END && !self.nodes.contains_key(name) {
                    return Err(OrchestrationError::WorkflowError(format!(
                        "edge {} -> {} references unknown node '{}'",
                        from, to, name
                    )));
                }
            }
        }

        if let Some(dangling) = self.order.iter().find(|n| !self.edges.contains_key(*n)) {
            return Err(OrchestrationError::WorkflowError(format!(
                "node '{}' has no outgoing edge",
                dangling
            )));
        }

        Ok(StageGraph {
            nodes: self.nodes,
            order: self.order,
            edges: self.edges,
            entry,
        })
    }
}

pub struct StageGraph {
    nodes: HashMap<String, Arc<dyn Stage>>,
    order: Vec<String>,
    edges: HashMap<String, String>,
    entry: String,
}

impl StageGraph {
    pub fn builder() -> StageGraphBuilder {
        StageGraphBuilder::new()
    }

    /// Node names in the order they were added
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    pub async fn invoke(&self, mut state: PipelineState) -> Result<PipelineState> {
        let mut current = self.entry.as_str();

        for _ in 0..MAX_STEPS {
            if current == END {
                return Ok(state);
            }

            let stage = self.nodes.get(current).ok_or_else(|| {
                OrchestrationError::WorkflowError(format!("unknown node '{}'", current))
            })?;

            debug!(run_id = %state.run_id, node = current, "Entering stage");
            stage.run(&mut state).await;
            state.trace.push(current.to_string());

            current = self.edges.get(current).map(String::as_str).ok_or_else(|| {
                OrchestrationError::WorkflowError(format!("node '{}' has no outgoing edge", current))
            })?;
        }

        if current == END {
            return Ok(state);
        }

        Err(OrchestrationError::WorkflowError(format!(
            "graph did not reach END within {} steps",
            MAX_STEPS
        )))
    }
}
