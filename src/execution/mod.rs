//! Execution engine for plan fulfilment
//!
//! Every tool named in the plan gets exactly one result-set entry. A tool
//! that is missing or fails is recorded and the remaining tools still run.

use crate::models::{Plan, Query, ResultSet, ToolFailure, ToolInput, ToolParameters};
use crate::tools::{Tool, ToolRegistry, RAG_SEARCH};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub struct ExecutionEngine {
    tool_registry: Arc<ToolRegistry>,
    concurrent: bool,
}

impl ExecutionEngine {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            tool_registry,
            concurrent: false,
        }
    }

    /// Invoke the tools of one plan concurrently instead of one by one.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub async fn execute(&self, plan: &Plan, query: &Query) -> ResultSet {
        let mut results = ResultSet::new();

        let mut jobs: Vec<(String, Arc<dyn Tool>, ToolInput)> = Vec::new();

        for tool_name in &plan.tools_to_use {
            match self.tool_registry.get(tool_name) {
                Some(tool) => {
                    let mut parameters = merge_parameters(
                        tool.parameter_defaults(query),
                        plan.parameters_for(tool_name),
                    );
                    if tool_name == RAG_SEARCH && !parameters.contains_key("session_id") {
                        parameters.insert("session_id".to_string(), json!(query.session_id));
                    }
                    let input = ToolInput::new(tool_name.clone(), parameters);
                    jobs.push((tool_name.clone(), tool, input));
                }
                None => {
                    warn!(tool_name = %tool_name, "Tool not registered");
                    results.record(tool_name.clone(), Err(ToolFailure::NotFound));
                }
            }
        }

        let outcomes = if self.concurrent && jobs.len() > 1 {
            run_concurrently(jobs).await
        } else {
            run_sequentially(jobs).await
        };

        for (tool_name, outcome) in outcomes {
            results.record(tool_name, outcome);
        }

        // Restore plan order; not-found entries were recorded first.
        let mut ordered = ResultSet::new();
        for tool_name in &plan.tools_to_use {
            if let Some(entry) = results.get(tool_name) {
                ordered.record(entry.tool_name.clone(), entry.outcome.clone());
            }
        }

        debug!(
            requested = plan.tools_to_use.len(),
            succeeded = ordered.success_count(),
            "Plan execution completed"
        );

        ordered
    }
}

type Outcome = (String, std::result::Result<String, ToolFailure>);

async fn invoke_tool(tool_name: String, tool: Arc<dyn Tool>, input: ToolInput) -> Outcome {
    let start = Instant::now();

    let outcome = tool.invoke(&input).await.map_err(|e| {
        warn!(tool_name = %tool_name, error = %e, "Tool execution failed");
        ToolFailure::Execution {
            message: e.to_string(),
        }
    });

    debug!(
        tool_name = %tool_name,
        success = outcome.is_ok(),
        execution_time_ms = start.elapsed().as_millis() as u64,
        "Tool finished"
    );

    (tool_name, outcome)
}

async fn run_sequentially(jobs: Vec<(String, Arc<dyn Tool>, ToolInput)>) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(jobs.len());
    for (tool_name, tool, input) in jobs {
        outcomes.push(invoke_tool(tool_name, tool, input).await);
    }
    outcomes
}

async fn run_concurrently(jobs: Vec<(String, Arc<dyn Tool>, ToolInput)>) -> Vec<Outcome> {
    let names: Vec<String> = jobs.iter().map(|(name, _, _)| name.clone()).collect();
    let mut outcomes: Vec<Option<Outcome>> = vec![None; jobs.len()];

    let mut set = JoinSet::new();
    for (index, (tool_name, tool, input)) in jobs.into_iter().enumerate() {
        set.spawn(async move { (index, invoke_tool(tool_name, tool, input).await) });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => warn!(error = %e, "Tool task aborted"),
        }
    }

    // A task that panicked leaves its slot empty.
    outcomes
        .into_iter()
        .zip(names)
        .map(|(outcome, tool_name)| {
            outcome.unwrap_or_else(|| {
                (
                    tool_name,
                    Err(ToolFailure::Execution {
                        message: "tool task panicked".to_string(),
                    }),
                )
            })
        })
        .collect()
}

/// Plan parameters override the tool's defaults key by key.
fn merge_parameters(
    mut defaults: ToolParameters,
    planned: Option<&ToolParameters>,
) -> ToolParameters {
    if let Some(planned) = planned {
        for (key, value) in planned {
            defaults.insert(key.clone(), value.clone());
        }
    }
    defaults
}
