//! Query planner
//!
//! Asks the model which tool fits the query, classifies the free-text
//! answer and turns it into a [`Plan`]. Planning never fails: a model error
//! yields an empty plan whose reasoning carries the cause.

use crate::classifier::{classify_response, ToolSelection};
use crate::llm::LanguageModel;
use crate::models::{Plan, Query, ToolParameters};
use crate::tools::{ToolRegistry, RAG_SEARCH, STOCK_QUOTE};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod prompt;
pub use prompt::{build_planning_prompt, PLANNER_SYSTEM_PROMPT};

pub struct QueryPlanner {
    model: Arc<dyn LanguageModel>,
    /// Registered `(name, description)` pairs offered to the model
    tools: Vec<(String, &'static str)>,
}

impl QueryPlanner {
    pub fn new(model: Arc<dyn LanguageModel>, registry: &ToolRegistry) -> Self {
        Self {
            model,
            tools: registry.descriptions(),
        }
    }

    pub async fn plan(&self, query: &Query) -> Plan {
        let prompt = build_planning_prompt(&query.text, &self.tools);

        let response = match self
            .model
            .generate_with_system(PLANNER_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Planning failed; continuing with an empty plan");
                return Plan::empty(format!("Error during planning: {}", e));
            }
        };

        debug!(response_len = response.len(), "Planner response received");

        let plan = plan_from_selection(classify_response(&response, &query.text), query);

        info!(
            tools = ?plan.tools_to_use,
            reasoning = %plan.reasoning,
            "Plan created"
        );

        plan
    }
}

pub fn plan_from_selection(selection: ToolSelection, query: &Query) -> Plan {
    match selection {
        ToolSelection::QuoteLookup { symbol } => {
            let reasoning = format!("LLM selected {} tool for {}", STOCK_QUOTE, symbol);
            Plan::single(STOCK_QUOTE, params(&[("symbol", symbol.as_str())]), reasoning)
        }
        ToolSelection::KnowledgeSearch { question } => Plan::single(
            RAG_SEARCH,
            params(&[("question", question.as_str())]),
            format!("LLM selected {} tool", RAG_SEARCH),
        ),
        ToolSelection::Unclassified => Plan::single(
            RAG_SEARCH,
            params(&[("question", query.text.as_str())]),
            format!(
                "Planner response named no tool; defaulting to {}",
                RAG_SEARCH
            ),
        ),
    }
}

fn params(pairs: &[(&str, &str)]) -> ToolParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}
