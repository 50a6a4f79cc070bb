//! Final answer synthesis
//!
//! A single tool result is passed through untouched. Several results are
//! merged by the model; when the model is unavailable the results are
//! concatenated instead, so the caller always gets a non-empty answer.

use crate::llm::LanguageModel;
use crate::models::{Plan, Query, ResultSet};
use std::sync::Arc;
use tracing::{debug, warn};

const SYNTHESIS_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that synthesizes information from multiple sources.";

pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        query: &Query,
        plan: Option<&Plan>,
        results: &ResultSet,
    ) -> String {
        let reasoning = plan
            .map(|p| p.reasoning.as_str())
            .filter(|r| !r.trim().is_empty())
            .unwrap_or("No reasoning provided");

        let mut entries = results.iter();
        match (entries.next(), entries.next()) {
            (None, _) => return unable_to_answer(reasoning),
            (Some(only), None) => {
                debug!(tool_name = %only.tool_name, "Single result; returning verbatim");
                return only.render();
            }
            _ => {}
        }

        let prompt = build_synthesis_prompt(&query.text, reasoning, results);

        match self
            .model
            .generate_with_system(SYNTHESIS_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
            Ok(_) => {
                warn!("Synthesis returned no text; concatenating results");
                concatenate(results)
            }
            Err(e) => {
                warn!(error = %e, "Synthesis failed; concatenating results");
                concatenate(results)
            }
        }
    }
}

fn unable_to_answer(reasoning: &str) -> String {
    format!(
        "I'm unable to answer that: no applicable tool was selected. ({})",
        reasoning
    )
}

fn build_synthesis_prompt(query: &str, reasoning: &str, results: &ResultSet) -> String {
    let mut prompt = format!(
        "User asked: \"{}\"\n\nThe following tools were used:\n{}\n\nTool Results:\n",
        query, reasoning
    );

    for result in results.iter() {
        prompt.push_str(&format!("\n{}: {}\n", result.tool_name, result.render()));
    }

    prompt.push_str(
        "\nPlease provide a coherent, helpful response that combines the relevant information \
         from the tool results to answer the user's question.\n\
         Be concise and focus on what the user asked for.",
    );
    prompt
}

/// `name: result` pairs in plan order, separated by blank lines.
fn concatenate(results: &ResultSet) -> String {
    results
        .iter()
        .map(|r| format!("{}: {}", r.tool_name, r.render()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
