//! Planning prompt

use crate::tools::{RAG_SEARCH, STOCK_QUOTE};

pub const PLANNER_SYSTEM_PROMPT: &str =
    "You are a planning assistant that determines which tools to use.";

/// `tools` is the registered `(name, description)` list, in display order.
pub fn build_planning_prompt(query: &str, tools: &[(String, &str)]) -> String {
    let available = tools
        .iter()
        .enumerate()
        .map(|(i, (name, description))| format!("{}. {} - {}", i + 1, name, description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the following user query and determine which tools should be used:

User Query: "{query}"

Available Tools:
{available}

Rules:
- If the query is about stock prices, market data, or mentions stock symbols, use {quote}
- If the query is about general knowledge, documents, or technical topics, use {rag}
- If unclear, default to {rag}
- Extract stock symbols if mentioned (e.g., AAPL, MSFT, GOOGL)

Respond with a JSON object:
{{
    "tools_to_use": ["tool_name"],
    "parameters": {{"tool_name": {{"param": "value"}}}},
    "reasoning": "Brief explanation of choice"
}}
"#,
        query = query,
        available = available,
        rag = RAG_SEARCH,
        quote = STOCK_QUOTE,
    )
}
