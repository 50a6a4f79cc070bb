//! Core data models for the retrieval pipeline

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::OrchestrationError;

/// Session used when the caller does not scope the conversation.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Parameters handed to a single tool: string keys, string/primitive values.
pub type ToolParameters = serde_json::Map<String, Value>;

//
// ================= Query =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub session_id: String,
}

impl Query {
    pub fn new(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            text: text.into(),
            session_id: if session_id.trim().is_empty() {
                DEFAULT_SESSION_ID.to_string()
            } else {
                session_id
            },
        }
    }

    pub fn in_default_session(text: impl Into<String>) -> Self {
        Self::new(text, DEFAULT_SESSION_ID)
    }
}

//
// ================= Plan =================
//

/// Routing decision produced once per query by the planner.
///
/// `tools_to_use` keeps insertion order and never holds the same name twice.
/// Names are not checked against the registry here; unknown names surface
/// later as result-set failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub tools_to_use: Vec<String>,
    pub parameters: HashMap<String, ToolParameters>,
    pub reasoning: String,
}

impl Plan {
    /// A plan that selects no tool at all.
    pub fn empty(reasoning: impl Into<String>) -> Self {
        Self {
            tools_to_use: Vec::new(),
            parameters: HashMap::new(),
            reasoning: reasoning.into(),
        }
    }

    pub fn single(
        tool_name: &str,
        parameters: ToolParameters,
        reasoning: impl Into<String>,
    ) -> Self {
        Self::empty(reasoning).with_tool(tool_name, parameters)
    }

    /// Append a tool. A repeated name keeps its original position and
    /// takes the newer parameters.
    pub fn with_tool(mut self, tool_name: &str, parameters: ToolParameters) -> Self {
        if !self.tools_to_use.iter().any(|t| t == tool_name) {
            self.tools_to_use.push(tool_name.to_string());
        }
        self.parameters.insert(tool_name.to_string(), parameters);
        self
    }

    pub fn parameters_for(&self, tool_name: &str) -> Option<&ToolParameters> {
        self.parameters.get(tool_name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools_to_use.is_empty()
    }
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: ToolParameters,
}

impl ToolInput {
    pub fn new(tool_name: impl Into<String>, parameters: ToolParameters) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
        }
    }

    /// String view of a parameter. Numbers and booleans are not coerced.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str) -> crate::Result<&str> {
        self.str_param(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                OrchestrationError::InvalidToolInput(format!(
                    "Expected '{}' for {}",
                    key, self.tool_name
                ))
            })
    }
}

/// Why a requested tool produced no usable text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolFailure {
    NotFound,
    Execution { message: String },
}

impl ToolFailure {
    pub fn render(&self, tool_name: &str) -> String {
        match self {
            ToolFailure::NotFound => format!("Tool {} not found", tool_name),
            ToolFailure::Execution { message } => {
                format!("Error executing {}: {}", tool_name, message)
            }
        }
    }
}

//
// ================= Result Set =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_name: String,
    pub outcome: std::result::Result<String, ToolFailure>,
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Display text: the tool output, or the embedded error string.
    pub fn render(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(failure) => failure.render(&self.tool_name),
        }
    }
}

/// Tool name → outcome, in plan order, one entry per requested name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    entries: Vec<ToolResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome, replacing any earlier entry for the same tool.
    pub fn record(
        &mut self,
        tool_name: impl Into<String>,
        outcome: std::result::Result<String, ToolFailure>,
    ) {
        let tool_name = tool_name.into();
        match self.entries.iter_mut().find(|e| e.tool_name == tool_name) {
            Some(existing) => existing.outcome = outcome,
            None => self.entries.push(ToolResult { tool_name, outcome }),
        }
    }

    pub fn get(&self, tool_name: &str) -> Option<&ToolResult> {
        self.entries.iter().find(|e| e.tool_name == tool_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }
}

//
// ================= Workflow =================
//

/// How the orchestrator drives its three stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Compiled stage graph with explicit edges.
    #[default]
    Graph,
    /// Direct calls, one stage after another.
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionMode::Graph => "graph",
            ExecutionMode::Sequential => "sequential",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ExecutionMode {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "graph" => Ok(ExecutionMode::Graph),
            "sequential" | "simple" => Ok(ExecutionMode::Sequential),
            other => Err(OrchestrationError::ConfigError(format!(
                "Unknown workflow mode '{}' (expected 'graph' or 'sequential')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub mode: ExecutionMode,
    pub capability_names: Vec<String>,
    pub nodes: Vec<String>,
    pub status: String,
}
