//! Shared test doubles

use crate::error::OrchestrationError;
use crate::models::{Query, ToolInput, ToolParameters};
use crate::tools::Tool;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tool with a canned reply that records what it was called with.
pub struct StubTool {
    name: &'static str,
    reply: std::result::Result<String, String>,
    defaults: Vec<(String, String)>,
    calls: AtomicUsize,
    seen: Arc<Mutex<Vec<ToolInput>>>,
}

impl StubTool {
    pub fn ok(name: &'static str, reply: impl Into<String>) -> Self {
        Self::with_reply(name, Ok(reply.into()))
    }

    pub fn failing(name: &'static str, message: impl Into<String>) -> Self {
        Self::with_reply(name, Err(message.into()))
    }

    fn with_reply(name: &'static str, reply: std::result::Result<String, String>) -> Self {
        Self {
            name,
            reply,
            defaults: Vec::new(),
            calls: AtomicUsize::new(0),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_defaults(mut self, defaults: &[(&str, &str)]) -> Self {
        self.defaults = defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_inputs(&self) -> Arc<Mutex<Vec<ToolInput>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "stub"
    }

    fn parameter_defaults(&self, _query: &Query) -> ToolParameters {
        self.defaults
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect()
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(input.clone());

        self.reply
            .clone()
            .map_err(OrchestrationError::ToolError)
    }
}
