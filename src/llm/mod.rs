//! Language-model provider trait and implementations
//!
//! The planner, the synthesizer and the knowledge-base tool all talk to the
//! model through [`LanguageModel`]; transport failures come back as `Err`
//! and each caller decides how to degrade.

use crate::error::OrchestrationError;
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub mod groq;
pub use groq::GroqClient;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Answer questions clearly and concisely.\nIf you don't know something, say so honestly.";

/// Text generation endpoint
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system(DEFAULT_SYSTEM_PROMPT, prompt).await
    }
}

/// Deterministic model for offline runs and tests.
///
/// Replies are served in order; the last one repeats once the script runs
/// out. Every call is counted, including failing ones.
pub struct ScriptedModel {
    replies: Vec<std::result::Result<String, String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::script(vec![Ok(reply.into())])
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::script(vec![Err(message.into())])
    }

    pub fn script(replies: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = self
            .replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| Err("empty script".to_string()));

        reply.map_err(OrchestrationError::LlmError)
    }
}
