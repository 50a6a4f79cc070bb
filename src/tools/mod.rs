//! Tool trait and registry
//!
//! A tool is one independently invokable capability. Failures come back as
//! `Err` and are turned into result-set entries by the execution engine;
//! nothing a tool does can abort the rest of a plan.

use crate::config::AppConfig;
use crate::llm::LanguageModel;
use crate::memory::SessionMemory;
use crate::models::{Query, ToolInput, ToolParameters};
use crate::quotes::AlphaVantageClient;
use crate::retrieval::InMemoryRetriever;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub mod knowledge;
pub mod stock_quote;

pub use knowledge::KnowledgeBaseTool;
pub use stock_quote::StockQuoteTool;

/// Knowledge-base search over the document store
pub const RAG_SEARCH: &str = "rag_search";
/// Market quote lookup by ticker symbol
pub const STOCK_QUOTE: &str = "stock_quote";
/// Ticker used when a quote is requested without a recognizable symbol
pub const DEFAULT_SYMBOL: &str = "AAPL";

/// Trait for a single capability
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Values used for parameters the plan leaves out.
    fn parameter_defaults(&self, _query: &Query) -> ToolParameters {
        ToolParameters::new()
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String>;
}

/// Tool registry for looking up tools by name
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, description)` of every tool, sorted by name.
    pub fn descriptions(&self) -> Vec<(String, &'static str)> {
        let mut described: Vec<(String, &'static str)> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description()))
            .collect();
        described.sort_by(|a, b| a.0.cmp(&b.0));
        described
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the knowledge-base and quote tools, wired from config.
pub fn create_default_registry(
    config: &AppConfig,
    model: Arc<dyn LanguageModel>,
) -> Result<ToolRegistry> {
    let retriever = match &config.retrieval.knowledge_dir {
        Some(dir) => InMemoryRetriever::from_dir(dir)?,
        None => {
            warn!("KNOWLEDGE_DIR not set; knowledge base starts empty");
            InMemoryRetriever::default()
        }
    };
    info!(documents = retriever.len(), "Knowledge base loaded");

    if config.quotes.api_key.is_none() {
        warn!("ALPHA_VANTAGE_API_KEY not set; quote lookups will fail");
    }

    let memory = Arc::new(
        SessionMemory::new(config.retrieval.history_turns)
            .with_max_sessions(config.retrieval.max_sessions),
    );

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(KnowledgeBaseTool::new(
        Arc::new(retriever),
        model,
        memory,
        config.retrieval.top_k,
    )));
    registry.register(Arc::new(StockQuoteTool::new(Arc::new(
        AlphaVantageClient::new(&config.quotes)?,
    ))));

    Ok(registry)
}
