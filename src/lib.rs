//! Agentic RAG Orchestrator
//!
//! A conversational assistant that routes each query to a knowledge-base
//! search or a market-quote lookup and returns one answer:
//! - Planner asks the model which tool fits and extracts its parameters
//! - Executor invokes the planned tools, isolating each tool's failure
//! - Synthesizer passes a single result through or merges several
//!
//! PIPELINE:
//! QUERY → PLAN → EXECUTE → SYNTHESIZE → RESPONSE

pub mod agent;
pub mod classifier;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod models;
pub mod planner;
pub mod quotes;
pub mod retrieval;
pub mod state;
pub mod synthesis;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use error::{OrchestrationError, Result};

// Re-export common types
pub use agent::Orchestrator;
pub use classifier::ToolSelection;
pub use config::AppConfig;
pub use models::*;
