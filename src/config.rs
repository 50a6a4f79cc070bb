//! Runtime configuration
//!
//! Everything is read from the environment (after `.env` has been loaded by
//! the binary). Unset variables fall back to defaults; malformed ones are a
//! configuration error rather than a silent default.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::OrchestrationError;
use crate::models::ExecutionMode;
use crate::Result;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_ALPHA_VANTAGE_MCP_URL: &str = "https://mcp.alphavantage.co/mcp";

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            model: DEFAULT_GROQ_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuoteSettings {
    pub api_key: Option<String>,
    pub mcp_url: String,
    pub timeout_secs: u64,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            mcp_url: DEFAULT_ALPHA_VANTAGE_MCP_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Documents handed to the model per knowledge-base answer
    pub top_k: usize,
    /// Directory of `.txt` / `.md` documents for the in-memory retriever
    pub knowledge_dir: Option<PathBuf>,
    /// Chat turns remembered per session
    pub history_turns: usize,
    /// Sessions kept in memory before the least recently used is dropped
    pub max_sessions: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            knowledge_dir: None,
            history_turns: 10,
            max_sessions: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowSettings {
    pub mode: ExecutionMode,
    /// Invoke the tools of one plan concurrently
    pub parallel_tools: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub quotes: QuoteSettings,
    pub retrieval: RetrievalSettings,
    pub workflow: WorkflowSettings,
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = AppConfig::default();

        let llm = LlmSettings {
            api_key: get("GROQ_API_KEY"),
            base_url: get("GROQ_BASE_URL").unwrap_or(defaults.llm.base_url),
            model: get("GROQ_MODEL").unwrap_or(defaults.llm.model),
            temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", defaults.llm.temperature)?,
            max_tokens: parse_or(get("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", defaults.llm.max_tokens)?,
            timeout_secs: parse_or(get("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", defaults.llm.timeout_secs)?,
        };

        let quotes = QuoteSettings {
            api_key: get("ALPHA_VANTAGE_API_KEY"),
            mcp_url: get("ALPHA_VANTAGE_MCP_URL").unwrap_or(defaults.quotes.mcp_url),
            timeout_secs: defaults.quotes.timeout_secs,
        };

        let retrieval = RetrievalSettings {
            top_k: parse_or(get("RAG_TOP_K"), "RAG_TOP_K", defaults.retrieval.top_k)?,
            knowledge_dir: get("KNOWLEDGE_DIR").map(PathBuf::from),
            history_turns: parse_or(
                get("SESSION_HISTORY_TURNS"),
                "SESSION_HISTORY_TURNS",
                defaults.retrieval.history_turns,
            )?,
            max_sessions: parse_or(
                get("MAX_SESSIONS"),
                "MAX_SESSIONS",
                defaults.retrieval.max_sessions,
            )?,
        };

        let workflow = WorkflowSettings {
            mode: match get("WORKFLOW_MODE") {
                Some(mode) => mode.parse()?,
                None => ExecutionMode::default(),
            },
            parallel_tools: parse_bool(get("PARALLEL_TOOLS"), "PARALLEL_TOOLS")?,
        };

        if retrieval.top_k == 0 {
            return Err(OrchestrationError::ConfigError(
                "RAG_TOP_K must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            llm,
            quotes,
            retrieval,
            workflow,
            log_level: get("RUST_LOG"),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.parse().map_err(|_| {
            OrchestrationError::ConfigError(format!("Invalid value for {}: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str) -> Result<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(OrchestrationError::ConfigError(format!(
            "Invalid value for {}: '{}'",
            key, other
        ))),
    }
}
