//! Knowledge-base search tool
//!
//! Retrieves the closest documents, asks the model to answer from them
//! (with the session's recent turns as chat history) and cites sources.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::llm::LanguageModel;
use crate::memory::{ConversationTurn, SessionMemory};
use crate::models::{Query, ToolInput, ToolParameters, DEFAULT_SESSION_ID};
use crate::retrieval::{DocumentRetriever, ScoredDocument};
use crate::tools::{Tool, RAG_SEARCH};
use crate::Result;

pub const NO_RELEVANT_INFORMATION: &str =
    "I don't have any relevant information to answer your question.";

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Answer questions based on the provided context.\nIf you don't know the answer based on the context, say so.\nBe concise and cite the sources when possible.";

pub struct KnowledgeBaseTool {
    retriever: Arc<dyn DocumentRetriever>,
    model: Arc<dyn LanguageModel>,
    memory: Arc<SessionMemory>,
    top_k: usize,
}

impl KnowledgeBaseTool {
    pub fn new(
        retriever: Arc<dyn DocumentRetriever>,
        model: Arc<dyn LanguageModel>,
        memory: Arc<SessionMemory>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            model,
            memory,
            top_k: top_k.max(1),
        }
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &'static str {
        RAG_SEARCH
    }

    fn description(&self) -> &'static str {
        "Search through the knowledge base to answer questions about documents"
    }

    fn parameter_defaults(&self, query: &Query) -> ToolParameters {
        let mut defaults = ToolParameters::new();
        defaults.insert("question".to_string(), json!(query.text));
        defaults.insert("session_id".to_string(), json!(query.session_id));
        defaults
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String> {
        let question = input.require_str("question")?;
        let session_id = input.str_param("session_id").unwrap_or(DEFAULT_SESSION_ID);

        let hits = self.retriever.search(question, self.top_k).await?;
        debug!(session_id, hits = hits.len(), "Knowledge base search");

        if hits.is_empty() {
            return Ok(NO_RELEVANT_INFORMATION.to_string());
        }

        let history = self.memory.history(session_id).await;
        let prompt = build_answer_prompt(question, &hits, &history);

        let answer = self
            .model
            .generate_with_system(ANSWER_SYSTEM_PROMPT, &prompt)
            .await?;
        let answer = answer.trim();

        self.memory.record(session_id, question, answer).await;

        Ok(format!("{}\n\nSources: {}", answer, unique_sources(&hits).join(", ")))
    }
}

fn build_answer_prompt(
    question: &str,
    hits: &[ScoredDocument],
    history: &[ConversationTurn],
) -> String {
    let context = hits
        .iter()
        .map(|hit| format!("[{}]\n{}", hit.document.source, hit.document.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!("Context from documents:\n{}\n\n", context);

    if !history.is_empty() {
        prompt.push_str("Chat History:\n");
        for turn in history {
            prompt.push_str(&format!("Human: {}\nAI Assistant: {}\n", turn.question, turn.answer));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Human: {}\n\nAI Assistant:", question));
    prompt
}

fn unique_sources(hits: &[ScoredDocument]) -> Vec<&str> {
    let mut sources: Vec<&str> = Vec::new();
    for hit in hits {
        if !sources.contains(&hit.document.source.as_str()) {
            sources.push(&hit.document.source);
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::retrieval::{Document, InMemoryRetriever};

    fn tool_with(model: Arc<ScriptedModel>, memory: Arc<SessionMemory>) -> KnowledgeBaseTool {
        let retriever = InMemoryRetriever::new(vec![
            Document::new("Attention weighs tokens against each other.", "paper.pdf"),
            Document::new("Self attention is computed per head.", "paper.pdf"),
            Document::new("Transformers stack attention layers.", "notes.md"),
        ]);
        KnowledgeBaseTool::new(Arc::new(retriever), model, memory, 3)
    }

    fn input(question: &str, session: &str) -> ToolInput {
        let tool_query = Query::new(question, session);
        let mut params = ToolParameters::new();
        params.insert("question".to_string(), json!(tool_query.text));
        params.insert("session_id".to_string(), json!(tool_query.session_id));
        ToolInput::new(RAG_SEARCH, params)
    }

    #[tokio::test]
    async fn test_answer_cites_unique_sources() {
        let model = Arc::new(ScriptedModel::replying("  Attention relates tokens.  "));
        let tool = tool_with(model.clone(), Arc::new(SessionMemory::default()));

        let answer = tool.invoke(&input("What is attention?", "s1")).await.unwrap();

        assert_eq!(answer, "Attention relates tokens.\n\nSources: paper.pdf, notes.md");
        assert_eq!(model.call_count(), 1);
        assert!(model.prompts()[0].contains("Context from documents"));
    }

    #[tokio::test]
    async fn test_no_hits_skips_the_model() {
        let model = Arc::new(ScriptedModel::replying("unused"));
        let tool = tool_with(model.clone(), Arc::new(SessionMemory::default()));

        let answer = tool.invoke(&input("bananas?", "s1")).await.unwrap();

        assert_eq!(answer, NO_RELEVANT_INFORMATION);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_session() {
        let model = Arc::new(ScriptedModel::replying("It relates tokens."));
        let memory = Arc::new(SessionMemory::default());
        let tool = tool_with(model.clone(), memory.clone());

        tool.invoke(&input("What is attention?", "s1")).await.unwrap();
        tool.invoke(&input("And self attention?", "s1")).await.unwrap();
        tool.invoke(&input("What are transformers attention layers?", "s2")).await.unwrap();

        let prompts = model.prompts();
        assert!(!prompts[0].contains("Chat History"));
        assert!(prompts[1].contains("Human: What is attention?"));
        assert!(!prompts[2].contains("Chat History"));
        assert_eq!(memory.history("s1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_returned() {
        let model = Arc::new(ScriptedModel::failing("groq down"));
        let tool = tool_with(model, Arc::new(SessionMemory::default()));

        let error = tool.invoke(&input("What is attention?", "s1")).await.unwrap_err();
        assert!(error.to_string().contains("groq down"));
    }

    #[test]
    fn test_defaults_come_from_query() {
        let tool = tool_with(
            Arc::new(ScriptedModel::replying("x")),
            Arc::new(SessionMemory::default()),
        );
        let defaults = tool.parameter_defaults(&Query::new("Explain machine learning", "abc"));

        assert_eq!(defaults["question"], json!("Explain machine learning"));
        assert_eq!(defaults["session_id"], json!("abc"));
    }
}
