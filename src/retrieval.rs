//! Document retrieval
//!
//! The semantic vector store lives behind [`DocumentRetriever`]. The
//! in-memory implementation scores whole documents by term overlap and is
//! meant for development, demos and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::error::OrchestrationError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub text: String,
    pub source: String,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Similarity search over the knowledge base
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Best `top_k` matches, highest score first. No match is an empty vec.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRetriever {
    documents: Vec<Document>,
}

impl InMemoryRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load every `.txt` / `.md` file in `dir` as one document.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut documents = Vec::new();

        let entries = std::fs::read_dir(dir).map_err(|e| {
            OrchestrationError::RetrievalError(format!(
                "Cannot read knowledge directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let path = entry?.path();
            let is_text = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_lowercase().as_str(), "txt" | "md"))
                .unwrap_or(false);

            if !path.is_file() || !is_text {
                continue;
            }

            let text = std::fs::read_to_string(&path)?;
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            documents.push(Document::new(text, source));
        }

        documents.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl DocumentRetriever for InMemoryRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredDocument> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let doc_terms = terms(&doc.text);
                let hits = query_terms.intersection(&doc_terms).count();
                (hits > 0).then(|| ScoredDocument {
                    document: doc.clone(),
                    score: hits as f32 / query_terms.len() as f32,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        debug!(matches = scored.len(), "In-memory retrieval complete");
        Ok(scored)
    }
}
