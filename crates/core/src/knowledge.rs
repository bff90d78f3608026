//! Knowledge retrieval types shared between the knowledge base and the
//! orchestrator's prompt construction.

use serde::{Deserialize, Serialize};

/// One retrieved text snippet, ordered by relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub tag: String,
    pub file: String,
    pub chunk_index: usize,
    pub score: f64,
    pub text: String,
}

impl KnowledgeSnippet {
    /// The citation prefix used when injecting the snippet into a prompt.
    pub fn citation(&self) -> String {
        format!("[{}/{}#{}]", self.tag, self.file, self.chunk_index)
    }
}

/// A searchable snippet source — implemented by the file-backed knowledge
/// base; sessions hold one of these per project.
pub trait KnowledgeSource: Send + Sync {
    /// Keyword-overlap search scoped to `tags` (empty = all tags).
    /// Returns an empty list when the query has no tokens or nothing matches.
    fn search(&self, query: &str, tags: &[String], k: usize) -> Vec<KnowledgeSnippet>;
}
