//! Generator trait and prompt construction.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that answers a question from retrieved context.
///
/// Output may be sampled, so callers must not assume two calls with the same
/// input return the same text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer to `query` conditioned on `context`.
    ///
    /// `context` may be empty when nothing was retrieved.
    async fn generate(&self, query: &str, context: &str) -> Result<String>;

    /// Identifier of the generation model.
    fn model_name(&self) -> &str;
}

/// Prompt templates for RAG generation.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the full prompt sent to an instruction-following model.
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        if context.trim().is_empty() {
            return format!(
                "No passages from the document matched this question. \
                 Say that the document does not appear to cover it, then answer briefly \
                 if you can.\n\nQuestion: {question}\n\nAnswer:"
            );
        }

        format!(
            "Use the following passages from a document to answer the question. \
             If the passages do not contain the answer, say that you don't know; \
             do not make one up.\n\n\
             Passages:\n{context}\n\n\
             Question: {question}\n\n\
             Answer:"
        )
    }
}
