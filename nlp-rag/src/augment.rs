//! Context augmentation for text-generation calls.
//!
//! [`Augmenter`] retrieves a shortlist for the user's text and folds it into
//! the prompt sent to a [`TextGenerator`]. When retrieval fails or finds
//! nothing, the prompt is sent without context. A generation that fails
//! with context is retried once without it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::pipeline::RagPipeline;

/// A model that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Prompt used when no context is available.
pub fn direct_prompt(instruction: &str, user_text: &str) -> String {
    format!("{instruction}: {user_text}")
}

/// Prompt embedding the retrieved documents as context.
pub fn context_prompt(instruction: &str, user_text: &str, documents: &[String]) -> String {
    format!(
        "{instruction} (with the following context):\nUser Query: {user_text}\n\nRelevant Documents:\n{}",
        documents.join("\n\n")
    )
}

/// Runs retrieval and generation for one instruction/text pair.
pub struct Augmenter {
    pipeline: Arc<RagPipeline>,
    generator: Arc<dyn TextGenerator>,
}

impl Augmenter {
    /// Create an augmenter over a pipeline and a generator.
    pub fn new(pipeline: Arc<RagPipeline>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { pipeline, generator }
    }

    /// Build the prompt for `user_text`, with retrieved context when available.
    pub async fn build_prompt(&self, instruction: &str, user_text: &str, top_k: usize) -> String {
        match self.context(instruction, user_text, top_k).await {
            Some(documents) => context_prompt(instruction, user_text, &documents),
            None => direct_prompt(instruction, user_text),
        }
    }

    async fn context(&self, instruction: &str, user_text: &str, top_k: usize) -> Option<Vec<String>> {
        let query = direct_prompt(instruction, user_text);
        match self.pipeline.retrieve(&query, top_k).await {
            Ok(documents) if !documents.is_empty() => {
                info!(documents = documents.len(), "augmenting prompt with retrieved context");
                Some(documents)
            }
            Ok(_) => {
                info!("no relevant documents found, generating without context");
                None
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, generating without context");
                None
            }
        }
    }

    /// Retrieve context for `user_text` and generate a response.
    ///
    /// A failed generation with context is retried once with the direct prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`](crate::RagError::Generation) if the
    /// generator fails on the direct prompt. Retrieval errors never propagate.
    #[instrument(name = "rag.augment", skip_all, fields(generator = self.generator.name()))]
    pub async fn augment(&self, instruction: &str, user_text: &str, top_k: usize) -> Result<String> {
        let direct = direct_prompt(instruction, user_text);
        let Some(documents) = self.context(instruction, user_text, top_k).await else {
            return self.generator.generate(&direct).await;
        };

        let prompt = context_prompt(instruction, user_text, &documents);
        match self.generator.generate(&prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(error = %e, "generation with context failed, retrying without context");
                self.generator.generate(&direct).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_prompt_joins_instruction_and_text() {
        assert_eq!(direct_prompt("Summarize", "rust"), "Summarize: rust");
    }

    #[test]
    fn context_prompt_lists_documents_separated_by_blank_lines() {
        let prompt = context_prompt("Classify", "cats", &["one".into(), "two".into()]);
        assert_eq!(
            prompt,
            "Classify (with the following context):\nUser Query: cats\n\nRelevant Documents:\none\n\ntwo"
        );
    }
}
