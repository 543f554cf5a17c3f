//! Grounded answer synthesis.
//!
//! Builds a single prompt from the filtered context records and hands it
//! to a [`LanguageModel`]. The prompt is a fixed system instruction (persona
//! plus grounding rules) and a user message containing the rendered context
//! block followed by the literal question.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RecallError, Result};
use crate::models::ContextRecord;

/// One fully assembled model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for text-generation backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Generate a completion. Fails with [`RecallError::Synthesis`].
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Tunables for the synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    /// Who the assistant speaks for, e.g. `"the Formula SAE team"`.
    pub persona: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            persona: "the community".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// The system instruction sent with every synthesis call.
pub fn system_instruction(persona: &str) -> String {
    format!(
        "You are a helpful assistant for {persona}. \
You have access to the community's chat history. \
Answer questions using only the context provided. \
If the context does not contain enough information, say so clearly. \
Be concise but helpful, and cite specific details from the context when available."
    )
}

/// Render each record as `From {author} in #{channel}:\n{content}`,
/// separated by a blank line, in the given order.
pub fn render_context_block(contexts: &[ContextRecord]) -> String {
    contexts
        .iter()
        .map(|ctx| format!("From {} in #{}:\n{}", ctx.author, ctx.channel, ctx.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The user message: context block, then the question.
pub fn build_user_message(query: &str, contexts: &[ContextRecord]) -> String {
    format!(
        "Context from the chat archive:\n{}\n\nQuestion: {}\n\n\
Answer based on the context above. If it does not contain relevant information, say so.",
        render_context_block(contexts),
        query
    )
}

/// Assembles prompts and invokes the injected [`LanguageModel`].
pub struct SynthesisEngine {
    model: Arc<dyn LanguageModel>,
    settings: SynthesisSettings,
}

impl SynthesisEngine {
    pub fn new(model: Arc<dyn LanguageModel>, settings: SynthesisSettings) -> Self {
        Self { model, settings }
    }

    /// Build the request without calling the model.
    pub fn build_request(&self, query: &str, contexts: &[ContextRecord]) -> CompletionRequest {
        CompletionRequest {
            system: system_instruction(&self.settings.persona),
            user: build_user_message(query, contexts),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Generate a grounded answer. `contexts` must be non-empty.
    pub async fn synthesize(&self, query: &str, contexts: &[ContextRecord]) -> Result<String> {
        if contexts.is_empty() {
            return Err(RecallError::Synthesis(
                "synthesis requires at least one context record".into(),
            ));
        }
        let request = self.build_request(query, contexts);
        tracing::debug!(
            model = self.model.model_name(),
            contexts = contexts.len(),
            prompt_chars = request.system.len() + request.user.len(),
            "invoking language model"
        );
        self.model.complete(&request).await
    }
}
