//! Language model clients for answer synthesis.
//!
//! [`OpenAIChatModel`] calls `POST {url}/chat/completions` on OpenAI or any
//! OpenAI-compatible endpoint. [`DisabledModel`] refuses every request.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chat_recall_core::synthesis::{CompletionRequest, LanguageModel};
use chat_recall_core::RecallError;

use crate::config::Config;
use crate::embedding::OPENAI_DEFAULT_URL;
use crate::http;

/// Instantiate the model named by `synthesis.provider`.
pub fn create_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let syn = &config.synthesis;
    let model: Arc<dyn LanguageModel> = match syn.provider.as_str() {
        "disabled" => Arc::new(DisabledModel),
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
            let name = syn
                .model
                .clone()
                .ok_or_else(|| anyhow::anyhow!("synthesis.model required"))?;
            Arc::new(OpenAIChatModel::new(
                name,
                syn.url.clone().unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
                api_key,
                http::build_client(syn.timeout_secs)?,
                syn.max_retries,
            ))
        }
        other => bail!("Unknown synthesis provider: {}", other),
    };
    Ok(model)
}

pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _request: &CompletionRequest) -> chat_recall_core::Result<String> {
        Err(RecallError::Synthesis(
            "synthesis provider is disabled".into(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client.
pub struct OpenAIChatModel {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAIChatModel {
    pub fn new(
        model: String,
        url: String,
        api_key: String,
        client: reqwest::Client,
        max_retries: u32,
    ) -> Self {
        Self {
            model,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            client,
            max_retries,
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> Result<serde_json::Value> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        Ok(serde_json::to_value(body)?)
    }
}

/// Extract `choices[0].message.content`.
pub fn parse_chat_response(json: serde_json::Value) -> Result<String> {
    let response: ChatResponse = serde_json::from_value(json)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("Invalid chat response: no message content"))
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> chat_recall_core::Result<String> {
        let body = self.request_body(request).map_err(RecallError::synthesis)?;
        let json = http::post_json(
            &self.client,
            &format!("{}/chat/completions", self.url),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await
        .map_err(RecallError::synthesis)?;
        parse_chat_response(json).map_err(RecallError::synthesis)
    }
}
