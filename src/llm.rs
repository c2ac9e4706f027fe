//! Chat-completion provider abstraction.
//!
//! The gateways never talk HTTP to the language model directly; they build a
//! [`Completion`] and hand it to an [`LlmProvider`]. The production
//! implementation is [`GroqProvider`], which speaks the OpenAI-compatible
//! `POST /v1/chat/completions` API that Groq exposes.
//!
//! The API key travels with each call rather than living in the provider,
//! because every request to the server carries its own credential header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::GroqConfig;
use crate::error::{FlashError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Which configured model a completion should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Larger model used for summaries.
    Summary,
    /// Smaller, faster model used for chat and enhancement.
    Chat,
}

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub model: ModelTier,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Completion {
    pub fn messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.prompt)]
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run `completion` with `api_key` and return the assistant's text.
    async fn complete(&self, api_key: &str, completion: Completion) -> Result<String>;
}

/// Groq chat completions over its OpenAI-compatible endpoint.
pub struct GroqProvider {
    http: reqwest::Client,
    base_url: String,
    summary_model: String,
    chat_model: String,
}

impl GroqProvider {
    pub fn new(http: reqwest::Client, config: &GroqConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            summary_model: config.summary_model.clone(),
            chat_model: config.chat_model.clone(),
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Summary => &self.summary_model,
            ModelTier::Chat => &self.chat_model,
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn complete(&self, api_key: &str, completion: Completion) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model_for(completion.model),
            "messages": completion.messages(),
            "temperature": completion.temperature,
        });
        if let Some(max_tokens) = completion.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        debug!("Groq request to {} ({:?})", url, completion.model);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FlashError::provider_status(
                status.as_u16(),
                api_error_message(&text)
                    .unwrap_or_else(|| format!("Groq API error {}", status)),
            ));
        }

        let json: serde_json::Value = response.json().await?;
        parse_completion(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| FlashError::provider("missing choices[0].message.content"))?
        .trim();

    if content.is_empty() {
        return Err(FlashError::provider("Language model returned an empty response"));
    }
    Ok(content.to_string())
}

/// OpenAI-style `{ "error": { "message": ... } }` bodies.
fn api_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json["error"]["message"].as_str().map(str::to_string)
}
