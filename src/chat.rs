//! Chat gateway: one assistant reply per request, grounded in an optional
//! document and the most recent conversation turns.

use std::sync::Arc;

use tracing::info;

use crate::error::{FlashError, Result};
use crate::html::truncate_chars;
use crate::llm::{Completion, LlmProvider, ModelTier};
use crate::models::{ChatRequest, ChatResponse, ChatTurn};

/// Characters of document content embedded in the system prompt.
pub const MAX_CONTEXT_CHARS: usize = 4000;
/// Prior turns embedded in the system prompt.
pub const HISTORY_TURNS: usize = 6;
const CHAT_TEMPERATURE: f32 = 0.3;

/// `Role: content` lines for the last [`HISTORY_TURNS`] turns.
pub fn format_history(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_TURNS);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_system_prompt(
    document_name: Option<&str>,
    document_content: Option<&str>,
    history: &[ChatTurn],
) -> String {
    let document = match document_content.filter(|c| !c.is_empty()) {
        Some(content) => format!(
            "Document: \"{}\"\nContent: {}...",
            document_name.filter(|n| !n.is_empty()).unwrap_or("Untitled"),
            truncate_chars(content, MAX_CONTEXT_CHARS)
        ),
        None => "No document content available.".to_string(),
    };

    format!(
        "You are FlashRead AI, an intelligent assistant that helps users understand and explore documents and summaries.

You have access to the following document content:
{document}

Previous conversation:
{conversation}

Guidelines:
- Be helpful, concise, and accurate
- Reference specific parts of the document when relevant
- If asked about something not in the document, clearly state that
- Use markdown formatting for better readability
- Keep responses focused and actionable
- If the user asks for explanations, break down complex concepts simply",
        document = document,
        conversation = format_history(history),
    )
}

pub struct ChatGateway {
    llm: Arc<dyn LlmProvider>,
}

impl ChatGateway {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn chat(&self, req: &ChatRequest, groq_key: Option<&str>) -> Result<ChatResponse> {
        let key = groq_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FlashError::credential("Missing Groq API key"))?;

        let message = req.message.trim();
        if message.is_empty() {
            return Err(FlashError::validation("Message is required"));
        }

        let completion = Completion {
            model: ModelTier::Chat,
            system: build_system_prompt(
                req.document_name.as_deref(),
                req.document_content.as_deref(),
                &req.chat_history,
            ),
            prompt: message.to_string(),
            temperature: CHAT_TEMPERATURE,
            max_tokens: None,
        };

        let response = self.llm.complete(key, completion).await?;
        info!(
            "chat reply for {} ({} prior turns)",
            req.document_name.as_deref().unwrap_or("untitled"),
            req.chat_history.len()
        );
        Ok(ChatResponse { response })
    }
}
