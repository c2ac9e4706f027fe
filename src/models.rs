//! Core data models shared by the client-side state manager, the HTTP
//! client, and the server endpoints.
//!
//! Persisted records and wire bodies use `camelCase` field names so the
//! durable JSON matches what the endpoints exchange.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of summarization input accepted by the summarize endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Url,
    Text,
}

/// External summarization backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Rapidapi,
    Groq,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Rapidapi => "rapidapi",
            Provider::Groq => "groq",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rapidapi" => Ok(Provider::Rapidapi),
            "groq" => Ok(Provider::Groq),
            other => Err(format!(
                "unknown provider '{}'. Must be rapidapi or groq.",
                other
            )),
        }
    }
}

/// Target verbosity tier for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Short,
    #[default]
    Medium,
    Detailed,
}

impl Length {
    pub fn as_str(&self) -> &'static str {
        match self {
            Length::Short => "short",
            Length::Medium => "medium",
            Length::Detailed => "detailed",
        }
    }

    /// Sentence-count instruction given to the LLM.
    pub fn sentence_range(&self) -> &'static str {
        match self {
            Length::Short => "3-4",
            Length::Medium => "6-8",
            Length::Detailed => "10-12",
        }
    }

    /// Sentence count passed to the article-summarizer API.
    pub fn rapidapi_sentences(&self) -> u8 {
        match self {
            Length::Short => 3,
            Length::Medium => 5,
            Length::Detailed => 8,
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Length {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Length::Short),
            "medium" => Ok(Length::Medium),
            "detailed" => Ok(Length::Detailed),
            other => Err(format!(
                "unknown length '{}'. Must be short, medium, or detailed.",
                other
            )),
        }
    }
}

// ============ Documents ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Error => "error",
        }
    }
}

/// An uploaded document tracked by the state manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub file_name: String,
    /// Declared MIME type.
    pub file_type: String,
    /// Size of the uploaded file in bytes.
    pub file_size: u64,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub char_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Document {
    /// A fresh record in the `processing` state with a new random id.
    pub fn processing(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            file_type: file_type.into(),
            file_size,
            extracted_text: String::new(),
            word_count: 0,
            char_count: 0,
            summary: None,
            status: DocumentStatus::Processing,
            error: None,
        }
    }
}

// ============ History ============

/// What a history entry summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    Url,
    Text,
    Document,
}

impl HistoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryMode::Url => "url",
            HistoryMode::Text => "text",
            HistoryMode::Document => "document",
        }
    }
}

impl From<Mode> for HistoryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Url => HistoryMode::Url,
            Mode::Text => HistoryMode::Text,
        }
    }
}

/// An immutable record of one completed summarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub mode: HistoryMode,
    /// URL, text excerpt, or document name, depending on `mode`.
    pub source: String,
    pub provider: Provider,
    pub length: Length,
    pub summary: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl HistoryItem {
    pub fn new(
        mode: HistoryMode,
        source: impl Into<String>,
        provider: Provider,
        length: Length,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            source: source.into(),
            provider,
            length,
            summary: summary.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

// ============ Chat ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// One transcript entry in the active chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_context: Option<String>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            document_context: None,
        }
    }
}

/// A prior turn as sent in `chatHistory`. Only role and content travel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl From<&ChatMessage> for ChatTurn {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

// ============ Credentials ============

/// Bearer tokens for the two external providers. Empty means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub rapidapi_key: String,
    #[serde(default)]
    pub groq_key: String,
}

impl Credentials {
    pub fn new(rapidapi_key: impl Into<String>, groq_key: impl Into<String>) -> Self {
        Self {
            rapidapi_key: rapidapi_key.into().trim().to_string(),
            groq_key: groq_key.into().trim().to_string(),
        }
    }

    pub fn groq(&self) -> Option<&str> {
        non_empty(&self.groq_key)
    }

    pub fn rapidapi(&self) -> Option<&str> {
        non_empty(&self.rapidapi_key)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ============ Wire bodies ============

/// Body of `POST /api/summarize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub length: Length,
}

impl SummarizeRequest {
    pub fn url(url: impl Into<String>, provider: Provider, length: Length) -> Self {
        Self {
            mode: Mode::Url,
            url: Some(url.into()),
            text: None,
            provider,
            length,
        }
    }

    pub fn text(text: impl Into<String>, provider: Provider, length: Length) -> Self {
        Self {
            mode: Mode::Text,
            url: None,
            text: Some(text.into()),
            provider,
            length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
    /// Provider that actually produced the summary.
    pub provider: Provider,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Body of `POST /api/enhance-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceResponse {
    pub enhanced: String,
}

/// Success body of `POST /api/process-document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    pub success: bool,
    pub file_name: String,
    pub file_type: String,
    pub extracted_text: String,
    pub word_count: usize,
    pub char_count: usize,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
