//! Client-side document and session state manager.
//!
//! [`StateManager`] is the single authority over uploaded documents, the
//! summarization history, the stored credentials, and the active chat
//! session. Every mutation updates the in-memory state first and is then
//! written through to the injected [`Storage`] port, so the durable store is
//! a lagging mirror of memory, never the other way round.
//!
//! # Invariants
//!
//! - History holds at most [`MAX_HISTORY`] items, newest first.
//! - Documents are upserted by id; a completion for an id that was removed in
//!   the meantime is dropped.
//! - A chat session is identified by its context's name and content length.
//!   Re-selecting the same context keeps the transcript; anything else resets
//!   it.
//! - At most one chat turn is outstanding at a time.
//!
//! # Removal settling
//!
//! Document removal is written through immediately and written again after
//! [`RECONCILE_DELAY`] (when a tokio runtime is available), so a stale
//! snapshot written by another writer in between is corrected. Readers of the
//! durable store should allow for that window.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{FlashError, Result};
use crate::models::{
    ChatMessage, ChatRequest, ChatRole, ChatTurn, Credentials, Document, DocumentStatus,
    HistoryItem, ProcessedDocument,
};
use crate::storage::{Storage, CREDENTIALS_KEY, DOCUMENTS_KEY, HISTORY_KEY};

pub const MAX_HISTORY: usize = 50;
pub const RECONCILE_DELAY: Duration = Duration::from_millis(100);
/// Transcript messages sent as `chatHistory` with each chat request.
pub const CHAT_HISTORY_WINDOW: usize = 10;

pub const CHAT_APOLOGY: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again.";

/// Result of an extraction round-trip for one document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    Completed(ProcessedDocument),
    Failed(String),
}

/// What the active chat session is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    pub name: String,
    pub content: String,
}

impl ChatContext {
    pub fn new(content: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    fn session_key(&self) -> (&str, usize) {
        (&self.name, self.content.chars().count())
    }
}

/// A chat request handed out by [`StateManager::begin_chat_turn`].
///
/// Must be returned through [`StateManager::finish_chat_turn`] once the
/// gateway has answered.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    session: u64,
    pub request: ChatRequest,
}

#[derive(Debug, Default)]
struct ChatSession {
    /// Bumped on every reset; stale replies carry an older value.
    generation: u64,
    context: Option<ChatContext>,
    messages: Vec<ChatMessage>,
    awaiting_reply: bool,
}

pub struct StateManager {
    storage: Arc<dyn Storage>,
    documents: Vec<Document>,
    history: Vec<HistoryItem>,
    credentials: Credentials,
    chat: ChatSession,
}

impl StateManager {
    /// Load persisted state from `storage`.
    ///
    /// Records that fail to parse are discarded with a warning rather than
    /// failing the load; storage I/O errors are returned.
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self> {
        let mut history: Vec<HistoryItem> = read_record(storage.as_ref(), HISTORY_KEY)?;
        history.truncate(MAX_HISTORY);
        let documents: Vec<Document> = read_record(storage.as_ref(), DOCUMENTS_KEY)?;
        let credentials: Credentials = read_record(storage.as_ref(), CREDENTIALS_KEY)?;
        debug!(
            "loaded {} history items and {} documents",
            history.len(),
            documents.len()
        );

        Ok(Self {
            storage,
            documents,
            history,
            credentials,
            chat: ChatSession::default(),
        })
    }

    // ============ Documents ============

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Insert `doc`, or replace the document with the same id.
    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        match self.documents.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => self.documents.push(doc),
        }
        self.persist_documents()
    }

    /// Apply an extraction outcome to the document `id`.
    ///
    /// Returns `false` when no such document exists (it was removed while the
    /// extraction was in flight).
    pub fn update_document_status(&mut self, id: &str, outcome: DocumentOutcome) -> Result<bool> {
        let Some(doc) = self.documents.iter_mut().find(|d| d.id == id) else {
            debug!("dropping outcome for unknown document {}", id);
            return Ok(false);
        };

        match outcome {
            DocumentOutcome::Completed(processed) => {
                doc.extracted_text = processed.extracted_text;
                doc.word_count = processed.word_count;
                doc.char_count = processed.char_count;
                doc.status = DocumentStatus::Completed;
                doc.error = None;
                info!("document {} ready ({} words)", doc.file_name, doc.word_count);
            }
            DocumentOutcome::Failed(message) => {
                warn!("document {} failed: {}", doc.file_name, message);
                doc.status = DocumentStatus::Error;
                doc.error = Some(message);
            }
        }
        self.persist_documents()?;
        Ok(true)
    }

    pub fn set_document_summary(&mut self, id: &str, summary: impl Into<String>) -> Result<bool> {
        let Some(doc) = self.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(false);
        };
        doc.summary = Some(summary.into());
        self.persist_documents()?;
        Ok(true)
    }

    /// Remove document `id`. Returns `false` if it was not present.
    pub fn remove_document(&mut self, id: &str) -> Result<bool> {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        if self.documents.len() == before {
            return Ok(false);
        }
        self.persist_documents()?;
        self.schedule_removal_reconcile(id);
        Ok(true)
    }

    pub fn clear_documents(&mut self) -> Result<()> {
        self.documents.clear();
        self.storage.remove(DOCUMENTS_KEY)
    }

    // ============ History ============

    /// Newest first.
    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn history_item(&self, id: &str) -> Option<&HistoryItem> {
        self.history.iter().find(|h| h.id == id)
    }

    /// Prepend `item`, evicting the oldest entries beyond [`MAX_HISTORY`].
    pub fn record_summary(&mut self, item: HistoryItem) -> Result<()> {
        self.history.insert(0, item);
        self.history.truncate(MAX_HISTORY);
        write_record(self.storage.as_ref(), HISTORY_KEY, &self.history)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear();
        self.storage.remove(HISTORY_KEY)
    }

    // ============ Credentials ============

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn set_credentials(&mut self, credentials: Credentials) -> Result<()> {
        self.credentials = credentials;
        write_record(self.storage.as_ref(), CREDENTIALS_KEY, &self.credentials)
    }

    pub fn clear_credentials(&mut self) -> Result<()> {
        self.credentials = Credentials::default();
        self.storage.remove(CREDENTIALS_KEY)
    }

    // ============ Chat ============

    pub fn chat_context(&self) -> Option<&ChatContext> {
        self.chat.context.as_ref()
    }

    pub fn chat_messages(&self) -> &[ChatMessage] {
        &self.chat.messages
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.chat.awaiting_reply
    }

    /// Make `context` the subject of the chat session.
    ///
    /// Returns `true` when the transcript was reset (a different context),
    /// `false` when the same context was re-selected and the conversation
    /// continues.
    pub fn set_active_chat_context(
        &mut self,
        content: impl Into<String>,
        name: impl Into<String>,
    ) -> bool {
        let next = ChatContext::new(content, name);
        let same = self
            .chat
            .context
            .as_ref()
            .is_some_and(|current| current.session_key() == next.session_key());
        if same {
            return false;
        }

        let welcome = ChatMessage::new(ChatRole::Assistant, welcome_message(&next.name));
        self.chat = ChatSession {
            generation: self.chat.generation.wrapping_add(1),
            context: Some(next),
            messages: vec![welcome],
            awaiting_reply: false,
        };
        true
    }

    /// Append the user's `message` and build the request for the gateway.
    ///
    /// Fails when the message is blank or a previous turn has not finished.
    pub fn begin_chat_turn(&mut self, message: &str) -> Result<PendingTurn> {
        let message = message.trim();
        if message.is_empty() {
            return Err(FlashError::validation("Message is required"));
        }
        if self.chat.awaiting_reply {
            return Err(FlashError::validation(
                "Wait for the previous reply before sending another message",
            ));
        }

        let start = self
            .chat
            .messages
            .len()
            .saturating_sub(CHAT_HISTORY_WINDOW);
        let chat_history: Vec<ChatTurn> =
            self.chat.messages[start..].iter().map(ChatTurn::from).collect();

        let (document_content, document_name) = match &self.chat.context {
            Some(ctx) => (Some(ctx.content.clone()), Some(ctx.name.clone())),
            None => (None, None),
        };

        self.chat
            .messages
            .push(ChatMessage::new(ChatRole::User, message));
        self.chat.awaiting_reply = true;

        Ok(PendingTurn {
            session: self.chat.generation,
            request: ChatRequest {
                message: message.to_string(),
                document_content,
                document_name,
                chat_history,
            },
        })
    }

    /// Record the gateway's answer to `turn`.
    ///
    /// On success the assistant reply is appended and returned. On failure an
    /// apology is appended to the transcript and the error is returned for
    /// the caller to report; the session stays usable. Replies for a session
    /// that has since been reset are discarded (`Ok(None)`).
    pub fn finish_chat_turn(
        &mut self,
        turn: PendingTurn,
        reply: Result<String>,
    ) -> Result<Option<ChatMessage>> {
        if turn.session != self.chat.generation {
            debug!("discarding reply for a previous chat session");
            return Ok(None);
        }
        self.chat.awaiting_reply = false;

        match reply {
            Ok(content) => {
                let mut msg = ChatMessage::new(ChatRole::Assistant, content);
                msg.document_context = turn.request.document_name;
                self.chat.messages.push(msg.clone());
                Ok(Some(msg))
            }
            Err(err) => {
                self.chat
                    .messages
                    .push(ChatMessage::new(ChatRole::Assistant, CHAT_APOLOGY));
                Err(err)
            }
        }
    }

    // ============ Persistence ============

    fn persist_documents(&self) -> Result<()> {
        write_record(self.storage.as_ref(), DOCUMENTS_KEY, &self.documents)
    }

    fn schedule_removal_reconcile(&self, id: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let storage = Arc::clone(&self.storage);
        let id = id.to_string();
        handle.spawn(async move {
            tokio::time::sleep(RECONCILE_DELAY).await;
            if let Err(e) = reconcile_removal(storage.as_ref(), &id) {
                warn!("failed to reconcile removal of {}: {}", id, e);
            }
        });
    }
}

/// Re-read the persisted document list and drop `id` if it reappeared.
fn reconcile_removal(storage: &dyn Storage, id: &str) -> Result<()> {
    let documents: Vec<Document> = read_record(storage, DOCUMENTS_KEY)?;
    let remaining: Vec<&Document> = documents.iter().filter(|d| d.id != id).collect();
    if remaining.len() != documents.len() {
        write_record(storage, DOCUMENTS_KEY, &remaining)?;
        debug!("reconciled removal of {}, {} documents remain", id, remaining.len());
    }
    Ok(())
}

fn read_record<T: DeserializeOwned + Default>(storage: &dyn Storage, key: &str) -> Result<T> {
    let Some(raw) = storage.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("discarding unreadable {} record: {}", key, e);
            Ok(T::default())
        }
    }
}

fn write_record<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    storage.set(key, &json)
}

fn welcome_message(name: &str) -> String {
    let subject = if name.is_empty() {
        "your content".to_string()
    } else {
        format!("\"{}\"", name)
    };
    format!(
        "👋 Hi! I'm ready to help you explore {}. You can ask me questions about the document, request explanations, or get deeper insights. What would you like to know?",
        subject
    )
}
